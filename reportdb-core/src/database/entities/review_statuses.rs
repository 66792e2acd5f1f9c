use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub use super::common_types::ReviewStatus;

/// Review decision keyed by finding identity, shared by every run
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "review_statuses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub bug_hash: String,
    pub status: String,
    pub author: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub date: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn get_status(&self) -> ReviewStatus {
        ReviewStatus::from_db(Some(&self.status))
    }
}
