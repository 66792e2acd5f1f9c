use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub use super::common_types::CommentKind;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub bug_hash: String,
    pub author: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub kind: String,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn get_kind(&self) -> CommentKind {
        self.kind.parse().unwrap_or(CommentKind::User)
    }
}
