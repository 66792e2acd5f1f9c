use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "analyzer_statistics")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub run_history_id: i32,
    pub analyzer_type: String,
    #[sea_orm(column_type = "Binary(BlobSize::Blob(None))", nullable)]
    pub version: Option<Vec<u8>>,
    pub successful: i32,
    pub failed: i32,
    /// zlib-compressed, newline separated
    #[sea_orm(column_type = "Binary(BlobSize::Blob(None))", nullable)]
    pub failed_files: Option<Vec<u8>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::run_histories::Entity",
        from = "Column::RunHistoryId",
        to = "super::run_histories::Column::Id"
    )]
    RunHistories,
}

impl Related<super::run_histories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RunHistories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
