use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Immutable snapshot written once per completed store
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "run_histories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub run_id: i32,
    pub time: ChronoDateTimeUtc,
    pub version_tag: Option<String>,
    pub user: String,
    pub cc_version: Option<String>,
    pub description: Option<String>,
    #[sea_orm(column_type = "Binary(BlobSize::Blob(None))", nullable)]
    pub check_command: Option<Vec<u8>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::runs::Entity",
        from = "Column::RunId",
        to = "super::runs::Column::Id"
    )]
    Runs,
    #[sea_orm(has_many = "super::analyzer_statistics::Entity")]
    AnalyzerStatistics,
}

impl Related<super::runs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Runs.def()
    }
}

impl Related<super::analyzer_statistics::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AnalyzerStatistics.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
