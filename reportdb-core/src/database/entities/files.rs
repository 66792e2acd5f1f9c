use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Path record pointing at a stored content hash
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "files")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub filepath: String,
    pub filename: String,
    pub content_hash: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::file_contents::Entity",
        from = "Column::ContentHash",
        to = "super::file_contents::Column::ContentHash"
    )]
    FileContents,
}

impl Related<super::file_contents::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FileContents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
