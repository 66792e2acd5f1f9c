use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Source body keyed by its content hash, stored zlib-compressed
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "file_contents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub content_hash: String,
    #[sea_orm(column_type = "Binary(BlobSize::Blob(None))")]
    pub content: Vec<u8>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
