use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ingestion lock for one run name. `version` is bumped on every takeover.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "run_locks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    pub username: String,
    pub locked_at: ChronoDateTimeUtc,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn expires_at(&self, timeout: chrono::Duration) -> ChronoDateTimeUtc {
        self.locked_at
            .checked_add_signed(timeout)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC)
    }

    pub fn is_expired(&self, timeout: chrono::Duration, now: ChronoDateTimeUtc) -> bool {
        self.expires_at(timeout) < now
    }
}
