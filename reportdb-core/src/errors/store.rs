//! Errors raised inside the transactional part of a mass store.
//!
//! The retry loop needs to tell transient database conflicts apart from
//! terminal failures, so the raw `DbErr` is kept until the loop decides.

use sea_orm::DbErr;
use thiserror::Error;

use super::CoreError;
use crate::common::db_errors::{format_db_error, DbErrorKind};

#[derive(Error, Debug)]
pub enum StoreError {
    /// Database failure, possibly transient
    #[error("Database error: {0}")]
    Db(#[from] DbErr),

    /// Terminal failure that must not be retried
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl StoreError {
    /// Serialization failures, deadlocks and busy databases are worth a retry
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Db(err) => DbErrorKind::from_db_err(err).is_retryable(),
            StoreError::Core(_) => false,
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Core(core) => core,
            StoreError::Db(db) => {
                let (_, message) = format_db_error("Storing reports to the database failed", &db);
                CoreError::database(message).with_source(db)
            }
        }
    }
}
