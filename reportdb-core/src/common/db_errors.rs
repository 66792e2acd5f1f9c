//! Database error categorization and message formatting
//!
//! Stores into different runs can still collide on the same review status
//! row, so the ingestion pipeline needs to know which failures are worth a
//! retry. This module classifies `sea_orm::DbErr` values for that purpose and
//! formats them with operation context.
//!
//! # Examples
//!
//! ```rust
//! use reportdb::common::db_errors::*;
//! use sea_orm::DbErr;
//!
//! let err = DbErr::RecordNotFound("run".to_string());
//! let (kind, message) = format_db_error("load run", &err);
//! assert_eq!(kind, DbErrorKind::NotFound);
//! assert_eq!(message, "load run: record not found");
//! ```

use sea_orm::{DbErr, SqlErr};

/// Categories of database errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// Record not found (query returned no results)
    NotFound,

    /// Unique constraint violation
    ///
    /// A concurrent writer inserted the same key first.
    UniqueViolation,

    /// Foreign key constraint violation
    ForeignKeyViolation,

    /// Database connection error
    ConnectionError,

    /// Query or pool acquire timeout
    Timeout,

    /// Deadlock, serialization failure or a busy SQLite database
    ///
    /// The whole transaction should be retried.
    Deadlock,

    /// Unknown/other database error
    Unknown,
}

impl DbErrorKind {
    /// Categorize a sea_orm database error
    ///
    /// # Examples
    ///
    /// ```
    /// use reportdb::common::db_errors::DbErrorKind;
    /// use sea_orm::DbErr;
    ///
    /// let err = DbErr::RecordNotFound("Report not found".to_string());
    /// assert_eq!(DbErrorKind::from_db_err(&err), DbErrorKind::NotFound);
    /// ```
    pub fn from_db_err(err: &DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => return Self::UniqueViolation,
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => return Self::ForeignKeyViolation,
            _ => {}
        }

        match err {
            DbErr::RecordNotFound(_) => Self::NotFound,
            DbErr::ConnectionAcquire(_) => Self::Timeout,
            DbErr::Conn(runtime) => {
                if runtime.to_string().to_lowercase().contains("timeout") {
                    Self::Timeout
                } else {
                    Self::ConnectionError
                }
            }
            DbErr::Exec(runtime) | DbErr::Query(runtime) => {
                Self::from_message(&runtime.to_string())
            }
            DbErr::Custom(msg) => Self::from_message(msg),
            _ => Self::Unknown,
        }
    }

    fn from_message(msg: &str) -> Self {
        let msg_lower = msg.to_lowercase();
        if msg_lower.contains("unique") || msg_lower.contains("duplicate") {
            Self::UniqueViolation
        } else if msg_lower.contains("foreign key") {
            Self::ForeignKeyViolation
        } else if msg_lower.contains("deadlock")
            || msg_lower.contains("could not serialize")
            || msg_lower.contains("database is locked")
            || msg_lower.contains("database table is locked")
            || msg_lower.contains("busy")
            || msg_lower.contains("could not obtain lock")
        {
            Self::Deadlock
        } else if msg_lower.contains("timeout") || msg_lower.contains("timed out") {
            Self::Timeout
        } else {
            Self::Unknown
        }
    }

    /// Check if this error is retryable
    ///
    /// # Examples
    ///
    /// ```
    /// use reportdb::common::db_errors::DbErrorKind;
    ///
    /// assert!(DbErrorKind::Deadlock.is_retryable());
    /// assert!(DbErrorKind::Timeout.is_retryable());
    /// assert!(!DbErrorKind::UniqueViolation.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionError | Self::Timeout | Self::Deadlock)
    }

    /// Check if this is a conflict between concurrent writers
    pub fn is_write_conflict(&self) -> bool {
        matches!(self, Self::UniqueViolation | Self::Deadlock)
    }
}

/// Format database error with operation context
///
/// # Examples
///
/// ```
/// use reportdb::common::db_errors::*;
/// use sea_orm::DbErr;
///
/// let err = DbErr::RecordNotFound("gone".to_string());
/// let (kind, message) = format_db_error("find report", &err);
/// assert_eq!(kind, DbErrorKind::NotFound);
/// assert_eq!(message, "find report: record not found");
/// ```
pub fn format_db_error(operation: &str, err: &DbErr) -> (DbErrorKind, String) {
    let kind = DbErrorKind::from_db_err(err);

    let message = match kind {
        DbErrorKind::NotFound => format!("{}: record not found", operation),
        DbErrorKind::UniqueViolation => format!("{}: duplicate key violation", operation),
        DbErrorKind::ForeignKeyViolation => {
            format!("{}: foreign key constraint violation", operation)
        }
        DbErrorKind::ConnectionError => format!("{}: database connection failed", operation),
        DbErrorKind::Timeout => format!("{}: query timeout", operation),
        DbErrorKind::Deadlock => format!("{}: transaction conflict - {}", operation, err),
        DbErrorKind::Unknown => format!("{}: database error - {}", operation, err),
    };

    (kind, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::RuntimeErr;

    fn exec(msg: &str) -> DbErr {
        DbErr::Exec(RuntimeErr::Internal(msg.to_string()))
    }

    fn query(msg: &str) -> DbErr {
        DbErr::Query(RuntimeErr::Internal(msg.to_string()))
    }

    #[test]
    fn test_not_found() {
        let err = DbErr::RecordNotFound("Run not found".to_string());
        assert_eq!(DbErrorKind::from_db_err(&err), DbErrorKind::NotFound);
    }

    #[test]
    fn test_unique_violation_from_message() {
        let err = exec("UNIQUE constraint failed: run_locks.name");
        assert_eq!(DbErrorKind::from_db_err(&err), DbErrorKind::UniqueViolation);

        let err = exec("duplicate key value violates unique constraint \"run_locks_pkey\"");
        assert_eq!(DbErrorKind::from_db_err(&err), DbErrorKind::UniqueViolation);
    }

    #[test]
    fn test_foreign_key_violation() {
        let err = exec("FOREIGN KEY constraint failed");
        assert_eq!(
            DbErrorKind::from_db_err(&err),
            DbErrorKind::ForeignKeyViolation
        );
    }

    #[test]
    fn test_conflict_messages_are_deadlocks() {
        for msg in [
            "deadlock detected",
            "could not serialize access due to concurrent update",
            "database is locked",
            "could not obtain lock on row in relation \"run_locks\"",
        ] {
            assert_eq!(
                DbErrorKind::from_db_err(&query(msg)),
                DbErrorKind::Deadlock,
                "{}",
                msg
            );
        }
    }

    #[test]
    fn test_connection_errors() {
        let err = DbErr::Conn(RuntimeErr::Internal("connection refused".to_string()));
        assert_eq!(DbErrorKind::from_db_err(&err), DbErrorKind::ConnectionError);

        let err = DbErr::Conn(RuntimeErr::Internal("connect timeout".to_string()));
        assert_eq!(DbErrorKind::from_db_err(&err), DbErrorKind::Timeout);
    }

    #[test]
    fn test_unknown() {
        let err = exec("no such column: foo");
        assert_eq!(DbErrorKind::from_db_err(&err), DbErrorKind::Unknown);
    }

    #[test]
    fn test_retryable() {
        assert!(DbErrorKind::Deadlock.is_retryable());
        assert!(DbErrorKind::ConnectionError.is_retryable());
        assert!(!DbErrorKind::NotFound.is_retryable());
        assert!(!DbErrorKind::ForeignKeyViolation.is_retryable());
        assert!(!DbErrorKind::Unknown.is_retryable());
    }

    #[test]
    fn test_write_conflict() {
        assert!(DbErrorKind::UniqueViolation.is_write_conflict());
        assert!(DbErrorKind::Deadlock.is_write_conflict());
        assert!(!DbErrorKind::Timeout.is_write_conflict());
    }

    #[test]
    fn test_format_messages() {
        let (kind, message) = format_db_error("acquire run lock", &exec("UNIQUE constraint failed"));
        assert_eq!(kind, DbErrorKind::UniqueViolation);
        assert_eq!(message, "acquire run lock: duplicate key violation");

        let (kind, message) = format_db_error("store", &exec("weird"));
        assert_eq!(kind, DbErrorKind::Unknown);
        assert!(message.starts_with("store: database error - "));
        assert!(message.contains("weird"));
    }
}
