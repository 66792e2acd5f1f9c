//! Error types for reportdb-core
//!
//! Every service returns [`CoreResult`]. Domain-specific enums exist where a
//! caller needs to branch on the failure before it becomes a [`CoreError`].
//!
//! # Error Categories
//!
//! - **CoreError**: the service-level error, mapped onto the wire [`ErrorCode`]
//! - **ArchiveError**: store archive decoding and descriptor parsing
//! - **StoreError**: transactional store failures, split into transient and terminal
//!
//! # Examples
//!
//! ```rust
//! use reportdb::errors::{CoreError, ErrorCode};
//!
//! let err = CoreError::limit_exceeded("You reached the maximum number of allowed runs (2/2)!");
//! assert_eq!(err.code(), ErrorCode::General);
//! ```

pub mod archive;
pub mod core_error;
pub mod store;

pub use archive::ArchiveError;
pub use core_error::{CoreError, CoreErrorKind, ErrorCode};
pub use store::StoreError;

/// Result type alias for service operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type alias for archive handling
pub type ArchiveResult<T> = Result<T, ArchiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_result_alias() {
        let result: CoreResult<i32> = Err(CoreError::not_found("Run", "1"));
        assert!(result.is_err());
    }

    #[test]
    fn test_archive_result_alias() {
        let result: ArchiveResult<()> = Err(ArchiveError::UnsafeEntry("..".to_string()));
        assert!(result.is_err());
    }
}
