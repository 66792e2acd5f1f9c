//! Store archive error types
//!
//! Failures raised while turning the base64/zlib/zip envelope sent by the
//! analyzer pipeline into a scratch directory, and while reading the
//! descriptors inside it.
//!
//! # Examples
//!
//! ```rust
//! use reportdb::errors::ArchiveError;
//!
//! let err = ArchiveError::UnsafeEntry("../../etc/passwd".to_string());
//! assert!(err.is_client_error());
//! ```

use thiserror::Error;

use super::CoreError;

#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Payload is not valid base64
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// zlib stream could not be inflated
    #[error("Failed to decompress archive: {0}")]
    Decompress(std::io::Error),

    /// Zip container is malformed
    #[error("Invalid zip container: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Entry would escape the scratch directory
    #[error("Archive entry '{0}' has an unsafe path")]
    UnsafeEntry(String),

    /// JSON descriptor could not be parsed
    #[error("Invalid descriptor '{path}': {source}")]
    Descriptor {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    /// Check if the sender is at fault (malformed or hostile archive)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ArchiveError::Base64(_)
                | ArchiveError::Zip(_)
                | ArchiveError::UnsafeEntry(_)
                | ArchiveError::Descriptor { .. }
                | ArchiveError::Decompress(_)
        )
    }
}

impl From<ArchiveError> for CoreError {
    fn from(err: ArchiveError) -> Self {
        CoreError::io(format!("Failed to process the store archive: {}", err)).with_source(err)
    }
}
