//! Common utilities shared by the services
//!
//! Error classification, retry of transient database conflicts, zlib
//! helpers for stored blobs and the wildcard pattern conversion used by
//! every name filter.

pub mod compression;
pub mod db_errors;
pub mod patterns;
pub mod retry;

pub use compression::{unzlib, zlib};
pub use patterns::{chunked, has_wildcard, like_pattern};
pub use retry::{retry_transient, RetryPolicy};
