pub mod analyzer_statistics;
pub mod bug_path_events;
pub mod comments;
pub mod common_types;
pub mod file_contents;
pub mod files;
pub mod reports;
pub mod review_statuses;
pub mod run_histories;
pub mod run_locks;
pub mod runs;
pub mod source_components;
