pub mod archive;
pub mod db;
pub mod temp;

pub use archive::{bug_path_step, content_hash_of, finding, ArchiveBuilder};
pub use db::TestDb;
pub use temp::TempDir;
