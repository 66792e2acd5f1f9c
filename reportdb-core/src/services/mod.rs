pub mod comment_service;
pub mod content_service;
pub mod mass_store_service;
pub mod review_service;
pub mod run_lock_service;
pub mod run_service;
pub mod source_component_service;

pub use comment_service::{CommentData, CommentService};
pub use content_service::{ContentService, SourceFileData};
pub use mass_store_service::{MassStoreRequest, MassStoreService, StoreOutcome};
pub use review_service::{ReviewData, ReviewService};
pub use run_lock_service::{RunLockGuard, RunLockService};
pub use run_service::{
    AnalyzerStatisticsData, RunHistoryData, RunService, RunSortMode, RunSortType, RunSummary,
};
pub use source_component_service::{SourceComponentData, SourceComponentService};
