//! Filter, sort and diff query engine over the stored reports
//!
//! Every read endpoint builds its row set with [`FilterPredicates`], so the
//! listing, counting and aggregate calls always agree on what matches.

pub mod aggregates;
pub mod diff;
pub mod filter;
pub mod results;
pub mod sort;

pub use aggregates::{CheckerCount, RunTagCount};
pub use filter::{
    CompareData, DiffType, FilterPredicates, ReportFilter, ReportPredicate, RunFilter,
    RunHistoryFilter,
};
pub use results::{BugPathEventData, ReportData, ReportDetails, ReportQueryService, RunReportCount};
pub use sort::{SortMode, SortOrder, SortType};
