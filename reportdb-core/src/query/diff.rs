use std::collections::HashSet;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect};
use tracing::debug;

use super::filter::DiffType;
use super::results::ReportQueryService;
use crate::common::chunked;
use crate::database::entities::common_types::DetectionStatus;
use crate::database::entities::reports;
use crate::errors::CoreResult;

/// Statuses skipped when the caller names none.
pub fn default_skip_statuses() -> Vec<DetectionStatus> {
    DetectionStatus::closed().to_vec()
}

/// Order-preserving dedupe.
fn dedupe(hashes: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    hashes
        .into_iter()
        .filter(|hash| seen.insert(hash.clone()))
        .collect()
}

impl ReportQueryService {
    /// Compare a literal identity set, usually from a local analysis, with
    /// the stored runs. The literal set is queried in chunks of
    /// `chunk_size`.
    pub async fn get_diff_results_hash(
        &self,
        run_ids: &[i32],
        report_hashes: &[String],
        diff_type: DiffType,
        skip_statuses: &[DetectionStatus],
        chunk_size: usize,
    ) -> CoreResult<Vec<String>> {
        let skip: Vec<&str> = if skip_statuses.is_empty() {
            default_skip_statuses().iter().map(|s| s.as_str()).collect()
        } else {
            skip_statuses.iter().map(|s| s.as_str()).collect()
        };
        let in_runs = || {
            let mut select = reports::Entity::find()
                .select_only()
                .column(reports::Column::BugId)
                .distinct();
            if !run_ids.is_empty() {
                select = select.filter(reports::Column::RunId.is_in(run_ids.iter().copied()));
            }
            select
        };

        let result = match diff_type {
            DiffType::New => {
                if report_hashes.is_empty() {
                    return Ok(Vec::new());
                }
                let mut stored = HashSet::new();
                for chunk in chunked(report_hashes, chunk_size) {
                    let found: Vec<String> = in_runs()
                        .filter(reports::Column::DetectionStatus.is_not_in(skip.iter().copied()))
                        .filter(reports::Column::BugId.is_in(chunk.iter().cloned()))
                        .into_tuple()
                        .all(&self.db)
                        .await?;
                    stored.extend(found);
                }
                dedupe(
                    report_hashes
                        .iter()
                        .filter(|hash| !stored.contains(*hash))
                        .cloned(),
                )
            }
            DiffType::Resolved => {
                let local: HashSet<&String> = report_hashes.iter().collect();
                let stored: Vec<String> = in_runs().into_tuple().all(&self.db).await?;
                dedupe(stored.into_iter().filter(|hash| !local.contains(hash)))
            }
            DiffType::Unresolved => {
                let mut found = Vec::new();
                for chunk in chunked(report_hashes, chunk_size) {
                    let part: Vec<String> = in_runs()
                        .filter(reports::Column::DetectionStatus.is_not_in(skip.iter().copied()))
                        .filter(reports::Column::BugId.is_in(chunk.iter().cloned()))
                        .into_tuple()
                        .all(&self.db)
                        .await?;
                    found.extend(part);
                }
                dedupe(found)
            }
        };

        debug!(
            "Diff {:?} of {} local hashes against runs {:?} gave {} hashes",
            diff_type,
            report_hashes.len(),
            run_ids,
            result.len()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_keeps_first_seen_order() {
        let hashes = ["b", "a", "b", "c", "a"].map(String::from);
        assert_eq!(dedupe(hashes), vec!["b", "a", "c"]);
    }

    #[test]
    fn default_skip_covers_closed_statuses() {
        let skip = default_skip_statuses();
        assert!(skip.contains(&DetectionStatus::Resolved));
        assert!(!skip.contains(&DetectionStatus::Reopened));
        assert_eq!(skip.len(), 3);
    }
}
