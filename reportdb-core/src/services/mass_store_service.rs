//! Mass store of an analysis archive into a run
//!
//! The archive is decoded and the source contents stored before the run's
//! report set is reconciled. Reconciliation happens in one transaction that
//! is retried as a whole when the database reports a transient conflict.
//! The run lock is held for the whole store and released whatever the
//! outcome.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::archive::{trim_path_prefixes, FindingFile, Metadata, SkipList, StoreArchive};
use crate::common::{chunked, retry_transient, zlib, RetryPolicy};
use crate::config::StoreConfig;
use crate::database::entities::common_types::{DetectionStatus, Severity};
use crate::database::entities::{
    analyzer_statistics, bug_path_events, reports, run_histories, runs,
};
use crate::errors::{CoreError, CoreResult, StoreError};
use crate::identity::{basename, finding_identity, report_path_hash};
use crate::services::content_service::ContentService;
use crate::services::review_service::ReviewService;
use crate::services::run_lock_service::{RunLockGuard, RunLockService};
use crate::services::run_service::RunService;
use crate::suppression::annotations_for;

const DELETE_CHUNK: usize = 500;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MassStoreRequest {
    pub run_name: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// base64 of the zlib-compressed zip
    pub archive: String,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub trim_path_prefixes: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A finished store. Suppression conflicts do not undo the store but are
/// still reported to the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct StoreOutcome {
    pub run_id: i32,
    pub suppression_conflicts: Vec<String>,
}

impl StoreOutcome {
    pub fn into_result(self) -> CoreResult<i32> {
        if self.suppression_conflicts.is_empty() {
            return Ok(self.run_id);
        }
        Err(CoreError::source_file(
            "Multiple source code comment can be found with the same checker name for same bug!",
        )
        .with_field("run_id", self.run_id.to_string())
        .with_extra_info(self.suppression_conflicts))
    }
}

/// Everything read from the archive before the transaction starts.
struct PreparedStore {
    archive: StoreArchive,
    metadata: Metadata,
    skip_list: SkipList,
    content_hashes: HashMap<String, String>,
    finding_files: Vec<FindingFile>,
}

/// Inputs of one transactional attempt.
struct StoreInput<'a> {
    request: &'a MassStoreRequest,
    user: &'a str,
    guard: &'a RunLockGuard,
    prepared: &'a PreparedStore,
    file_ids: &'a HashMap<String, i32>,
    sources: &'a HashMap<String, String>,
    history_time: DateTime<Utc>,
}

#[derive(Clone)]
pub struct MassStoreService {
    db: DatabaseConnection,
    locks: Arc<RunLockService>,
    config: Arc<StoreConfig>,
}

impl MassStoreService {
    pub fn new(db: DatabaseConnection, locks: Arc<RunLockService>, config: Arc<StoreConfig>) -> Self {
        Self { db, locks, config }
    }

    pub async fn store(&self, user: &str, request: &MassStoreRequest) -> CoreResult<StoreOutcome> {
        let started = Instant::now();
        let name = request.run_name.trim();
        if name.is_empty() {
            return Err(CoreError::validation("No run name was given to store into."));
        }

        self.check_run_limit(name).await?;
        let guard = self.locks.acquire(name, user).await?;

        let outcome = self.store_locked(name, user, request, &guard).await;

        if let Err(e) = self.locks.release(&guard).await {
            error!("Failed to release the lock of run '{}': {}", name, e);
        }
        let outcome = outcome?;

        info!(
            "'{}' stored results ({} KB) to run '{}' in {} seconds.",
            user,
            request.archive.len() / 1024,
            name,
            started.elapsed().as_secs()
        );
        Ok(outcome)
    }

    /// Refuse a new run once the configured run count is reached.
    pub async fn check_run_limit(&self, name: &str) -> CoreResult<()> {
        let Some(max) = self.config.max_run_count else {
            return Ok(());
        };

        let exists = runs::Entity::find()
            .filter(runs::Column::Name.eq(name))
            .count(&self.db)
            .await?
            > 0;
        if exists {
            return Ok(());
        }

        let count = runs::Entity::find().count(&self.db).await?;
        if count >= max {
            return Err(CoreError::limit_exceeded(format!(
                "You reached the maximum number of allowed runs ({}/{})! Please remove at least {} run(s) before you try it again.",
                count,
                max,
                count - max + 1
            ))
            .with_field("max_run_count", max.to_string()));
        }
        Ok(())
    }

    async fn store_locked(
        &self,
        name: &str,
        user: &str,
        request: &MassStoreRequest,
        guard: &RunLockGuard,
    ) -> CoreResult<StoreOutcome> {
        let payload = request.archive.clone();
        let prepared = tokio::task::spawn_blocking(move || -> CoreResult<PreparedStore> {
            let archive = StoreArchive::decode(&payload)?;
            let metadata = archive.metadata()?;
            let skip_list = archive.skip_list()?;
            let content_hashes = archive.content_hashes()?;
            let finding_files = archive
                .finding_files()?
                .into_iter()
                .map(|(_, file)| file)
                .collect();
            Ok(PreparedStore {
                archive,
                metadata,
                skip_list,
                content_hashes,
                finding_files,
            })
        })
        .await
        .map_err(|e| CoreError::internal(format!("Archive decoding task failed: {}", e)))??;

        let file_ids = self.store_contents(&prepared, &request.trim_path_prefixes).await?;
        let sources = load_sources(&prepared).await;
        debug!(
            "Run '{}': {} source files, {} report files",
            name,
            file_ids.len(),
            prepared.finding_files.len()
        );

        let input = StoreInput {
            request,
            user,
            guard,
            prepared: &prepared,
            file_ids: &file_ids,
            sources: &sources,
            history_time: Utc::now(),
        };
        let policy = RetryPolicy::new(
            self.config.store_retry_attempts,
            self.config.retry_base_delay(),
        );
        let input = &input;
        let outcome = retry_transient(&policy, "Storing reports", move |attempt| async move {
            debug!("Store attempt {} into run '{}'", attempt, name);
            self.store_attempt(input).await
        })
        .await?;
        Ok(outcome)
    }

    /// Store every archived source, keyed by its trimmed path.
    async fn store_contents(
        &self,
        prepared: &PreparedStore,
        trim_prefixes: &[String],
    ) -> CoreResult<HashMap<String, i32>> {
        let mut file_ids = HashMap::new();
        for (analyzed, content_hash) in &prepared.content_hashes {
            let trimmed = trim_path_prefixes(analyzed, trim_prefixes);
            let bytes = if ContentService::has_content(&self.db, content_hash).await? {
                None
            } else {
                match tokio::fs::read(prepared.archive.source_path(analyzed)).await {
                    Ok(bytes) => Some(bytes),
                    Err(e) => {
                        error!("Failed to read source file {} from the archive: {}", analyzed, e);
                        None
                    }
                }
            };

            if let Some(file_id) =
                ContentService::store_file_content(&self.db, &trimmed, content_hash, bytes.as_deref())
                    .await?
            {
                file_ids.insert(trimmed, file_id);
            }
        }
        Ok(file_ids)
    }

    async fn store_attempt(&self, input: &StoreInput<'_>) -> Result<StoreOutcome, StoreError> {
        let txn = self.db.begin().await?;
        RunLockService::verify(&txn, input.guard).await?;

        let run_id = self.add_checker_run(&txn, input).await?;
        let suppression_conflicts = self.store_reports(&txn, run_id, input).await?;

        runs::Entity::update_many()
            .col_expr(
                runs::Column::Duration,
                Expr::value(input.prepared.metadata.duration_secs()),
            )
            .filter(runs::Column::Id.eq(run_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(StoreOutcome {
            run_id,
            suppression_conflicts,
        })
    }

    /// Create or refresh the run and write its history entry.
    async fn add_checker_run<C: ConnectionTrait>(
        &self,
        conn: &C,
        input: &StoreInput<'_>,
    ) -> Result<i32, StoreError> {
        let request = input.request;
        let name = request.run_name.trim();
        let existing = runs::Entity::find()
            .filter(runs::Column::Name.eq(name))
            .one(conn)
            .await?;

        let run_id = match existing {
            Some(run) if request.force => {
                info!("Removing previous results of run '{}' before a forced store", name);
                RunService::delete_runs(conn, &[run.id]).await?;
                runs::ActiveModel::new(name).insert(conn).await?.id
            }
            Some(run) => {
                let id = run.id;
                let mut active: runs::ActiveModel = run.into();
                active.date = Set(input.history_time);
                active.update(conn).await?;
                id
            }
            None => runs::ActiveModel::new(name).insert(conn).await?.id,
        };

        if let Some(tag) = request.tag.as_deref().filter(|t| !t.is_empty()) {
            run_histories::Entity::update_many()
                .col_expr(
                    run_histories::Column::VersionTag,
                    Expr::value(Option::<String>::None),
                )
                .filter(run_histories::Column::RunId.eq(run_id))
                .filter(run_histories::Column::VersionTag.eq(tag))
                .exec(conn)
                .await?;
        }

        let metadata = &input.prepared.metadata;
        let command = metadata.check_command();
        let check_command = if command.is_empty() {
            None
        } else {
            Some(compress(command.as_bytes())?)
        };

        let history = run_histories::ActiveModel {
            id: NotSet,
            run_id: Set(run_id),
            time: Set(input.history_time),
            version_tag: Set(request.tag.clone().filter(|t| !t.is_empty())),
            user: Set(input.user.to_string()),
            cc_version: Set(request
                .version
                .clone()
                .or_else(|| metadata.tool_version.clone())),
            description: Set(request.description.clone()),
            check_command: Set(check_command),
        }
        .insert(conn)
        .await?;

        for (analyzer, stats) in &metadata.statistics {
            let version = stats
                .version
                .as_deref()
                .map(|v| compress(v.as_bytes()))
                .transpose()?;
            let failed_files = if stats.failed_files.is_empty() {
                None
            } else {
                Some(compress(stats.failed_files.join("\n").as_bytes())?)
            };
            analyzer_statistics::ActiveModel {
                id: NotSet,
                run_history_id: Set(history.id),
                analyzer_type: Set(analyzer.clone()),
                version: Set(version),
                successful: Set(stats.successful),
                failed: Set(stats.failed),
                failed_files: Set(failed_files),
            }
            .insert(conn)
            .await?;
        }

        Ok(run_id)
    }

    /// Reconcile the archived findings against the run's stored reports.
    /// Returns the suppression conflicts found on the way.
    async fn store_reports<C: ConnectionTrait>(
        &self,
        conn: &C,
        run_id: i32,
        input: &StoreInput<'_>,
    ) -> Result<Vec<String>, StoreError> {
        let prefixes = &input.request.trim_path_prefixes;
        let prepared = input.prepared;
        let now = input.history_time;

        let mut previous: HashMap<String, Vec<reports::Model>> = HashMap::new();
        for report in reports::Entity::find()
            .filter(reports::Column::RunId.eq(run_id))
            .all(conn)
            .await?
        {
            previous.entry(report.bug_id.clone()).or_default().push(report);
        }

        let mut checker_info = prepared.metadata.checker_info();
        let mut seen_checkers = HashSet::new();
        let mut seen_paths = HashSet::new();
        let mut reconfirmed = HashSet::new();
        let mut conflicts = Vec::new();

        for finding_file in &prepared.finding_files {
            let file_ids: Vec<Option<i32>> = finding_file
                .files
                .iter()
                .map(|path| input.file_ids.get(&trim_path_prefixes(path, prefixes)).copied())
                .collect();

            let missing: Vec<&str> = finding_file
                .referenced_paths()
                .into_iter()
                .filter(|path| input.file_ids.get(&trim_path_prefixes(path, prefixes)).is_none())
                .collect();
            if !missing.is_empty() {
                warn!(
                    "Skipping reports of {} because some source files were not stored: {}",
                    finding_file.files.join(", "),
                    missing.join(", ")
                );
                continue;
            }

            for record in &finding_file.reports {
                let (Some(main_path), Some(Some(file_id))) =
                    (finding_file.path_of(record.file), file_ids.get(record.file))
                else {
                    warn!("Report of {} points at an unknown file index", record.checker_name);
                    continue;
                };
                let trimmed_main = trim_path_prefixes(main_path, prefixes);
                if prepared.skip_list.should_skip(&trimmed_main) {
                    debug!("Skipping report in {}", trimmed_main);
                    continue;
                }

                let source_line = input
                    .sources
                    .get(main_path)
                    .and_then(|text| text.lines().nth((record.line.max(1) - 1) as usize))
                    .unwrap_or("");
                let bug_id = finding_identity(record, &trimmed_main, source_line);
                if !seen_paths.insert(report_path_hash(record, &bug_id, finding_file)) {
                    debug!("Report {} was already stored in this batch", bug_id);
                    continue;
                }

                let checker = record.checker_name.as_str();
                seen_checkers.insert(checker.to_string());

                let (status, detected_at) = match previous.get(&bug_id).and_then(|rows| rows.first())
                {
                    None => (DetectionStatus::New, now),
                    Some(old) if old.get_detection_status() == DetectionStatus::Resolved => {
                        (DetectionStatus::Reopened, old.detected_at)
                    }
                    Some(old) => (DetectionStatus::Unresolved, old.detected_at),
                };

                let analyzer_name = checker_info
                    .checker_to_analyzer
                    .get(checker)
                    .cloned()
                    .or_else(|| record.analyzer_name.clone().filter(|a| !a.is_empty()))
                    .unwrap_or_else(|| {
                        if checker.starts_with("clang-diagnostic-") {
                            "clang-tidy".to_string()
                        } else {
                            "unknown".to_string()
                        }
                    });
                let severity = record
                    .severity
                    .or_else(|| self.config.severity_for(checker))
                    .unwrap_or(Severity::Unspecified);

                let report = reports::ActiveModel {
                    id: NotSet,
                    run_id: Set(run_id),
                    file_id: Set(*file_id),
                    line: Set(record.line),
                    column_number: Set(record.column),
                    checker_id: Set(checker.to_string()),
                    analyzer_name: Set(analyzer_name),
                    severity: Set(severity.weight()),
                    bug_id: Set(bug_id.clone()),
                    checker_message: Set(record.message.clone()),
                    detection_status: Set(status.into()),
                    path_length: Set(record.bug_path.len() as i32),
                    detected_at: Set(detected_at),
                    fixed_at: Set(None),
                }
                .insert(conn)
                .await?;

                let events: Vec<bug_path_events::ActiveModel> = record
                    .bug_path
                    .iter()
                    .enumerate()
                    .filter_map(|(position, step)| {
                        let file_id = file_ids.get(step.file).copied().flatten()?;
                        Some(bug_path_events::ActiveModel {
                            id: NotSet,
                            report_id: Set(report.id),
                            position: Set(position as i32),
                            file_id: Set(file_id),
                            line: Set(step.line),
                            column_number: Set(step.column),
                            message: Set(step.message.clone()),
                        })
                    })
                    .collect();
                if !events.is_empty() {
                    bug_path_events::Entity::insert_many(events)
                        .exec_without_returning(conn)
                        .await?;
                }
                reconfirmed.insert(bug_id.clone());

                let (last_file, last_line) = record.last_location();
                if let Some(last_path) = finding_file.path_of(last_file) {
                    let source = input.sources.get(last_path).map(String::as_str).unwrap_or("");
                    let annotations = annotations_for(source, last_line.max(0) as usize, checker);
                    match annotations.as_slice() {
                        [] => {}
                        [annotation] => {
                            ReviewService::set_review_status(
                                conn,
                                &bug_id,
                                annotation.status,
                                Some(annotation.message.as_str()),
                                input.user,
                            )
                            .await?;
                        }
                        _ => {
                            let trimmed_last = trim_path_prefixes(last_path, prefixes);
                            warn!(
                                "Multiple source code comments found for checker {} at {}:{}",
                                checker, trimmed_last, last_line
                            );
                            conflicts.push(format!(
                                "{}|{}|{}",
                                basename(&trimmed_last),
                                last_line,
                                checker
                            ));
                        }
                    }
                }
            }
        }

        for checker in seen_checkers {
            checker_info.disabled.remove(&checker);
            checker_info.enabled.insert(checker);
        }

        let mut superseded = Vec::new();
        let mut closed: HashMap<DetectionStatus, Vec<i32>> = HashMap::new();
        for (bug_id, rows) in previous {
            if reconfirmed.contains(&bug_id) {
                superseded.extend(rows.iter().map(|row| row.id));
                continue;
            }
            for row in rows.into_iter().filter(|row| !row.is_fixed()) {
                let checker = row.checker_id.as_str();
                let status = if checker_info.disabled.contains(checker) {
                    DetectionStatus::Off
                } else if !checker.starts_with("clang-diagnostic-")
                    && !checker_info.enabled.is_empty()
                    && !checker_info.enabled.contains(checker)
                {
                    DetectionStatus::Unavailable
                } else {
                    DetectionStatus::Resolved
                };
                closed.entry(status).or_default().push(row.id);
            }
        }

        for (status, ids) in closed {
            for chunk in chunked(&ids, DELETE_CHUNK) {
                reports::Entity::update_many()
                    .col_expr(reports::Column::DetectionStatus, Expr::value(status.as_str()))
                    .col_expr(reports::Column::FixedAt, Expr::value(now))
                    .filter(reports::Column::Id.is_in(chunk.to_vec()))
                    .exec(conn)
                    .await?;
            }
        }

        for chunk in chunked(&superseded, DELETE_CHUNK) {
            bug_path_events::Entity::delete_many()
                .filter(bug_path_events::Column::ReportId.is_in(chunk.to_vec()))
                .exec(conn)
                .await?;
            reports::Entity::delete_many()
                .filter(reports::Column::Id.is_in(chunk.to_vec()))
                .exec(conn)
                .await?;
        }

        Ok(conflicts)
    }
}

fn compress(bytes: &[u8]) -> Result<Vec<u8>, StoreError> {
    zlib(bytes).map_err(|e| {
        StoreError::Core(CoreError::io(format!("Failed to compress a stored blob: {}", e)).with_source(e))
    })
}

/// Text of every analyzed source a finding refers to, keyed by the
/// untrimmed analyzed path.
async fn load_sources(prepared: &PreparedStore) -> HashMap<String, String> {
    let mut sources = HashMap::new();
    for finding_file in &prepared.finding_files {
        for path in finding_file.referenced_paths() {
            if sources.contains_key(path) {
                continue;
            }
            match tokio::fs::read(prepared.archive.source_path(path)).await {
                Ok(bytes) => {
                    sources.insert(path.to_string(), String::from_utf8_lossy(&bytes).into_owned());
                }
                Err(e) => debug!("Source of {} is not part of the archive: {}", path, e),
            }
        }
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    #[test]
    fn conflicts_turn_into_source_file_error() {
        let outcome = StoreOutcome {
            run_id: 3,
            suppression_conflicts: vec!["a.c|10|core.Null".to_string()],
        };
        let err = outcome.into_result().unwrap_err();
        assert_eq!(err.code(), ErrorCode::SourceFile);
        assert_eq!(err.extra_info(), ["a.c|10|core.Null".to_string()]);

        let clean = StoreOutcome {
            run_id: 3,
            suppression_conflicts: vec![],
        };
        assert_eq!(clean.into_result().unwrap(), 3);
    }

    #[test]
    fn request_parses_from_camel_case() {
        let request: MassStoreRequest = serde_json::from_str(
            r#"{"runName": "proj", "archive": "eJw=", "trimPathPrefixes": ["/home"], "force": true}"#,
        )
        .unwrap();
        assert_eq!(request.run_name, "proj");
        assert!(request.force);
        assert_eq!(request.trim_path_prefixes, vec!["/home"]);
        assert!(request.tag.is_none());
    }
}
