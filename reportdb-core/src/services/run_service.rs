use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Condition, Expr, JoinType, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::common::{chunked, compression::unzlib_string};
use crate::database::entities::common_types::{DetectionStatus, ReviewStatus};
use crate::database::entities::{
    analyzer_statistics, bug_path_events, reports, review_statuses, run_histories, runs,
};
use crate::errors::{CoreError, CoreErrorKind, CoreResult};
use crate::query::filter::{
    ilike_any, joined_reports, CompareData, FilterPredicates, ReportFilter, RunFilter,
    RunHistoryFilter,
};
use crate::query::sort::SortOrder;
use crate::services::content_service::ContentService;
use crate::services::run_lock_service::RunLockService;

const DELETE_CHUNK: usize = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunSortType {
    Name,
    UnresolvedReports,
    Date,
    Duration,
    CcVersion,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSortMode {
    #[serde(rename = "type")]
    pub sort_type: RunSortType,
    #[serde(default)]
    pub ord: SortOrder,
}

impl Default for RunSortMode {
    fn default() -> Self {
        Self {
            sort_type: RunSortType::Date,
            ord: SortOrder::Desc,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerStatisticsData {
    pub version: String,
    pub successful: i32,
    pub failed: i32,
    pub failed_file_paths: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: i32,
    pub name: String,
    pub run_date: DateTime<Utc>,
    pub duration: i64,
    /// Open and not dismissed by review
    pub result_count: i64,
    pub detection_status_count: HashMap<DetectionStatus, i64>,
    pub version_tag: Option<String>,
    pub cc_version: Option<String>,
    pub description: Option<String>,
    pub analyzer_statistics: HashMap<String, AnalyzerStatisticsData>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunHistoryData {
    pub id: i32,
    pub run_id: i32,
    pub run_name: String,
    pub version_tag: Option<String>,
    pub user: String,
    pub time: DateTime<Utc>,
    pub cc_version: Option<String>,
    pub description: Option<String>,
    pub analyzer_statistics: HashMap<String, AnalyzerStatisticsData>,
}

fn decompress_text(blob: Option<&Vec<u8>>) -> CoreResult<String> {
    match blob {
        Some(bytes) if !bytes.is_empty() => unzlib_string(bytes).map_err(|e| {
            CoreError::io(format!("Failed to decompress a stored blob: {}", e)).with_source(e)
        }),
        _ => Ok(String::new()),
    }
}

fn run_condition(
    filter: &RunFilter,
    before_run: Option<DateTime<Utc>>,
    after_run: Option<DateTime<Utc>>,
) -> Condition {
    let mut condition = Condition::all();
    if !filter.ids.is_empty() {
        condition = condition.add(runs::Column::Id.is_in(filter.ids.iter().copied()));
    }
    if !filter.names.is_empty() {
        condition = if filter.exact_match {
            condition.add(runs::Column::Name.is_in(filter.names.iter().cloned()))
        } else {
            let patterns: Vec<String> = filter
                .names
                .iter()
                .map(|name| {
                    if name.contains('*') {
                        name.clone()
                    } else {
                        format!("*{}*", name)
                    }
                })
                .collect();
            condition.add(ilike_any(
                Expr::col((runs::Entity, runs::Column::Name)).into(),
                &patterns,
            ))
        };
    }
    if let Some(time) = filter.before_time {
        condition = condition.add(runs::Column::Date.lt(time));
    }
    if let Some(time) = filter.after_time {
        condition = condition.add(runs::Column::Date.gt(time));
    }
    if let Some(date) = before_run {
        condition = condition.add(runs::Column::Date.lt(date));
    }
    if let Some(date) = after_run {
        condition = condition.add(runs::Column::Date.gt(date));
    }
    condition
}

fn sort_summaries(summaries: &mut [RunSummary], sort: RunSortMode) {
    summaries.sort_by(|a, b| {
        let ordering = match sort.sort_type {
            RunSortType::Name => a.name.cmp(&b.name),
            RunSortType::UnresolvedReports => a.result_count.cmp(&b.result_count),
            RunSortType::Date => a.run_date.cmp(&b.run_date),
            RunSortType::Duration => a.duration.cmp(&b.duration),
            RunSortType::CcVersion => a.cc_version.cmp(&b.cc_version),
        }
        .then_with(|| a.run_id.cmp(&b.run_id));
        match sort.ord {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

#[derive(Clone)]
pub struct RunService {
    db: DatabaseConnection,
    locks: Arc<RunLockService>,
}

impl RunService {
    pub fn new(db: DatabaseConnection, locks: Arc<RunLockService>) -> Self {
        Self { db, locks }
    }

    /// Delete runs with everything that hangs off them. Review statuses and
    /// comments are keyed by identity and stay.
    pub async fn delete_runs<C: ConnectionTrait>(conn: &C, run_ids: &[i32]) -> Result<u64, DbErr> {
        if run_ids.is_empty() {
            return Ok(0);
        }
        let report_ids = Query::select()
            .column(reports::Column::Id)
            .from(reports::Entity)
            .and_where(reports::Column::RunId.is_in(run_ids.iter().copied()))
            .to_owned();
        let history_ids = Query::select()
            .column(run_histories::Column::Id)
            .from(run_histories::Entity)
            .and_where(run_histories::Column::RunId.is_in(run_ids.iter().copied()))
            .to_owned();

        bug_path_events::Entity::delete_many()
            .filter(bug_path_events::Column::ReportId.in_subquery(report_ids))
            .exec(conn)
            .await?;
        reports::Entity::delete_many()
            .filter(reports::Column::RunId.is_in(run_ids.iter().copied()))
            .exec(conn)
            .await?;
        analyzer_statistics::Entity::delete_many()
            .filter(analyzer_statistics::Column::RunHistoryId.in_subquery(history_ids))
            .exec(conn)
            .await?;
        run_histories::Entity::delete_many()
            .filter(run_histories::Column::RunId.is_in(run_ids.iter().copied()))
            .exec(conn)
            .await?;
        let deleted = runs::Entity::delete_many()
            .filter(runs::Column::Id.is_in(run_ids.iter().copied()))
            .exec(conn)
            .await?;

        debug!("Deleted runs {:?}", run_ids);
        Ok(deleted.rows_affected)
    }

    async fn run_date_of(&self, name: Option<&String>) -> CoreResult<Option<DateTime<Utc>>> {
        let Some(name) = name else {
            return Ok(None);
        };
        let run = runs::Entity::find()
            .filter(runs::Column::Name.eq(name.as_str()))
            .one(&self.db)
            .await?;
        Ok(run.map(|r| r.date))
    }

    async fn filtered_runs(&self, filter: &RunFilter) -> CoreResult<Vec<runs::Model>> {
        let before_run = self.run_date_of(filter.before_run.as_ref()).await?;
        let after_run = self.run_date_of(filter.after_run.as_ref()).await?;
        Ok(runs::Entity::find()
            .filter(run_condition(filter, before_run, after_run))
            .order_by_asc(runs::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn get_run_count(&self, filter: &RunFilter) -> CoreResult<u64> {
        let before_run = self.run_date_of(filter.before_run.as_ref()).await?;
        let after_run = self.run_date_of(filter.after_run.as_ref()).await?;
        Ok(runs::Entity::find()
            .filter(run_condition(filter, before_run, after_run))
            .count(&self.db)
            .await?)
    }

    pub async fn get_run_data(
        &self,
        filter: &RunFilter,
        limit: u64,
        offset: u64,
        sort: Option<RunSortMode>,
    ) -> CoreResult<Vec<RunSummary>> {
        let matching = self.filtered_runs(filter).await?;
        if matching.is_empty() {
            return Ok(Vec::new());
        }
        let run_ids: Vec<i32> = matching.iter().map(|r| r.id).collect();

        let dismissed: Vec<&str> = ReviewStatus::dismissed().iter().map(|s| s.as_str()).collect();
        let unresolved: HashMap<i32, i64> = reports::Entity::find()
            .join(JoinType::LeftJoin, reports::Relation::ReviewStatuses.def())
            .select_only()
            .column(reports::Column::RunId)
            .column_as(Expr::col((reports::Entity, reports::Column::Id)).count(), "count")
            .filter(reports::Column::RunId.is_in(run_ids.iter().copied()))
            .filter(
                reports::Column::DetectionStatus
                    .is_not_in(DetectionStatus::closed().iter().map(|s| s.as_str())),
            )
            .filter(
                Condition::any()
                    .add(review_statuses::Column::Status.is_null())
                    .add(review_statuses::Column::Status.is_not_in(dismissed)),
            )
            .group_by(reports::Column::RunId)
            .into_tuple::<(i32, i64)>()
            .all(&self.db)
            .await?
            .into_iter()
            .collect();

        let mut status_counts: HashMap<i32, HashMap<DetectionStatus, i64>> = HashMap::new();
        let rows: Vec<(i32, String, i64)> = reports::Entity::find()
            .select_only()
            .column(reports::Column::RunId)
            .column(reports::Column::DetectionStatus)
            .column_as(Expr::col((reports::Entity, reports::Column::Id)).count(), "count")
            .filter(reports::Column::RunId.is_in(run_ids.iter().copied()))
            .group_by(reports::Column::RunId)
            .group_by(reports::Column::DetectionStatus)
            .into_tuple()
            .all(&self.db)
            .await?;
        for (run_id, status, count) in rows {
            *status_counts
                .entry(run_id)
                .or_default()
                .entry(DetectionStatus::from_db(&status))
                .or_insert(0) += count;
        }

        // Latest history per run
        let mut latest: HashMap<i32, run_histories::Model> = HashMap::new();
        for history in run_histories::Entity::find()
            .filter(run_histories::Column::RunId.is_in(run_ids.iter().copied()))
            .order_by_desc(run_histories::Column::Time)
            .order_by_desc(run_histories::Column::Id)
            .all(&self.db)
            .await?
        {
            latest.entry(history.run_id).or_insert(history);
        }
        let history_ids: Vec<i32> = latest.values().map(|h| h.id).collect();
        let mut statistics = self.statistics_for(&history_ids, false).await?;

        let mut summaries: Vec<RunSummary> = matching
            .into_iter()
            .map(|run| {
                let history = latest.get(&run.id);
                RunSummary {
                    result_count: unresolved.get(&run.id).copied().unwrap_or(0),
                    detection_status_count: status_counts.remove(&run.id).unwrap_or_default(),
                    version_tag: history.and_then(|h| h.version_tag.clone()),
                    cc_version: history.and_then(|h| h.cc_version.clone()),
                    description: history.and_then(|h| h.description.clone()),
                    analyzer_statistics: history
                        .and_then(|h| statistics.remove(&h.id))
                        .unwrap_or_default(),
                    run_id: run.id,
                    name: run.name,
                    run_date: run.date,
                    duration: run.duration,
                }
            })
            .collect();

        sort_summaries(&mut summaries, sort.unwrap_or_default());
        Ok(summaries
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    /// Statistics keyed by history id, then analyzer.
    async fn statistics_for(
        &self,
        history_ids: &[i32],
        with_failed_files: bool,
    ) -> CoreResult<HashMap<i32, HashMap<String, AnalyzerStatisticsData>>> {
        let mut result: HashMap<i32, HashMap<String, AnalyzerStatisticsData>> = HashMap::new();
        if history_ids.is_empty() {
            return Ok(result);
        }
        let rows = analyzer_statistics::Entity::find()
            .filter(analyzer_statistics::Column::RunHistoryId.is_in(history_ids.iter().copied()))
            .all(&self.db)
            .await?;
        for row in rows {
            let failed_file_paths = if with_failed_files {
                decompress_text(row.failed_files.as_ref())?
                    .lines()
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect()
            } else {
                Vec::new()
            };
            result.entry(row.run_history_id).or_default().insert(
                row.analyzer_type.clone(),
                AnalyzerStatisticsData {
                    version: decompress_text(row.version.as_ref())?,
                    successful: row.successful,
                    failed: row.failed,
                    failed_file_paths,
                },
            );
        }
        Ok(result)
    }

    fn history_condition(run_ids: &[i32], filter: &RunHistoryFilter) -> Condition {
        let mut condition = Condition::all();
        if !run_ids.is_empty() {
            condition = condition.add(run_histories::Column::RunId.is_in(run_ids.iter().copied()));
        }
        if !filter.tag_names.is_empty() {
            condition = condition.add(ilike_any(
                Expr::col((run_histories::Entity, run_histories::Column::VersionTag)).into(),
                &filter.tag_names,
            ));
        }
        if !filter.tag_ids.is_empty() {
            condition = condition.add(run_histories::Column::Id.is_in(filter.tag_ids.iter().copied()));
        }
        condition
    }

    pub async fn get_run_history(
        &self,
        run_ids: &[i32],
        limit: u64,
        offset: u64,
        filter: &RunHistoryFilter,
    ) -> CoreResult<Vec<RunHistoryData>> {
        let histories = run_histories::Entity::find()
            .find_also_related(runs::Entity)
            .filter(Self::history_condition(run_ids, filter))
            .order_by_desc(run_histories::Column::Time)
            .order_by_desc(run_histories::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(&self.db)
            .await?;

        let history_ids: Vec<i32> = histories.iter().map(|(h, _)| h.id).collect();
        let mut statistics = self.statistics_for(&history_ids, false).await?;

        Ok(histories
            .into_iter()
            .map(|(history, run)| RunHistoryData {
                analyzer_statistics: statistics.remove(&history.id).unwrap_or_default(),
                id: history.id,
                run_id: history.run_id,
                run_name: run.map(|r| r.name).unwrap_or_default(),
                version_tag: history.version_tag,
                user: history.user,
                time: history.time,
                cc_version: history.cc_version,
                description: history.description,
            })
            .collect())
    }

    pub async fn get_run_history_count(
        &self,
        run_ids: &[i32],
        filter: &RunHistoryFilter,
    ) -> CoreResult<u64> {
        Ok(run_histories::Entity::find()
            .filter(Self::history_condition(run_ids, filter))
            .count(&self.db)
            .await?)
    }

    async fn resolve_history(
        &self,
        run_history_id: Option<i32>,
        run_id: Option<i32>,
    ) -> CoreResult<Option<run_histories::Model>> {
        if let Some(id) = run_history_id {
            return Ok(run_histories::Entity::find_by_id(id).one(&self.db).await?);
        }
        let Some(run_id) = run_id else {
            return Ok(None);
        };
        Ok(run_histories::Entity::find()
            .filter(run_histories::Column::RunId.eq(run_id))
            .order_by_desc(run_histories::Column::Time)
            .order_by_desc(run_histories::Column::Id)
            .one(&self.db)
            .await?)
    }

    pub async fn get_check_command(
        &self,
        run_history_id: Option<i32>,
        run_id: Option<i32>,
    ) -> CoreResult<String> {
        match self.resolve_history(run_history_id, run_id).await? {
            Some(history) => decompress_text(history.check_command.as_ref()),
            None => Ok(String::new()),
        }
    }

    pub async fn get_analysis_statistics(
        &self,
        run_id: Option<i32>,
        run_history_id: Option<i32>,
    ) -> CoreResult<HashMap<String, AnalyzerStatisticsData>> {
        let Some(history) = self.resolve_history(run_history_id, run_id).await? else {
            return Ok(HashMap::new());
        };
        let mut statistics = self.statistics_for(&[history.id], true).await?;
        Ok(statistics.remove(&history.id).unwrap_or_default())
    }

    async fn run_names(&self, run_ids: &[i32]) -> CoreResult<Vec<String>> {
        if run_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(runs::Entity::find()
            .select_only()
            .column(runs::Column::Name)
            .filter(runs::Column::Id.is_in(run_ids.iter().copied()))
            .into_tuple()
            .all(&self.db)
            .await?)
    }

    pub async fn remove_run(&self, run_id: i32) -> CoreResult<bool> {
        self.remove_run_results(&[run_id]).await
    }

    /// Delete whole runs. Refused while any of them is being stored into.
    pub async fn remove_run_results(&self, run_ids: &[i32]) -> CoreResult<bool> {
        let names = self.run_names(run_ids).await?;
        self.locks.ensure_unlocked(&names).await?;

        let txn = self.db.begin().await?;
        let removed = Self::delete_runs(&txn, run_ids).await?;
        ContentService::remove_unused_files(&txn).await?;
        txn.commit().await?;

        info!("Removed {} run(s): {}", removed, names.join(", "));
        Ok(true)
    }

    /// Delete the reports a filter selects, in chunks.
    pub async fn remove_run_reports(
        &self,
        run_ids: &[i32],
        filter: &ReportFilter,
        cmp_data: Option<&CompareData>,
    ) -> CoreResult<bool> {
        let mut targeted: Vec<i32> = run_ids.to_vec();
        if let Some(cmp) = cmp_data {
            targeted.extend(cmp.run_ids.iter().copied());
        }
        let names = self.run_names(&targeted).await?;
        self.locks.ensure_unlocked(&names).await?;

        let condition = FilterPredicates::build(&self.db, run_ids, filter, cmp_data)
            .await?
            .condition();
        let report_ids: Vec<i32> = joined_reports()
            .select_only()
            .column(reports::Column::Id)
            .filter(condition)
            .into_tuple()
            .all(&self.db)
            .await?;

        let txn = self.db.begin().await?;
        for chunk in chunked(&report_ids, DELETE_CHUNK) {
            bug_path_events::Entity::delete_many()
                .filter(bug_path_events::Column::ReportId.is_in(chunk.iter().copied()))
                .exec(&txn)
                .await?;
            reports::Entity::delete_many()
                .filter(reports::Column::Id.is_in(chunk.iter().copied()))
                .exec(&txn)
                .await?;
        }
        ContentService::remove_unused_files(&txn).await?;
        txn.commit().await?;

        info!("Removed {} report(s) from runs {:?}", report_ids.len(), targeted);
        Ok(true)
    }

    pub async fn update_run_data(&self, run_id: i32, new_name: &str) -> CoreResult<bool> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(CoreError::validation(
                "No new run name was given to update the run.",
            ));
        }

        let txn = self.db.begin().await?;
        let taken = runs::Entity::find()
            .filter(runs::Column::Name.eq(new_name))
            .one(&txn)
            .await?;
        if taken.is_some() {
            return Err(CoreError::conflict(format!(
                "New run name '{}' already exists.",
                new_name
            )));
        }

        let run = runs::Entity::find_by_id(run_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                CoreError::new(
                    CoreErrorKind::NotFound,
                    format!("Run with the given id ({}) does not exist!", run_id),
                )
            })?;

        let old_name = run.name.clone();
        let mut active: runs::ActiveModel = run.into();
        active.name = Set(new_name.to_string());
        active.update(&txn).await?;
        txn.commit().await?;

        info!("Run name '{}' ({}) was changed to '{}'", old_name, run_id, new_name);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::zlib;
    use crate::database::test_utils::setup_test_db;
    use crate::errors::ErrorCode;

    async fn service() -> RunService {
        let db = setup_test_db().await;
        let locks = Arc::new(RunLockService::new(db.clone(), chrono::Duration::seconds(1800)));
        RunService::new(db, locks)
    }

    async fn add_run(db: &DatabaseConnection, name: &str) -> runs::Model {
        runs::ActiveModel::new(name).insert(db).await.unwrap()
    }

    #[tokio::test]
    async fn rename_rejects_empty_duplicate_and_unknown() {
        let service = service().await;
        let a = add_run(&service.db, "a").await;
        add_run(&service.db, "b").await;

        let err = service.update_run_data(a.id, "  ").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::General);

        let err = service.update_run_data(a.id, "b").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Database);

        let err = service.update_run_data(999, "c").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Database);

        assert!(service.update_run_data(a.id, "c").await.unwrap());
        let renamed = runs::Entity::find_by_id(a.id).one(&service.db).await.unwrap().unwrap();
        assert_eq!(renamed.name, "c");
    }

    #[tokio::test]
    async fn run_filter_matches_names_and_sorts_by_name() {
        let service = service().await;
        for name in ["proj-main", "proj-dev", "other"] {
            add_run(&service.db, name).await;
        }

        let filter = RunFilter {
            names: vec!["proj".to_string()],
            ..Default::default()
        };
        let sort = RunSortMode {
            sort_type: RunSortType::Name,
            ord: SortOrder::Asc,
        };
        let runs = service.get_run_data(&filter, 10, 0, Some(sort)).await.unwrap();
        let names: Vec<&str> = runs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["proj-dev", "proj-main"]);
        assert_eq!(service.get_run_count(&filter).await.unwrap(), 2);

        let exact = RunFilter {
            names: vec!["proj".to_string()],
            exact_match: true,
            ..Default::default()
        };
        assert_eq!(service.get_run_count(&exact).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn check_command_falls_back_to_latest_history() {
        let service = service().await;
        let run = add_run(&service.db, "proj").await;
        run_histories::ActiveModel {
            run_id: Set(run.id),
            time: Set(Utc::now()),
            user: Set("alice".to_string()),
            check_command: Set(Some(zlib(b"analyze main.c").unwrap())),
            ..Default::default()
        }
        .insert(&service.db)
        .await
        .unwrap();

        let command = service.get_check_command(None, Some(run.id)).await.unwrap();
        assert_eq!(command, "analyze main.c");
        assert_eq!(service.get_check_command(None, None).await.unwrap(), "");
    }

    #[test]
    fn default_run_sort_is_newest_first() {
        let sort = RunSortMode::default();
        assert_eq!(sort.sort_type, RunSortType::Date);
        assert_eq!(sort.ord, SortOrder::Desc);
    }
}
