use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::Serialize;

use super::filter::{count_expr, joined_reports, CompareData, FilterPredicates, ReportFilter};
use super::sort::{order_by, SortMode};
use crate::database::entities::common_types::{DetectionStatus, Severity};
use crate::database::entities::{bug_path_events, files, reports, review_statuses, runs};
use crate::errors::{CoreError, CoreResult};
use crate::services::review_service::ReviewData;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BugPathEventData {
    pub position: i32,
    pub file_id: i32,
    pub file_path: String,
    pub line: i32,
    pub column: i32,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDetails {
    pub path_events: Vec<BugPathEventData>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub report_id: i32,
    pub run_id: i32,
    pub bug_hash: String,
    pub checked_file: String,
    pub file_id: i32,
    pub line: i32,
    pub column: i32,
    pub checker_id: String,
    pub analyzer_name: String,
    pub checker_msg: String,
    pub severity: Severity,
    pub review_data: ReviewData,
    pub detection_status: DetectionStatus,
    pub detected_at: DateTime<Utc>,
    pub fixed_at: Option<DateTime<Utc>>,
    pub bug_path_length: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ReportDetails>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReportCount {
    pub run_id: i32,
    pub name: String,
    pub report_count: i64,
}

/// Read side of the report store.
#[derive(Clone)]
pub struct ReportQueryService {
    pub(super) db: DatabaseConnection,
}

impl ReportQueryService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub(super) async fn predicates(
        &self,
        run_ids: &[i32],
        filter: &ReportFilter,
        cmp_data: Option<&CompareData>,
    ) -> CoreResult<FilterPredicates> {
        FilterPredicates::build(&self.db, run_ids, filter, cmp_data).await
    }

    /// One page of matching reports.
    ///
    /// In uniqueness mode rows are first collapsed per identity, keeping the
    /// row with the highest id as the representative. Sorting and paging
    /// apply to the collapsed groups, so run id, line and detection status
    /// come from that representative row.
    #[allow(clippy::too_many_arguments)]
    pub async fn get_run_results(
        &self,
        run_ids: &[i32],
        limit: u64,
        offset: u64,
        sort: &[SortMode],
        filter: &ReportFilter,
        cmp_data: Option<&CompareData>,
        include_details: bool,
    ) -> CoreResult<Vec<ReportData>> {
        let condition = self.predicates(run_ids, filter, cmp_data).await?.condition();
        let is_unique = filter.is_unique;

        let rows = if is_unique {
            // Pick one representative per identity, then load and re-sort
            // those rows since grouping loses the order.
            let mut grouped = joined_reports()
                .select_only()
                .column_as(Expr::col((reports::Entity, reports::Column::Id)).max(), "id")
                .filter(condition)
                .group_by(reports::Column::BugId);
            for (column, order) in order_by(sort, true) {
                grouped = grouped.order_by(SimpleExpr::from(Func::max(column)), order);
            }
            let ids: Vec<i32> = grouped
                .order_by_asc(reports::Column::BugId)
                .limit(limit)
                .offset(offset)
                .into_tuple()
                .all(&self.db)
                .await?;
            if ids.is_empty() {
                return Ok(Vec::new());
            }

            let mut select = joined_reports().filter(reports::Column::Id.is_in(ids));
            for (column, order) in order_by(sort, true) {
                select = select.order_by(column, order);
            }
            select.order_by_asc(reports::Column::BugId).all(&self.db).await?
        } else {
            let mut select = joined_reports().filter(condition);
            for (column, order) in order_by(sort, false) {
                select = select.order_by(column, order);
            }
            select
                .order_by_asc(reports::Column::Id)
                .limit(limit)
                .offset(offset)
                .all(&self.db)
                .await?
        };

        self.to_report_data(rows, include_details).await
    }

    pub async fn get_run_result_count(
        &self,
        run_ids: &[i32],
        filter: &ReportFilter,
        cmp_data: Option<&CompareData>,
    ) -> CoreResult<u64> {
        let condition = self.predicates(run_ids, filter, cmp_data).await?.condition();
        let select = joined_reports().filter(condition);
        let count = if filter.is_unique {
            select
                .select_only()
                .column(reports::Column::BugId)
                .group_by(reports::Column::BugId)
                .count(&self.db)
                .await?
        } else {
            select.count(&self.db).await?
        };
        Ok(count)
    }

    /// Matching report count per run, ordered by run name.
    pub async fn get_run_report_counts(
        &self,
        run_ids: &[i32],
        filter: &ReportFilter,
        limit: u64,
        offset: u64,
    ) -> CoreResult<Vec<RunReportCount>> {
        let condition = self.predicates(run_ids, filter, None).await?.condition();
        let counts: Vec<(i32, String, i64)> = joined_reports()
            .select_only()
            .column_as(Expr::col((runs::Entity, runs::Column::Id)), "run_id")
            .column_as(Expr::col((runs::Entity, runs::Column::Name)).max(), "name")
            .column_as(count_expr(filter.is_unique), "count")
            .filter(condition)
            .group_by(runs::Column::Id)
            .order_by_asc(SimpleExpr::from(Expr::col((runs::Entity, runs::Column::Name)).max()))
            .limit(limit)
            .offset(offset)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(counts
            .into_iter()
            .map(|(run_id, name, report_count)| RunReportCount {
                run_id,
                name,
                report_count,
            })
            .collect())
    }

    pub async fn get_report(&self, report_id: i32) -> CoreResult<ReportData> {
        let report = reports::Entity::find_by_id(report_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("Report id", report_id.to_string()))?;
        let mut data = self.to_report_data(vec![report], false).await?;
        data.pop()
            .ok_or_else(|| CoreError::not_found("Report id", report_id.to_string()))
    }

    pub async fn get_report_details(&self, report_id: i32) -> CoreResult<ReportDetails> {
        if reports::Entity::find_by_id(report_id)
            .one(&self.db)
            .await?
            .is_none()
        {
            return Err(CoreError::not_found("Report id", report_id.to_string()));
        }
        let mut details = self.load_details(&[report_id]).await?;
        Ok(details.remove(&report_id).unwrap_or_default())
    }

    async fn load_details(&self, report_ids: &[i32]) -> CoreResult<HashMap<i32, ReportDetails>> {
        let events = bug_path_events::Entity::find()
            .find_also_related(files::Entity)
            .filter(bug_path_events::Column::ReportId.is_in(report_ids.iter().copied()))
            .order_by_asc(bug_path_events::Column::ReportId)
            .order_by_asc(bug_path_events::Column::Position)
            .all(&self.db)
            .await?;

        let mut details: HashMap<i32, ReportDetails> = HashMap::new();
        for (event, file) in events {
            details
                .entry(event.report_id)
                .or_default()
                .path_events
                .push(BugPathEventData {
                    position: event.position,
                    file_id: event.file_id,
                    file_path: file.map(|f| f.filepath).unwrap_or_default(),
                    line: event.line,
                    column: event.column_number,
                    message: event.message,
                });
        }
        Ok(details)
    }

    async fn to_report_data(
        &self,
        rows: Vec<reports::Model>,
        include_details: bool,
    ) -> CoreResult<Vec<ReportData>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let file_ids: Vec<i32> = rows.iter().map(|r| r.file_id).collect();
        let paths: HashMap<i32, String> = files::Entity::find()
            .filter(files::Column::Id.is_in(file_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|f| (f.id, f.filepath))
            .collect();

        let bug_ids: Vec<String> = rows.iter().map(|r| r.bug_id.clone()).collect();
        let reviews: HashMap<String, ReviewData> = review_statuses::Entity::find()
            .filter(review_statuses::Column::BugHash.is_in(bug_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|r| (r.bug_hash.clone(), ReviewData::from(r)))
            .collect();

        let mut details = if include_details {
            let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
            self.load_details(&ids).await?
        } else {
            HashMap::new()
        };

        Ok(rows
            .into_iter()
            .map(|row| ReportData {
                report_id: row.id,
                run_id: row.run_id,
                checked_file: paths.get(&row.file_id).cloned().unwrap_or_default(),
                file_id: row.file_id,
                line: row.line,
                column: row.column_number,
                severity: row.get_severity(),
                detection_status: row.get_detection_status(),
                review_data: reviews.get(&row.bug_id).cloned().unwrap_or_default(),
                details: if include_details {
                    Some(details.remove(&row.id).unwrap_or_default())
                } else {
                    None
                },
                checker_id: row.checker_id,
                analyzer_name: row.analyzer_name,
                checker_msg: row.checker_message,
                detected_at: row.detected_at,
                fixed_at: row.fixed_at,
                bug_path_length: row.path_length,
                bug_hash: row.bug_id,
            })
            .collect())
    }
}
