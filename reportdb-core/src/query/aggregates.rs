use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Condition, Expr, Iden, JoinType};
use sea_orm::{QueryFilter, QueryOrder, QuerySelect, QueryTrait};
use serde::Serialize;

use super::filter::{count_alias, count_expr, joined_reports, CompareData, ReportFilter};
use super::results::ReportQueryService;
use crate::database::entities::common_types::{DetectionStatus, ReviewStatus, Severity};
use crate::database::entities::{files, reports, review_statuses, run_histories, runs};
use crate::errors::CoreResult;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckerCount {
    pub name: String,
    pub severity: Severity,
    pub count: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTagCount {
    pub id: i32,
    pub time: DateTime<Utc>,
    pub name: String,
    pub run_id: i32,
    pub run_name: String,
    pub count: i64,
}

/// Counts over the same filtered row set that `get_run_results` pages
/// through. In uniqueness mode each key counts distinct identities.
impl ReportQueryService {
    pub async fn get_checker_counts(
        &self,
        run_ids: &[i32],
        filter: &ReportFilter,
        cmp_data: Option<&CompareData>,
        limit: u64,
        offset: u64,
    ) -> CoreResult<Vec<CheckerCount>> {
        let condition = self.predicates(run_ids, filter, cmp_data).await?.condition();
        let rows: Vec<(String, i32, i64)> = joined_reports()
            .select_only()
            .column(reports::Column::CheckerId)
            .column_as(Expr::col((reports::Entity, reports::Column::Severity)).max(), "severity")
            .column_as(count_expr(filter.is_unique), count_alias().to_string())
            .filter(condition)
            .group_by(reports::Column::CheckerId)
            .order_by_asc(reports::Column::CheckerId)
            .limit(limit)
            .offset(offset)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(name, severity, count)| CheckerCount {
                name,
                severity: Severity::from_weight(severity),
                count,
            })
            .collect())
    }

    pub async fn get_analyzer_name_counts(
        &self,
        run_ids: &[i32],
        filter: &ReportFilter,
        cmp_data: Option<&CompareData>,
        limit: u64,
        offset: u64,
    ) -> CoreResult<HashMap<String, i64>> {
        let condition = self.predicates(run_ids, filter, cmp_data).await?.condition();
        let rows: Vec<(String, i64)> = joined_reports()
            .select_only()
            .column(reports::Column::AnalyzerName)
            .column_as(count_expr(filter.is_unique), count_alias().to_string())
            .filter(condition)
            .group_by(reports::Column::AnalyzerName)
            .order_by_asc(reports::Column::AnalyzerName)
            .limit(limit)
            .offset(offset)
            .into_tuple()
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().collect())
    }

    pub async fn get_severity_counts(
        &self,
        run_ids: &[i32],
        filter: &ReportFilter,
        cmp_data: Option<&CompareData>,
    ) -> CoreResult<BTreeMap<Severity, i64>> {
        let condition = self.predicates(run_ids, filter, cmp_data).await?.condition();
        let rows: Vec<(i32, i64)> = joined_reports()
            .select_only()
            .column(reports::Column::Severity)
            .column_as(count_expr(filter.is_unique), count_alias().to_string())
            .filter(condition)
            .group_by(reports::Column::Severity)
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut counts = BTreeMap::new();
        for (weight, count) in rows {
            *counts.entry(Severity::from_weight(weight)).or_insert(0) += count;
        }
        Ok(counts)
    }

    pub async fn get_checker_msg_counts(
        &self,
        run_ids: &[i32],
        filter: &ReportFilter,
        cmp_data: Option<&CompareData>,
        limit: u64,
        offset: u64,
    ) -> CoreResult<HashMap<String, i64>> {
        let condition = self.predicates(run_ids, filter, cmp_data).await?.condition();
        let rows: Vec<(String, i64)> = joined_reports()
            .select_only()
            .column(reports::Column::CheckerMessage)
            .column_as(count_expr(filter.is_unique), count_alias().to_string())
            .filter(condition)
            .group_by(reports::Column::CheckerMessage)
            .order_by_asc(reports::Column::CheckerMessage)
            .limit(limit)
            .offset(offset)
            .into_tuple()
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().collect())
    }

    /// Reports without a review status row count as unreviewed.
    pub async fn get_review_status_counts(
        &self,
        run_ids: &[i32],
        filter: &ReportFilter,
        cmp_data: Option<&CompareData>,
    ) -> CoreResult<HashMap<ReviewStatus, i64>> {
        let condition = self.predicates(run_ids, filter, cmp_data).await?.condition();
        let rows: Vec<(Option<String>, i64)> = joined_reports()
            .select_only()
            .column(review_statuses::Column::Status)
            .column_as(count_expr(filter.is_unique), count_alias().to_string())
            .filter(condition)
            .group_by(review_statuses::Column::Status)
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut counts = HashMap::new();
        for (status, count) in rows {
            *counts
                .entry(ReviewStatus::from_db(status.as_deref()))
                .or_insert(0) += count;
        }
        Ok(counts)
    }

    pub async fn get_file_counts(
        &self,
        run_ids: &[i32],
        filter: &ReportFilter,
        cmp_data: Option<&CompareData>,
        limit: u64,
        offset: u64,
    ) -> CoreResult<HashMap<String, i64>> {
        let condition = self.predicates(run_ids, filter, cmp_data).await?.condition();
        let rows: Vec<(String, i64)> = joined_reports()
            .select_only()
            .column(files::Column::Filepath)
            .column_as(count_expr(filter.is_unique), count_alias().to_string())
            .filter(condition)
            .group_by(files::Column::Filepath)
            .order_by_asc(files::Column::Filepath)
            .limit(limit)
            .offset(offset)
            .into_tuple()
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().collect())
    }

    pub async fn get_detection_status_counts(
        &self,
        run_ids: &[i32],
        filter: &ReportFilter,
        cmp_data: Option<&CompareData>,
    ) -> CoreResult<HashMap<DetectionStatus, i64>> {
        let condition = self.predicates(run_ids, filter, cmp_data).await?.condition();
        let rows: Vec<(String, i64)> = joined_reports()
            .select_only()
            .column(reports::Column::DetectionStatus)
            .column_as(count_expr(filter.is_unique), count_alias().to_string())
            .filter(condition)
            .group_by(reports::Column::DetectionStatus)
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut counts = HashMap::new();
        for (status, count) in rows {
            *counts.entry(DetectionStatus::from_db(&status)).or_insert(0) += count;
        }
        Ok(counts)
    }

    /// Per tagged history of the selected runs: matching reports that were
    /// open at the tag time.
    pub async fn get_run_history_tag_counts(
        &self,
        run_ids: &[i32],
        filter: &ReportFilter,
        cmp_data: Option<&CompareData>,
        limit: u64,
        offset: u64,
    ) -> CoreResult<Vec<RunTagCount>> {
        let condition = self.predicates(run_ids, filter, cmp_data).await?.condition();
        let history = |column: run_histories::Column| Expr::col((run_histories::Entity, column));

        let mut select = joined_reports()
            .select_only()
            .column(run_histories::Column::Id)
            .column(run_histories::Column::Time)
            .column(run_histories::Column::VersionTag)
            .column(run_histories::Column::RunId)
            .column(runs::Column::Name)
            .column_as(count_expr(filter.is_unique), count_alias().to_string())
            .filter(condition)
            .filter(history(run_histories::Column::VersionTag).is_not_null())
            .filter(
                Expr::col((reports::Entity, reports::Column::DetectedAt))
                    .lte(history(run_histories::Column::Time)),
            )
            .filter(
                Condition::any()
                    .add(Expr::col((reports::Entity, reports::Column::FixedAt)).is_null())
                    .add(
                        Expr::col((reports::Entity, reports::Column::FixedAt))
                            .gt(history(run_histories::Column::Time)),
                    ),
            )
            .group_by(run_histories::Column::Id)
            .group_by(run_histories::Column::Time)
            .group_by(run_histories::Column::VersionTag)
            .group_by(run_histories::Column::RunId)
            .group_by(runs::Column::Name)
            .order_by_desc(run_histories::Column::Time)
            .limit(limit)
            .offset(offset);
        QueryTrait::query(&mut select).join(
            JoinType::InnerJoin,
            run_histories::Entity,
            history(run_histories::Column::RunId).equals((reports::Entity, reports::Column::RunId)),
        );

        let rows: Vec<(i32, DateTime<Utc>, Option<String>, i32, String, i64)> =
            select.into_tuple().all(&self.db).await?;

        Ok(rows
            .into_iter()
            .map(|(id, time, tag, run_id, run_name, count)| RunTagCount {
                id,
                time,
                name: tag.unwrap_or_default(),
                run_id,
                run_name,
                count,
            })
            .collect())
    }
}
