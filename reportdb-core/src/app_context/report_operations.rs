use std::collections::{BTreeMap, HashMap};

use super::AppContext;
use crate::auth::{Actor, Permission};
use crate::database::entities::common_types::{DetectionStatus, ReviewStatus, Severity};
use crate::errors::CoreResult;
use crate::query::{
    CheckerCount, CompareData, DiffType, ReportData, ReportDetails, ReportFilter, RunReportCount,
    RunTagCount, SortMode,
};

impl AppContext {
    #[allow(clippy::too_many_arguments)]
    pub async fn get_run_results(
        &self,
        actor: &Actor,
        run_ids: &[i32],
        limit: Option<u64>,
        offset: u64,
        sort: &[SortMode],
        filter: &ReportFilter,
        cmp_data: Option<&CompareData>,
        include_details: bool,
    ) -> CoreResult<Vec<ReportData>> {
        self.authorize(actor, Permission::Access)?;
        self.report_query_service
            .get_run_results(
                run_ids,
                self.page_size(limit),
                offset,
                sort,
                filter,
                cmp_data,
                include_details,
            )
            .await
    }

    pub async fn get_run_result_count(
        &self,
        actor: &Actor,
        run_ids: &[i32],
        filter: &ReportFilter,
        cmp_data: Option<&CompareData>,
    ) -> CoreResult<u64> {
        self.authorize(actor, Permission::Access)?;
        self.report_query_service
            .get_run_result_count(run_ids, filter, cmp_data)
            .await
    }

    pub async fn get_run_report_counts(
        &self,
        actor: &Actor,
        run_ids: &[i32],
        filter: &ReportFilter,
        limit: Option<u64>,
        offset: u64,
    ) -> CoreResult<Vec<RunReportCount>> {
        self.authorize(actor, Permission::Access)?;
        self.report_query_service
            .get_run_report_counts(run_ids, filter, self.page_size(limit), offset)
            .await
    }

    pub async fn get_report(&self, actor: &Actor, report_id: i32) -> CoreResult<ReportData> {
        self.authorize(actor, Permission::Access)?;
        self.report_query_service.get_report(report_id).await
    }

    pub async fn get_report_details(
        &self,
        actor: &Actor,
        report_id: i32,
    ) -> CoreResult<ReportDetails> {
        self.authorize(actor, Permission::Access)?;
        self.report_query_service.get_report_details(report_id).await
    }

    pub async fn get_diff_results_hash(
        &self,
        actor: &Actor,
        run_ids: &[i32],
        report_hashes: &[String],
        diff_type: DiffType,
        skip_statuses: &[DetectionStatus],
    ) -> CoreResult<Vec<String>> {
        self.authorize(actor, Permission::Access)?;
        self.report_query_service
            .get_diff_results_hash(
                run_ids,
                report_hashes,
                diff_type,
                skip_statuses,
                self.config.diff_chunk_size,
            )
            .await
    }

    // ----- Aggregates ------------------------------------------------------

    pub async fn get_checker_counts(
        &self,
        actor: &Actor,
        run_ids: &[i32],
        filter: &ReportFilter,
        cmp_data: Option<&CompareData>,
        limit: Option<u64>,
        offset: u64,
    ) -> CoreResult<Vec<CheckerCount>> {
        self.authorize(actor, Permission::Access)?;
        self.report_query_service
            .get_checker_counts(run_ids, filter, cmp_data, self.page_size(limit), offset)
            .await
    }

    pub async fn get_analyzer_name_counts(
        &self,
        actor: &Actor,
        run_ids: &[i32],
        filter: &ReportFilter,
        cmp_data: Option<&CompareData>,
        limit: Option<u64>,
        offset: u64,
    ) -> CoreResult<HashMap<String, i64>> {
        self.authorize(actor, Permission::Access)?;
        self.report_query_service
            .get_analyzer_name_counts(run_ids, filter, cmp_data, self.page_size(limit), offset)
            .await
    }

    pub async fn get_severity_counts(
        &self,
        actor: &Actor,
        run_ids: &[i32],
        filter: &ReportFilter,
        cmp_data: Option<&CompareData>,
    ) -> CoreResult<BTreeMap<Severity, i64>> {
        self.authorize(actor, Permission::Access)?;
        self.report_query_service
            .get_severity_counts(run_ids, filter, cmp_data)
            .await
    }

    pub async fn get_checker_msg_counts(
        &self,
        actor: &Actor,
        run_ids: &[i32],
        filter: &ReportFilter,
        cmp_data: Option<&CompareData>,
        limit: Option<u64>,
        offset: u64,
    ) -> CoreResult<HashMap<String, i64>> {
        self.authorize(actor, Permission::Access)?;
        self.report_query_service
            .get_checker_msg_counts(run_ids, filter, cmp_data, self.page_size(limit), offset)
            .await
    }

    pub async fn get_review_status_counts(
        &self,
        actor: &Actor,
        run_ids: &[i32],
        filter: &ReportFilter,
        cmp_data: Option<&CompareData>,
    ) -> CoreResult<HashMap<ReviewStatus, i64>> {
        self.authorize(actor, Permission::Access)?;
        self.report_query_service
            .get_review_status_counts(run_ids, filter, cmp_data)
            .await
    }

    pub async fn get_file_counts(
        &self,
        actor: &Actor,
        run_ids: &[i32],
        filter: &ReportFilter,
        cmp_data: Option<&CompareData>,
        limit: Option<u64>,
        offset: u64,
    ) -> CoreResult<HashMap<String, i64>> {
        self.authorize(actor, Permission::Access)?;
        self.report_query_service
            .get_file_counts(run_ids, filter, cmp_data, self.page_size(limit), offset)
            .await
    }

    pub async fn get_run_history_tag_counts(
        &self,
        actor: &Actor,
        run_ids: &[i32],
        filter: &ReportFilter,
        cmp_data: Option<&CompareData>,
        limit: Option<u64>,
        offset: u64,
    ) -> CoreResult<Vec<RunTagCount>> {
        self.authorize(actor, Permission::Access)?;
        self.report_query_service
            .get_run_history_tag_counts(run_ids, filter, cmp_data, self.page_size(limit), offset)
            .await
    }

    pub async fn get_detection_status_counts(
        &self,
        actor: &Actor,
        run_ids: &[i32],
        filter: &ReportFilter,
        cmp_data: Option<&CompareData>,
    ) -> CoreResult<HashMap<DetectionStatus, i64>> {
        self.authorize(actor, Permission::Access)?;
        self.report_query_service
            .get_detection_status_counts(run_ids, filter, cmp_data)
            .await
    }
}
