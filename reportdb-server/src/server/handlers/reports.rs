use std::collections::{BTreeMap, HashMap};

use axum::extract::{Extension, Json, State};
use reportdb::auth::Actor;
use reportdb::database::entities::common_types::{DetectionStatus, ReviewStatus, Severity};
use reportdb::query::{
    CheckerCount, CompareData, DiffType, ReportData, ReportDetails, ReportFilter, RunReportCount,
    RunTagCount, SortMode,
};
use serde::Deserialize;

use crate::server::app::AppState;
use crate::server::error::ApiResult;

/// Body shared by result listing, counting and every aggregate.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQueryRequest {
    #[serde(default)]
    pub run_ids: Vec<i32>,
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub sort_types: Vec<SortMode>,
    #[serde(default)]
    pub report_filter: ReportFilter,
    pub cmp_data: Option<CompareData>,
    #[serde(default)]
    pub get_details: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportIdRequest {
    pub report_id: i32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResultsHashRequest {
    #[serde(default)]
    pub run_ids: Vec<i32>,
    pub report_hashes: Vec<String>,
    pub diff_type: DiffType,
    #[serde(default)]
    pub skip_detection_statuses: Vec<DetectionStatus>,
}

pub async fn get_run_results(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<ReportQueryRequest>,
) -> ApiResult<Vec<ReportData>> {
    let results = state
        .ctx
        .get_run_results(
            &actor,
            &request.run_ids,
            request.limit,
            request.offset,
            &request.sort_types,
            &request.report_filter,
            request.cmp_data.as_ref(),
            request.get_details,
        )
        .await?;
    Ok(Json(results))
}

pub async fn get_run_result_count(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<ReportQueryRequest>,
) -> ApiResult<u64> {
    let count = state
        .ctx
        .get_run_result_count(
            &actor,
            &request.run_ids,
            &request.report_filter,
            request.cmp_data.as_ref(),
        )
        .await?;
    Ok(Json(count))
}

pub async fn get_run_report_counts(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<ReportQueryRequest>,
) -> ApiResult<Vec<RunReportCount>> {
    let counts = state
        .ctx
        .get_run_report_counts(
            &actor,
            &request.run_ids,
            &request.report_filter,
            request.limit,
            request.offset,
        )
        .await?;
    Ok(Json(counts))
}

pub async fn get_report(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<ReportIdRequest>,
) -> ApiResult<ReportData> {
    Ok(Json(state.ctx.get_report(&actor, request.report_id).await?))
}

pub async fn get_report_details(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<ReportIdRequest>,
) -> ApiResult<ReportDetails> {
    Ok(Json(
        state
            .ctx
            .get_report_details(&actor, request.report_id)
            .await?,
    ))
}

pub async fn get_diff_results_hash(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<DiffResultsHashRequest>,
) -> ApiResult<Vec<String>> {
    let hashes = state
        .ctx
        .get_diff_results_hash(
            &actor,
            &request.run_ids,
            &request.report_hashes,
            request.diff_type,
            &request.skip_detection_statuses,
        )
        .await?;
    Ok(Json(hashes))
}

pub async fn get_checker_counts(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<ReportQueryRequest>,
) -> ApiResult<Vec<CheckerCount>> {
    let counts = state
        .ctx
        .get_checker_counts(
            &actor,
            &request.run_ids,
            &request.report_filter,
            request.cmp_data.as_ref(),
            request.limit,
            request.offset,
        )
        .await?;
    Ok(Json(counts))
}

pub async fn get_analyzer_name_counts(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<ReportQueryRequest>,
) -> ApiResult<HashMap<String, i64>> {
    let counts = state
        .ctx
        .get_analyzer_name_counts(
            &actor,
            &request.run_ids,
            &request.report_filter,
            request.cmp_data.as_ref(),
            request.limit,
            request.offset,
        )
        .await?;
    Ok(Json(counts))
}

pub async fn get_severity_counts(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<ReportQueryRequest>,
) -> ApiResult<BTreeMap<Severity, i64>> {
    let counts = state
        .ctx
        .get_severity_counts(
            &actor,
            &request.run_ids,
            &request.report_filter,
            request.cmp_data.as_ref(),
        )
        .await?;
    Ok(Json(counts))
}

pub async fn get_checker_msg_counts(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<ReportQueryRequest>,
) -> ApiResult<HashMap<String, i64>> {
    let counts = state
        .ctx
        .get_checker_msg_counts(
            &actor,
            &request.run_ids,
            &request.report_filter,
            request.cmp_data.as_ref(),
            request.limit,
            request.offset,
        )
        .await?;
    Ok(Json(counts))
}

pub async fn get_review_status_counts(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<ReportQueryRequest>,
) -> ApiResult<HashMap<ReviewStatus, i64>> {
    let counts = state
        .ctx
        .get_review_status_counts(
            &actor,
            &request.run_ids,
            &request.report_filter,
            request.cmp_data.as_ref(),
        )
        .await?;
    Ok(Json(counts))
}

pub async fn get_file_counts(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<ReportQueryRequest>,
) -> ApiResult<HashMap<String, i64>> {
    let counts = state
        .ctx
        .get_file_counts(
            &actor,
            &request.run_ids,
            &request.report_filter,
            request.cmp_data.as_ref(),
            request.limit,
            request.offset,
        )
        .await?;
    Ok(Json(counts))
}

pub async fn get_run_history_tag_counts(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<ReportQueryRequest>,
) -> ApiResult<Vec<RunTagCount>> {
    let counts = state
        .ctx
        .get_run_history_tag_counts(
            &actor,
            &request.run_ids,
            &request.report_filter,
            request.cmp_data.as_ref(),
            request.limit,
            request.offset,
        )
        .await?;
    Ok(Json(counts))
}

pub async fn get_detection_status_counts(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<ReportQueryRequest>,
) -> ApiResult<HashMap<DetectionStatus, i64>> {
    let counts = state
        .ctx
        .get_detection_status_counts(
            &actor,
            &request.run_ids,
            &request.report_filter,
            request.cmp_data.as_ref(),
        )
        .await?;
    Ok(Json(counts))
}
