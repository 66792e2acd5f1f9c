use std::collections::HashMap;

use axum::extract::{Extension, Json, State};
use reportdb::auth::Actor;
use reportdb::query::{CompareData, ReportFilter, RunFilter, RunHistoryFilter};
use reportdb::services::{AnalyzerStatisticsData, RunHistoryData, RunSortMode, RunSummary};
use serde::Deserialize;

use crate::server::app::AppState;
use crate::server::error::ApiResult;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunDataRequest {
    #[serde(default)]
    pub run_filter: RunFilter,
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: u64,
    pub sort_mode: Option<RunSortMode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCountRequest {
    #[serde(default)]
    pub run_filter: RunFilter,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunHistoryRequest {
    #[serde(default)]
    pub run_ids: Vec<i32>,
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub run_history_filter: RunHistoryFilter,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySelector {
    pub run_id: Option<i32>,
    pub run_history_id: Option<i32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunIdRequest {
    pub run_id: i32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunIdsRequest {
    pub run_ids: Vec<i32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveRunReportsRequest {
    #[serde(default)]
    pub run_ids: Vec<i32>,
    #[serde(default)]
    pub report_filter: ReportFilter,
    pub cmp_data: Option<CompareData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRunDataRequest {
    pub run_id: i32,
    pub new_run_name: String,
}

pub async fn get_run_data(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<RunDataRequest>,
) -> ApiResult<Vec<RunSummary>> {
    let runs = state
        .ctx
        .get_run_data(
            &actor,
            &request.run_filter,
            request.limit,
            request.offset,
            request.sort_mode,
        )
        .await?;
    Ok(Json(runs))
}

pub async fn get_run_count(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<RunCountRequest>,
) -> ApiResult<u64> {
    Ok(Json(state.ctx.get_run_count(&actor, &request.run_filter).await?))
}

pub async fn get_run_history(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<RunHistoryRequest>,
) -> ApiResult<Vec<RunHistoryData>> {
    let history = state
        .ctx
        .get_run_history(
            &actor,
            &request.run_ids,
            request.limit,
            request.offset,
            &request.run_history_filter,
        )
        .await?;
    Ok(Json(history))
}

pub async fn get_run_history_count(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<RunHistoryRequest>,
) -> ApiResult<u64> {
    let count = state
        .ctx
        .get_run_history_count(&actor, &request.run_ids, &request.run_history_filter)
        .await?;
    Ok(Json(count))
}

pub async fn get_check_command(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<HistorySelector>,
) -> ApiResult<String> {
    let command = state
        .ctx
        .get_check_command(&actor, request.run_history_id, request.run_id)
        .await?;
    Ok(Json(command))
}

pub async fn get_analysis_statistics(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<HistorySelector>,
) -> ApiResult<HashMap<String, AnalyzerStatisticsData>> {
    let statistics = state
        .ctx
        .get_analysis_statistics(&actor, request.run_id, request.run_history_id)
        .await?;
    Ok(Json(statistics))
}

pub async fn remove_run(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<RunIdRequest>,
) -> ApiResult<bool> {
    Ok(Json(state.ctx.remove_run(&actor, request.run_id).await?))
}

pub async fn remove_run_results(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<RunIdsRequest>,
) -> ApiResult<bool> {
    Ok(Json(
        state.ctx.remove_run_results(&actor, &request.run_ids).await?,
    ))
}

pub async fn remove_run_reports(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<RemoveRunReportsRequest>,
) -> ApiResult<bool> {
    let removed = state
        .ctx
        .remove_run_reports(
            &actor,
            &request.run_ids,
            &request.report_filter,
            request.cmp_data.as_ref(),
        )
        .await?;
    Ok(Json(removed))
}

pub async fn update_run_data(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<UpdateRunDataRequest>,
) -> ApiResult<bool> {
    let updated = state
        .ctx
        .update_run_data(&actor, request.run_id, &request.new_run_name)
        .await?;
    Ok(Json(updated))
}
