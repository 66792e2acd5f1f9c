use axum::extract::{Extension, Json, State};
use reportdb::auth::Actor;
use reportdb::database::entities::common_types::ReviewStatus;
use reportdb::services::CommentData;
use serde::Deserialize;

use crate::server::app::AppState;
use crate::server::error::ApiResult;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeReviewStatusRequest {
    pub report_id: i32,
    pub status: ReviewStatus,
    pub message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCommentsRequest {
    pub report_id: i32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentRequest {
    pub report_id: i32,
    pub message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCommentRequest {
    pub comment_id: i32,
    pub content: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentIdRequest {
    pub comment_id: i32,
}

pub async fn change_review_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<ChangeReviewStatusRequest>,
) -> ApiResult<bool> {
    let changed = state
        .ctx
        .change_review_status(
            &actor,
            request.report_id,
            request.status,
            request.message.as_deref(),
        )
        .await?;
    Ok(Json(changed))
}

pub async fn get_comments(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<ReportCommentsRequest>,
) -> ApiResult<Vec<CommentData>> {
    Ok(Json(state.ctx.get_comments(&actor, request.report_id).await?))
}

pub async fn get_comment_count(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<ReportCommentsRequest>,
) -> ApiResult<u64> {
    Ok(Json(
        state
            .ctx
            .get_comment_count(&actor, request.report_id)
            .await?,
    ))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<AddCommentRequest>,
) -> ApiResult<bool> {
    let added = state
        .ctx
        .add_comment(&actor, request.report_id, &request.message)
        .await?;
    Ok(Json(added))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<UpdateCommentRequest>,
) -> ApiResult<bool> {
    let updated = state
        .ctx
        .update_comment(&actor, request.comment_id, &request.content)
        .await?;
    Ok(Json(updated))
}

pub async fn remove_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CommentIdRequest>,
) -> ApiResult<bool> {
    Ok(Json(
        state.ctx.remove_comment(&actor, request.comment_id).await?,
    ))
}
