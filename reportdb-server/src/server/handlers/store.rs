use axum::extract::{Extension, Json, State};
use reportdb::auth::Actor;
use reportdb::services::{MassStoreRequest, SourceFileData};
use serde::Deserialize;

use crate::server::app::AppState;
use crate::server::error::ApiResult;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingContentHashesRequest {
    pub file_hashes: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFileDataRequest {
    pub file_id: i32,
    #[serde(default)]
    pub file_content: bool,
}

pub async fn mass_store(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<MassStoreRequest>,
) -> ApiResult<i32> {
    Ok(Json(state.ctx.mass_store(&actor, &request).await?))
}

pub async fn get_missing_content_hashes(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<MissingContentHashesRequest>,
) -> ApiResult<Vec<String>> {
    let missing = state
        .ctx
        .get_missing_content_hashes(&actor, &request.file_hashes)
        .await?;
    Ok(Json(missing))
}

pub async fn get_source_file_data(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<SourceFileDataRequest>,
) -> ApiResult<SourceFileData> {
    let data = state
        .ctx
        .get_source_file_data(&actor, request.file_id, request.file_content)
        .await?;
    Ok(Json(data))
}
