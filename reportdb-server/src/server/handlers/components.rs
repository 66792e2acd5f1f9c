use axum::extract::{Extension, Json, State};
use reportdb::auth::Actor;
use reportdb::services::SourceComponentData;
use serde::Deserialize;

use crate::server::app::AppState;
use crate::server::error::ApiResult;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSourceComponentRequest {
    pub name: String,
    pub value: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceComponentFilterRequest {
    #[serde(default)]
    pub component_filter: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceComponentNameRequest {
    pub name: String,
}

pub async fn add_source_component(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<AddSourceComponentRequest>,
) -> ApiResult<bool> {
    let added = state
        .ctx
        .add_source_component(
            &actor,
            &request.name,
            &request.value,
            request.description.as_deref(),
        )
        .await?;
    Ok(Json(added))
}

pub async fn get_source_components(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<SourceComponentFilterRequest>,
) -> ApiResult<Vec<SourceComponentData>> {
    let components = state
        .ctx
        .get_source_components(&actor, &request.component_filter)
        .await?;
    Ok(Json(components))
}

pub async fn remove_source_component(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<SourceComponentNameRequest>,
) -> ApiResult<bool> {
    Ok(Json(
        state
            .ctx
            .remove_source_component(&actor, &request.name)
            .await?,
    ))
}
