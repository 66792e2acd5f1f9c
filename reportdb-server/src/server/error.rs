use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reportdb::errors::{CoreError, CoreErrorKind};
use serde_json::json;
use tracing::error;

/// A `CoreError` on its way back to the RPC caller.
#[derive(Debug)]
pub struct ApiError(pub CoreError);

pub type ApiResult<T> = Result<Json<T>, ApiError>;

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

pub fn status_for(kind: CoreErrorKind) -> StatusCode {
    match kind {
        CoreErrorKind::NotFound => StatusCode::NOT_FOUND,
        CoreErrorKind::Validation => StatusCode::BAD_REQUEST,
        CoreErrorKind::LimitExceeded => StatusCode::TOO_MANY_REQUESTS,
        CoreErrorKind::Conflict => StatusCode::CONFLICT,
        CoreErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        CoreErrorKind::Forbidden => StatusCode::FORBIDDEN,
        CoreErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        CoreErrorKind::SourceFile => StatusCode::UNPROCESSABLE_ENTITY,
        CoreErrorKind::Database | CoreErrorKind::Io | CoreErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = status_for(err.kind());
        if status.is_server_error() {
            error!("Request failed: {}", err);
        }

        let body = json!({
            "errorCode": err.code(),
            "message": err.message(),
            "extraInfo": err.extra_info(),
            "fields": err.fields(),
        });
        (status, Json(body)).into_response()
    }
}
