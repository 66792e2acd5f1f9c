use std::time::Instant;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use super::app::AppState;
use crate::auth::actor_from_headers;

/// Resolve the calling actor and hand it to the handlers as an extension.
pub async fn resolve_actor(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let actor = actor_from_headers(&state.ctx.config().permissions, request.headers());
    request.extensions_mut().insert(actor);
    next.run(request).await
}

pub async fn log_timing(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    debug!(
        "{} answered {} in {} ms",
        path,
        response.status(),
        started.elapsed().as_millis()
    );
    response
}
