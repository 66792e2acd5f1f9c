use anyhow::{anyhow, Result};
use axum::{middleware, routing::get, routing::post, Router};
use reportdb::AppContext;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use super::handlers::{components, health, reports, review, runs, store};
use super::middleware::{log_timing, resolve_actor};

#[derive(Clone)]
pub struct AppState {
    pub ctx: AppContext,
}

pub const RPC_METHODS: &[&str] = &[
    "massStore",
    "getMissingContentHashes",
    "getSourceFileData",
    "getRunData",
    "getRunCount",
    "getRunHistory",
    "getRunHistoryCount",
    "getCheckCommand",
    "getAnalysisStatistics",
    "removeRun",
    "removeRunResults",
    "removeRunReports",
    "updateRunData",
    "getRunResults",
    "getRunResultCount",
    "getRunReportCounts",
    "getReport",
    "getReportDetails",
    "getDiffResultsHash",
    "getCheckerCounts",
    "getAnalyzerNameCounts",
    "getSeverityCounts",
    "getCheckerMsgCounts",
    "getReviewStatusCounts",
    "getFileCounts",
    "getRunHistoryTagCounts",
    "getDetectionStatusCounts",
    "changeReviewStatus",
    "getComments",
    "getCommentCount",
    "addComment",
    "updateComment",
    "removeComment",
    "addSourceComponent",
    "getSourceComponents",
    "removeSourceComponent",
];

fn rpc_routes() -> Router<AppState> {
    Router::new()
        .route("/massStore", post(store::mass_store))
        .route("/getMissingContentHashes", post(store::get_missing_content_hashes))
        .route("/getSourceFileData", post(store::get_source_file_data))
        .route("/getRunData", post(runs::get_run_data))
        .route("/getRunCount", post(runs::get_run_count))
        .route("/getRunHistory", post(runs::get_run_history))
        .route("/getRunHistoryCount", post(runs::get_run_history_count))
        .route("/getCheckCommand", post(runs::get_check_command))
        .route("/getAnalysisStatistics", post(runs::get_analysis_statistics))
        .route("/removeRun", post(runs::remove_run))
        .route("/removeRunResults", post(runs::remove_run_results))
        .route("/removeRunReports", post(runs::remove_run_reports))
        .route("/updateRunData", post(runs::update_run_data))
        .route("/getRunResults", post(reports::get_run_results))
        .route("/getRunResultCount", post(reports::get_run_result_count))
        .route("/getRunReportCounts", post(reports::get_run_report_counts))
        .route("/getReport", post(reports::get_report))
        .route("/getReportDetails", post(reports::get_report_details))
        .route("/getDiffResultsHash", post(reports::get_diff_results_hash))
        .route("/getCheckerCounts", post(reports::get_checker_counts))
        .route("/getAnalyzerNameCounts", post(reports::get_analyzer_name_counts))
        .route("/getSeverityCounts", post(reports::get_severity_counts))
        .route("/getCheckerMsgCounts", post(reports::get_checker_msg_counts))
        .route("/getReviewStatusCounts", post(reports::get_review_status_counts))
        .route("/getFileCounts", post(reports::get_file_counts))
        .route("/getRunHistoryTagCounts", post(reports::get_run_history_tag_counts))
        .route("/getDetectionStatusCounts", post(reports::get_detection_status_counts))
        .route("/changeReviewStatus", post(review::change_review_status))
        .route("/getComments", post(review::get_comments))
        .route("/getCommentCount", post(review::get_comment_count))
        .route("/addComment", post(review::add_comment))
        .route("/updateComment", post(review::update_comment))
        .route("/removeComment", post(review::remove_comment))
        .route("/addSourceComponent", post(components::add_source_component))
        .route("/getSourceComponents", post(components::get_source_components))
        .route("/removeSourceComponent", post(components::remove_source_component))
}

pub fn create_app(ctx: AppContext, cors_origin: Option<&str>) -> Result<Router> {
    let state = AppState { ctx };

    let cors = match cors_origin {
        Some(origin) => CorsLayer::new().allow_origin(
            origin
                .parse::<axum::http::HeaderValue>()
                .map_err(|e| anyhow!("Invalid CORS origin: {}", e))?,
        ),
        None => CorsLayer::new().allow_origin(Any),
    }
    .allow_methods([
        axum::http::Method::GET,
        axum::http::Method::POST,
        axum::http::Method::OPTIONS,
    ])
    .allow_headers(Any)
    .allow_credentials(false);

    let api = rpc_routes().layer(middleware::from_fn_with_state(state.clone(), resolve_actor));

    let app = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(cors)
                .layer(middleware::from_fn(log_timing)),
        )
        .with_state(state);

    Ok(app)
}
