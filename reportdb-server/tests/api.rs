use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use reportdb::auth::Permission;
use reportdb::config::{PermissionConfig, StoreConfig};
use reportdb::database::connection::connect_and_migrate;
use reportdb::AppContext;
use reportdb_server::auth::USER_HEADER;
use reportdb_server::server::app::create_app;
use reportdb_test_utils::{finding, ArchiveBuilder};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn app() -> Router {
    let db = connect_and_migrate("sqlite::memory:").await.unwrap();
    let config = StoreConfig {
        store_retry_base_delay_ms: 1,
        permissions: PermissionConfig {
            anonymous: vec![Permission::Access],
            users: [("ci".to_string(), vec![Permission::Store])].into(),
        },
        ..StoreConfig::default()
    };
    create_app(AppContext::new(db, config), None).unwrap()
}

async fn call(app: &Router, method: &str, user: Option<&str>, body: Value) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method("POST")
        .uri(format!("/api/v1/{}", method))
        .header("content-type", "application/json");
    if let Some(user) = user {
        request = request.header(USER_HEADER, user);
    }
    let response = app
        .clone()
        .oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn archive() -> String {
    ArchiveBuilder::new()
        .source("/src/main.c", "int main() {\n  int *p = 0;\n  return *p;\n}\n")
        .report_file(
            "main.c.json",
            &["/src/main.c"],
            vec![finding("core.NullDereference", 0, 3, "Dereference of null pointer")],
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn health_reports_the_service() {
    let app = app().await;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["service"], "reportdb-server");
}

#[tokio::test]
async fn store_then_query_over_http() {
    let app = app().await;

    let (status, body) = call(
        &app,
        "massStore",
        None,
        json!({ "runName": "proj", "archive": archive() }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errorCode"], "UNAUTHORIZED");

    let (status, run_id) = call(
        &app,
        "massStore",
        Some("ci"),
        json!({ "runName": "proj", "archive": archive(), "tag": "v1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, results) = call(
        &app,
        "getRunResults",
        None,
        json!({ "runIds": [run_id], "getDetails": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results.as_array().unwrap().len(), 1);
    assert_eq!(results[0]["checkerId"], "core.NullDereference");
    assert_eq!(results[0]["detectionStatus"], "NEW");

    let (_, counts) = call(
        &app,
        "getDetectionStatusCounts",
        None,
        json!({ "runIds": [run_id] }),
    )
    .await;
    assert_eq!(counts["NEW"], 1);

    let (status, body) = call(
        &app,
        "getReport",
        None,
        json!({ "reportId": 9999 }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorCode"], "DATABASE");
}
