pub mod app;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::path::Path;

use anyhow::Result;
use reportdb::config::StoreConfig;
use reportdb::database::connection::{connect_and_migrate, get_database_url};
use reportdb::AppContext;
use tracing::info;

use crate::auth::default_authorizer;

pub async fn start_server(
    port: u16,
    database_path: &str,
    config_path: Option<&Path>,
    cors_origin: Option<&str>,
) -> Result<()> {
    let config = StoreConfig::load(config_path)?;
    let database_url = get_database_url(Some(database_path));
    let db = connect_and_migrate(&database_url).await?;
    info!("Database migrations completed");

    let ctx = AppContext::with_authorizer(db, config, default_authorizer());
    let app = app::create_app(ctx, cors_origin)?;

    log_routes();

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Server running on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn log_routes() {
    info!("API Endpoints:");
    info!("  /health                     - Health check");
    for method in app::RPC_METHODS {
        info!("  /api/v1/{:<20}  - POST", method);
    }
}
