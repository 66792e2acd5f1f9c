use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::auth::{Actor, Authorizer, GrantAuthorizer, Permission};
use crate::config::StoreConfig;
use crate::errors::CoreResult;
use crate::query::ReportQueryService;
use crate::services::{
    CommentService, ContentService, MassStoreService, ReviewService, RunLockService, RunService,
    SourceComponentService,
};

mod component_operations;
mod report_operations;
mod review_operations;
mod run_operations;
mod store_operations;

/// Shared application context exposing the report store services to the
/// RPC layer. Every public operation checks the caller's permission before
/// doing any work.
#[derive(Clone)]
pub struct AppContext {
    db: DatabaseConnection,
    config: Arc<StoreConfig>,
    authorizer: Arc<dyn Authorizer>,
    content_service: Arc<ContentService>,
    run_lock_service: Arc<RunLockService>,
    mass_store_service: Arc<MassStoreService>,
    run_service: Arc<RunService>,
    review_service: Arc<ReviewService>,
    comment_service: Arc<CommentService>,
    source_component_service: Arc<SourceComponentService>,
    report_query_service: Arc<ReportQueryService>,
}

impl AppContext {
    pub fn new(db: DatabaseConnection, config: StoreConfig) -> Self {
        Self::with_authorizer(db, config, Arc::new(GrantAuthorizer))
    }

    pub fn with_authorizer(
        db: DatabaseConnection,
        config: StoreConfig,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        let config = Arc::new(config);
        let run_lock_service = Arc::new(RunLockService::new(db.clone(), config.run_lock_timeout()));
        Self::with_lock_service(db, config, authorizer, run_lock_service)
    }

    /// Build with a prepared lock service, e.g. one with a custom adapter.
    pub fn with_lock_service(
        db: DatabaseConnection,
        config: Arc<StoreConfig>,
        authorizer: Arc<dyn Authorizer>,
        run_lock_service: Arc<RunLockService>,
    ) -> Self {
        let content_service = Arc::new(ContentService::new(db.clone()));
        let mass_store_service = Arc::new(MassStoreService::new(
            db.clone(),
            run_lock_service.clone(),
            config.clone(),
        ));
        let run_service = Arc::new(RunService::new(db.clone(), run_lock_service.clone()));
        let review_service = Arc::new(ReviewService::new(db.clone()));
        let comment_service = Arc::new(CommentService::new(db.clone()));
        let source_component_service = Arc::new(SourceComponentService::new(db.clone()));
        let report_query_service = Arc::new(ReportQueryService::new(db.clone()));

        Self {
            db,
            config,
            authorizer,
            content_service,
            run_lock_service,
            mass_store_service,
            run_service,
            review_service,
            comment_service,
            source_component_service,
            report_query_service,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn config(&self) -> &Arc<StoreConfig> {
        &self.config
    }

    pub fn run_lock_service(&self) -> &Arc<RunLockService> {
        &self.run_lock_service
    }

    pub fn report_query_service(&self) -> &Arc<ReportQueryService> {
        &self.report_query_service
    }

    pub fn authorize(&self, actor: &Actor, permission: Permission) -> CoreResult<()> {
        self.authorizer.authorize(actor, permission)
    }

    fn page_size(&self, limit: Option<u64>) -> u64 {
        self.config.clamp_limit(limit)
    }
}
