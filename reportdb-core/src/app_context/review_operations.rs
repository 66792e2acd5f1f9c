use super::AppContext;
use crate::auth::{Actor, Permission};
use crate::database::entities::common_types::ReviewStatus;
use crate::errors::{CoreError, CoreResult};
use crate::services::CommentData;

impl AppContext {
    pub async fn change_review_status(
        &self,
        actor: &Actor,
        report_id: i32,
        status: ReviewStatus,
        message: Option<&str>,
    ) -> CoreResult<bool> {
        self.authorize(actor, Permission::Access)?;
        if self.config.review_status_change_disabled {
            return Err(CoreError::validation("Review status change is disabled!"));
        }
        self.review_service
            .change_review_status(report_id, status, message, actor.username())
            .await
    }

    pub async fn get_comments(&self, actor: &Actor, report_id: i32) -> CoreResult<Vec<CommentData>> {
        self.authorize(actor, Permission::Access)?;
        self.comment_service
            .get_comments(report_id, &self.config.system_comments)
            .await
    }

    pub async fn get_comment_count(&self, actor: &Actor, report_id: i32) -> CoreResult<u64> {
        self.authorize(actor, Permission::Access)?;
        self.comment_service.get_comment_count(report_id).await
    }

    pub async fn add_comment(
        &self,
        actor: &Actor,
        report_id: i32,
        message: &str,
    ) -> CoreResult<bool> {
        self.authorize(actor, Permission::Access)?;
        self.comment_service.add_comment(actor, report_id, message).await
    }

    pub async fn update_comment(
        &self,
        actor: &Actor,
        comment_id: i32,
        message: &str,
    ) -> CoreResult<bool> {
        self.authorize(actor, Permission::Access)?;
        self.comment_service
            .update_comment(actor, comment_id, message)
            .await
    }

    pub async fn remove_comment(&self, actor: &Actor, comment_id: i32) -> CoreResult<bool> {
        self.authorize(actor, Permission::Access)?;
        self.comment_service.remove_comment(actor, comment_id).await
    }
}
