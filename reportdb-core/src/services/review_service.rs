use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Set, TransactionTrait};
use serde::Serialize;
use tracing::{debug, info};

use crate::database::entities::common_types::ReviewStatus;
use crate::database::entities::{reports, review_statuses};
use crate::errors::{CoreError, CoreErrorKind, CoreResult};
use crate::services::comment_service::{escape_whitespace, CommentService};

/// Review decision as returned with a report.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewData {
    pub status: ReviewStatus,
    pub author: Option<String>,
    pub comment: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl Default for ReviewData {
    fn default() -> Self {
        Self {
            status: ReviewStatus::Unreviewed,
            author: None,
            comment: None,
            date: None,
        }
    }
}

impl From<review_statuses::Model> for ReviewData {
    fn from(model: review_statuses::Model) -> Self {
        Self {
            status: model.get_status(),
            author: Some(model.author),
            comment: Some(model.message).filter(|m| !m.is_empty()),
            date: Some(model.date),
        }
    }
}

#[derive(Clone)]
pub struct ReviewService {
    db: DatabaseConnection,
}

impl ReviewService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Upsert the review status of an identity. When the status or the
    /// message changes, an audit comment is written first. Returns whether
    /// anything changed.
    pub async fn set_review_status<C: ConnectionTrait>(
        conn: &C,
        bug_hash: &str,
        status: ReviewStatus,
        message: Option<&str>,
        author: &str,
    ) -> Result<bool, DbErr> {
        let existing = review_statuses::Entity::find_by_id(bug_hash.to_string())
            .one(conn)
            .await?;

        let old_status = existing
            .as_ref()
            .map(|row| row.get_status())
            .unwrap_or_default();
        let old_message = existing
            .as_ref()
            .map(|row| row.message.as_str())
            .filter(|m| !m.is_empty());
        let new_message = message.filter(|m| !m.is_empty());

        let changed = old_status != status || old_message != new_message;
        if changed {
            let audit = match new_message {
                Some(text) => format!(
                    "rev_st_changed_msg {} {} {}",
                    escape_whitespace(old_status.label()),
                    escape_whitespace(status.label()),
                    escape_whitespace(text)
                ),
                None => format!(
                    "rev_st_changed {} {}",
                    escape_whitespace(old_status.label()),
                    escape_whitespace(status.label())
                ),
            };
            CommentService::add_system_comment(conn, bug_hash, author, audit).await?;
        }

        review_statuses::Entity::insert(review_statuses::ActiveModel {
            bug_hash: Set(bug_hash.to_string()),
            status: Set(status.into()),
            author: Set(author.to_string()),
            message: Set(new_message.unwrap_or_default().to_string()),
            date: Set(Utc::now()),
        })
        .on_conflict(
            OnConflict::column(review_statuses::Column::BugHash)
                .update_columns([
                    review_statuses::Column::Status,
                    review_statuses::Column::Author,
                    review_statuses::Column::Message,
                    review_statuses::Column::Date,
                ])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

        debug!("Review status of {} set to {}", bug_hash, status.as_str());
        Ok(changed)
    }

    pub async fn get_review_status(&self, bug_hash: &str) -> CoreResult<ReviewData> {
        let row = review_statuses::Entity::find_by_id(bug_hash.to_string())
            .one(&self.db)
            .await?;
        Ok(row.map(ReviewData::from).unwrap_or_default())
    }

    /// Set the review status of the identity behind a report.
    pub async fn change_review_status(
        &self,
        report_id: i32,
        status: ReviewStatus,
        message: Option<&str>,
        author: &str,
    ) -> CoreResult<bool> {
        let txn = self.db.begin().await?;
        let report = reports::Entity::find_by_id(report_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                CoreError::new(CoreErrorKind::NotFound, "No report found in the database.")
                    .with_field("id", report_id.to_string())
            })?;

        Self::set_review_status(&txn, &report.bug_id, status, message, author).await?;
        txn.commit().await?;

        info!(
            "Review status of bug '{}' was changed to '{}' by {}",
            report.bug_id,
            status.as_str(),
            author
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::entities::comments;
    use crate::database::test_utils::setup_test_db;

    #[tokio::test]
    async fn changes_write_one_audit_comment_each() {
        let db = setup_test_db().await;

        let changed =
            ReviewService::set_review_status(&db, "h1", ReviewStatus::Confirmed, Some("verified"), "alice")
                .await
                .unwrap();
        assert!(changed);

        let unchanged =
            ReviewService::set_review_status(&db, "h1", ReviewStatus::Confirmed, Some("verified"), "bob")
                .await
                .unwrap();
        assert!(!unchanged);

        ReviewService::set_review_status(&db, "h1", ReviewStatus::FalsePositive, None, "bob")
            .await
            .unwrap();

        let audit: Vec<String> = comments::Entity::find()
            .all(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.message)
            .collect();
        assert_eq!(
            audit,
            vec![
                "rev_st_changed_msg Unreviewed Confirmed verified".to_string(),
                "rev_st_changed Confirmed False\\ positive".to_string(),
            ]
        );

        let review = ReviewService::new(db).get_review_status("h1").await.unwrap();
        assert_eq!(review.status, ReviewStatus::FalsePositive);
        assert_eq!(review.author.as_deref(), Some("bob"));
        assert_eq!(review.comment, None);
    }

    #[tokio::test]
    async fn unknown_report_is_rejected() {
        let db = setup_test_db().await;
        let err = ReviewService::new(db)
            .change_review_status(99, ReviewStatus::Confirmed, None, "alice")
            .await
            .unwrap_err();
        assert_eq!(err.message(), "No report found in the database.");
        assert_eq!(err.code(), crate::errors::ErrorCode::Database);
    }
}
