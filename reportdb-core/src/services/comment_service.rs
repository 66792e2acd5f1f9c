use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use tracing::info;

use crate::auth::{Actor, ANONYMOUS_USER};
use crate::database::entities::{comments, reports};
use crate::errors::{CoreError, CoreErrorKind, CoreResult};

pub use crate::database::entities::common_types::CommentKind;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentData {
    pub id: i32,
    pub author: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub kind: CommentKind,
}

/// Prefix every whitespace character with a backslash so the value stays
/// one argument of a system comment.
pub fn escape_whitespace(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_whitespace() {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Split a system comment into its key and arguments, honouring
/// backslash escapes.
pub fn split_escaped(value: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                in_token = true;
            }
            c if c.is_whitespace() => {
                if in_token {
                    parts.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        parts.push(current);
    }
    parts
}

/// Render a stored system comment through the configured templates.
pub fn expand_system_comment(raw: &str, templates: &HashMap<String, String>) -> String {
    let parts = split_escaped(raw);
    let Some((key, args)) = parts.split_first() else {
        return raw.to_string();
    };
    let Some(template) = templates.get(key) else {
        return raw.to_string();
    };
    args.iter()
        .enumerate()
        .fold(template.clone(), |text, (i, arg)| {
            text.replace(&format!("{{{}}}", i), arg)
        })
}

#[derive(Clone)]
pub struct CommentService {
    db: DatabaseConnection,
}

impl CommentService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn add_system_comment<C: ConnectionTrait>(
        conn: &C,
        bug_hash: &str,
        author: &str,
        message: String,
    ) -> Result<(), DbErr> {
        comments::ActiveModel {
            id: NotSet,
            bug_hash: Set(bug_hash.to_string()),
            author: Set(author.to_string()),
            message: Set(message),
            kind: Set(CommentKind::System.into()),
            created_at: Set(Utc::now()),
        }
        .insert(conn)
        .await?;
        Ok(())
    }

    async fn report_bug_hash(&self, report_id: i32) -> CoreResult<String> {
        reports::Entity::find_by_id(report_id)
            .one(&self.db)
            .await?
            .map(|report| report.bug_id)
            .ok_or_else(|| CoreError::not_found("Report id", report_id.to_string()))
    }

    async fn find_comment(&self, comment_id: i32) -> CoreResult<comments::Model> {
        comments::Entity::find_by_id(comment_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("Comment id", comment_id.to_string()))
    }

    /// Comments of the report's identity, newest first.
    pub async fn get_comments(
        &self,
        report_id: i32,
        templates: &HashMap<String, String>,
    ) -> CoreResult<Vec<CommentData>> {
        let bug_hash = self.report_bug_hash(report_id).await?;
        let rows = comments::Entity::find()
            .filter(comments::Column::BugHash.eq(bug_hash))
            .order_by_desc(comments::Column::CreatedAt)
            .order_by_desc(comments::Column::Id)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let kind = row.get_kind();
                let message = match kind {
                    CommentKind::System => expand_system_comment(&row.message, templates),
                    CommentKind::User => row.message,
                };
                CommentData {
                    id: row.id,
                    author: row.author,
                    message,
                    created_at: row.created_at,
                    kind,
                }
            })
            .collect())
    }

    pub async fn get_comment_count(&self, report_id: i32) -> CoreResult<u64> {
        let bug_hash = self.report_bug_hash(report_id).await?;
        let count = comments::Entity::find()
            .filter(comments::Column::BugHash.eq(bug_hash))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    pub async fn add_comment(&self, actor: &Actor, report_id: i32, message: &str) -> CoreResult<bool> {
        ensure_not_empty(message)?;
        let bug_hash = self.report_bug_hash(report_id).await?;

        comments::ActiveModel {
            id: NotSet,
            bug_hash: Set(bug_hash),
            author: Set(actor.username().to_string()),
            message: Set(message.to_string()),
            kind: Set(CommentKind::User.into()),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;
        Ok(true)
    }

    pub async fn update_comment(
        &self,
        actor: &Actor,
        comment_id: i32,
        message: &str,
    ) -> CoreResult<bool> {
        ensure_not_empty(message)?;
        let comment = self.find_comment(comment_id).await?;
        ensure_can_modify(actor, &comment)?;

        if comment.message != message {
            let audit = format!(
                "comment_changed {} {}",
                escape_whitespace(&comment.message),
                escape_whitespace(message)
            );
            Self::add_system_comment(&self.db, &comment.bug_hash, actor.username(), audit).await?;
        }

        let mut active: comments::ActiveModel = comment.into();
        active.message = Set(message.to_string());
        active.update(&self.db).await?;
        info!("Comment {} was edited by {}", comment_id, actor.username());
        Ok(true)
    }

    pub async fn remove_comment(&self, actor: &Actor, comment_id: i32) -> CoreResult<bool> {
        let comment = self.find_comment(comment_id).await?;
        ensure_can_modify(actor, &comment)?;

        comments::Entity::delete_by_id(comment.id)
            .exec(&self.db)
            .await?;
        info!("Comment {} was removed by {}", comment_id, actor.username());
        Ok(true)
    }
}

fn ensure_not_empty(message: &str) -> CoreResult<()> {
    if message.trim().is_empty() {
        return Err(CoreError::validation("The comment message can not be empty!"));
    }
    Ok(())
}

// Comments written without authentication stay editable by every caller.
fn ensure_can_modify(actor: &Actor, comment: &comments::Model) -> CoreResult<()> {
    if comment.author != ANONYMOUS_USER && comment.author != actor.username() {
        return Err(CoreError::new(
            CoreErrorKind::Unauthorized,
            "Unathorized comment modification!",
        )
        .with_field("comment_id", comment.id.to_string()));
    }
    Ok(())
}
