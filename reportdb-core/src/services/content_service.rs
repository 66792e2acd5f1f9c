use std::collections::HashSet;

use sea_orm::sea_query::{OnConflict, Query};
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QuerySelect, Set,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::common::db_errors::DbErrorKind;
use crate::common::{chunked, unzlib, zlib};
use crate::database::entities::{bug_path_events, file_contents, files, reports};
use crate::errors::{CoreError, CoreResult};
use crate::identity::basename;

const HASH_QUERY_CHUNK: usize = 500;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFileData {
    pub file_id: i32,
    pub file_path: String,
    pub file_content: Option<String>,
}

/// Content-addressed storage of source files.
#[derive(Clone)]
pub struct ContentService {
    db: DatabaseConnection,
}

impl ContentService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The candidate hashes that have no stored content, in input order.
    pub async fn get_missing_content_hashes(&self, hashes: &[String]) -> CoreResult<Vec<String>> {
        if hashes.is_empty() {
            return Ok(Vec::new());
        }

        let mut present = HashSet::new();
        for chunk in chunked(hashes, HASH_QUERY_CHUNK) {
            let found: Vec<String> = file_contents::Entity::find()
                .select_only()
                .column(file_contents::Column::ContentHash)
                .filter(file_contents::Column::ContentHash.is_in(chunk.iter().cloned()))
                .into_tuple()
                .all(&self.db)
                .await
                .map_err(|e| CoreError::database(format!("Failed to look up content hashes: {}", e)))?;
            present.extend(found);
        }

        let mut seen = HashSet::new();
        Ok(hashes
            .iter()
            .filter(|hash| !present.contains(*hash) && seen.insert(hash.as_str()))
            .cloned()
            .collect())
    }

    pub async fn has_content<C: ConnectionTrait>(conn: &C, content_hash: &str) -> CoreResult<bool> {
        let count = file_contents::Entity::find_by_id(content_hash.to_string())
            .select_only()
            .column(file_contents::Column::ContentHash)
            .into_tuple::<String>()
            .one(conn)
            .await?;
        Ok(count.is_some())
    }

    /// Record `filepath` as pointing at `content_hash`, inserting the content
    /// first when it is not stored yet. Returns the file id, or `None` when
    /// the content is neither stored nor supplied.
    pub async fn store_file_content<C: ConnectionTrait>(
        conn: &C,
        filepath: &str,
        content_hash: &str,
        content: Option<&[u8]>,
    ) -> CoreResult<Option<i32>> {
        if !Self::has_content(conn, content_hash).await? {
            let Some(bytes) = content else {
                warn!(
                    "Content of {} ({}) is neither stored nor part of the archive",
                    filepath, content_hash
                );
                return Ok(None);
            };
            let compressed = zlib(bytes).map_err(|e| {
                CoreError::io(format!("Failed to compress {}: {}", filepath, e)).with_source(e)
            })?;
            // A concurrent store may insert the same hash first
            file_contents::Entity::insert(file_contents::ActiveModel {
                content_hash: Set(content_hash.to_string()),
                content: Set(compressed),
            })
            .on_conflict(
                OnConflict::column(file_contents::Column::ContentHash)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;
        }

        if let Some(id) = Self::find_file_id(conn, filepath, content_hash).await? {
            return Ok(Some(id));
        }

        let inserted = files::Entity::insert(files::ActiveModel {
            id: NotSet,
            filepath: Set(filepath.to_string()),
            filename: Set(basename(filepath).to_string()),
            content_hash: Set(content_hash.to_string()),
        })
        .exec(conn)
        .await;

        match inserted {
            Ok(result) => {
                debug!("Stored file {} as {}", filepath, result.last_insert_id);
                Ok(Some(result.last_insert_id))
            }
            Err(err) if DbErrorKind::from_db_err(&err) == DbErrorKind::UniqueViolation => {
                Self::find_file_id(conn, filepath, content_hash).await
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_file_id<C: ConnectionTrait>(
        conn: &C,
        filepath: &str,
        content_hash: &str,
    ) -> CoreResult<Option<i32>> {
        let id = files::Entity::find()
            .select_only()
            .column(files::Column::Id)
            .filter(files::Column::Filepath.eq(filepath))
            .filter(files::Column::ContentHash.eq(content_hash))
            .into_tuple::<i32>()
            .one(conn)
            .await?;
        Ok(id)
    }

    /// Delete files no report or bug path step refers to, then contents no
    /// file refers to.
    pub async fn remove_unused_files<C: ConnectionTrait>(conn: &C) -> CoreResult<u64> {
        let removed_files = files::Entity::delete_many()
            .filter(
                files::Column::Id.not_in_subquery(
                    Query::select()
                        .column(reports::Column::FileId)
                        .from(reports::Entity)
                        .to_owned(),
                ),
            )
            .filter(
                files::Column::Id.not_in_subquery(
                    Query::select()
                        .column(bug_path_events::Column::FileId)
                        .from(bug_path_events::Entity)
                        .to_owned(),
                ),
            )
            .exec(conn)
            .await?;

        let removed_contents = file_contents::Entity::delete_many()
            .filter(
                file_contents::Column::ContentHash.not_in_subquery(
                    Query::select()
                        .column(files::Column::ContentHash)
                        .from(files::Entity)
                        .to_owned(),
                ),
            )
            .exec(conn)
            .await?;

        debug!(
            "Removed {} unused files and {} unused contents",
            removed_files.rows_affected, removed_contents.rows_affected
        );
        Ok(removed_files.rows_affected)
    }

    pub async fn get_source_file_data(
        &self,
        file_id: i32,
        with_content: bool,
    ) -> CoreResult<SourceFileData> {
        let file = files::Entity::find_by_id(file_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("File", file_id.to_string()))?;

        let file_content = if with_content {
            let content = file_contents::Entity::find_by_id(file.content_hash.clone())
                .one(&self.db)
                .await?
                .ok_or_else(|| CoreError::not_found("File content", file.content_hash.clone()))?;
            let bytes = unzlib(&content.content).map_err(|e| {
                CoreError::io(format!("Failed to decompress {}: {}", file.filepath, e))
                    .with_source(e)
            })?;
            Some(String::from_utf8_lossy(&bytes).into_owned())
        } else {
            None
        };

        Ok(SourceFileData {
            file_id: file.id,
            file_path: file.filepath,
            file_content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::setup_test_db;

    #[tokio::test]
    async fn missing_hashes_are_reported_in_order() {
        let db = setup_test_db().await;
        ContentService::store_file_content(&db, "/src/a.c", "h1", Some(b"int a;"))
            .await
            .unwrap();

        let service = ContentService::new(db);
        let missing = service
            .get_missing_content_hashes(&["h1".to_string(), "h3".to_string(), "h2".to_string()])
            .await
            .unwrap();
        assert_eq!(missing, vec!["h3".to_string(), "h2".to_string()]);
    }

    #[tokio::test]
    async fn same_path_and_hash_reuse_the_file_row() {
        let db = setup_test_db().await;
        let first = ContentService::store_file_content(&db, "/src/a.c", "h1", Some(b"int a;"))
            .await
            .unwrap();
        let second = ContentService::store_file_content(&db, "/src/a.c", "h1", None)
            .await
            .unwrap();
        assert_eq!(first, second);

        let other_path = ContentService::store_file_content(&db, "/src/b.c", "h1", None)
            .await
            .unwrap();
        assert_ne!(first, other_path);
        assert_eq!(file_contents::Entity::find().all(&db).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_content_without_bytes_is_skipped() {
        let db = setup_test_db().await;
        let id = ContentService::store_file_content(&db, "/src/a.c", "nope", None)
            .await
            .unwrap();
        assert!(id.is_none());
    }

    #[tokio::test]
    async fn unused_files_are_removed_with_their_content() {
        let db = setup_test_db().await;
        let id = ContentService::store_file_content(&db, "/src/a.c", "h1", Some(b"int a;"))
            .await
            .unwrap()
            .unwrap();

        let service = ContentService::new(db.clone());
        let data = service.get_source_file_data(id, true).await.unwrap();
        assert_eq!(data.file_content.as_deref(), Some("int a;"));

        assert_eq!(ContentService::remove_unused_files(&db).await.unwrap(), 1);
        assert!(service.get_missing_content_hashes(&["h1".to_string()]).await.unwrap().len() == 1);
    }
}
