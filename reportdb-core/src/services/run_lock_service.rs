//! Run lock management
//!
//! Only one store may write into a run name at a time. The lock is an
//! ordinary `run_locks` row carrying a `version` column, so a writer never
//! holds a database transaction open for the whole store. A lock older than
//! the configured timeout counts as abandoned and can be taken over; the
//! takeover bumps the version so the old holder's release and verification
//! no longer match.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection, EntityTrait, QueryFilter,
    Set, Statement, TransactionTrait,
};
use tracing::{debug, info, warn};

use crate::common::db_errors::DbErrorKind;
use crate::database::entities::run_locks;
use crate::errors::{CoreError, CoreResult, StoreError};

/// Proof of a held lock. Hand it back to release or verify the lock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunLockGuard {
    pub name: String,
    pub version: i32,
}

#[async_trait]
pub trait RunLockAdapter: Send + Sync {
    async fn acquire(
        &self,
        db: &DatabaseConnection,
        name: &str,
        holder: &str,
        timeout: chrono::Duration,
    ) -> CoreResult<RunLockGuard>;
}

fn held_by_other_user(name: &str) -> CoreError {
    CoreError::conflict(format!(
        "The run named '{}' is being stored into by another user.",
        name
    ))
    .with_field("run", name)
}

fn still_locked(lock: &run_locks::Model, timeout: chrono::Duration) -> CoreError {
    let expires_at = lock.expires_at(timeout);
    let message = format!(
        "The run named '{}' is being stored into by {}. If the other store operation has failed, this lock will expire at '{}'.",
        lock.name,
        lock.username,
        expires_at.format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", message);
    CoreError::conflict(message)
        .with_field("run", lock.name.clone())
        .with_field("holder", lock.username.clone())
        .with_field("expires_at", expires_at.to_rfc3339())
}

/// Insert a fresh lock or take over an expired one.
async fn claim<C: ConnectionTrait>(
    conn: &C,
    existing: Option<run_locks::Model>,
    name: &str,
    holder: &str,
    timeout: chrono::Duration,
    now: DateTime<Utc>,
) -> CoreResult<RunLockGuard> {
    match existing {
        None => {
            let inserted = run_locks::Entity::insert(run_locks::ActiveModel {
                name: Set(name.to_string()),
                username: Set(holder.to_string()),
                locked_at: Set(now),
                version: Set(1),
            })
            .exec_without_returning(conn)
            .await;

            match inserted {
                Ok(_) => Ok(RunLockGuard {
                    name: name.to_string(),
                    version: 1,
                }),
                Err(err) if DbErrorKind::from_db_err(&err).is_write_conflict() => {
                    Err(held_by_other_user(name))
                }
                Err(err) => Err(err.into()),
            }
        }
        Some(lock) if lock.is_expired(timeout, now) => {
            warn!(
                "Taking over expired lock of run '{}' held by {} since {}",
                name, lock.username, lock.locked_at
            );
            let next = lock.version + 1;
            let updated = run_locks::Entity::update_many()
                .col_expr(run_locks::Column::Username, Expr::value(holder))
                .col_expr(run_locks::Column::LockedAt, Expr::value(now))
                .col_expr(run_locks::Column::Version, Expr::value(next))
                .filter(run_locks::Column::Name.eq(name))
                .filter(run_locks::Column::Version.eq(lock.version))
                .exec(conn)
                .await?;

            if updated.rows_affected == 0 {
                return Err(held_by_other_user(name));
            }
            Ok(RunLockGuard {
                name: name.to_string(),
                version: next,
            })
        }
        Some(lock) => Err(still_locked(&lock, timeout)),
    }
}

/// Version-checked rows. Works on every backend.
pub struct OptimisticRunLockAdapter;

#[async_trait]
impl RunLockAdapter for OptimisticRunLockAdapter {
    async fn acquire(
        &self,
        db: &DatabaseConnection,
        name: &str,
        holder: &str,
        timeout: chrono::Duration,
    ) -> CoreResult<RunLockGuard> {
        let existing = run_locks::Entity::find_by_id(name.to_string())
            .one(db)
            .await?;
        claim(db, existing, name, holder, timeout, Utc::now()).await
    }
}

/// Reads the lock row with `FOR UPDATE NOWAIT` so a competing acquirer
/// fails fast instead of queueing behind the row lock.
pub struct PostgresRunLockAdapter;

#[async_trait]
impl RunLockAdapter for PostgresRunLockAdapter {
    async fn acquire(
        &self,
        db: &DatabaseConnection,
        name: &str,
        holder: &str,
        timeout: chrono::Duration,
    ) -> CoreResult<RunLockGuard> {
        let txn = db.begin().await?;

        let existing = run_locks::Entity::find()
            .from_raw_sql(Statement::from_sql_and_values(
                DatabaseBackend::Postgres,
                r#"SELECT "name", "username", "locked_at", "version" FROM "run_locks" WHERE "name" = $1 FOR UPDATE NOWAIT"#,
                [name.into()],
            ))
            .one(&txn)
            .await
            .map_err(|e| {
                CoreError::conflict(
                    "Someone is already storing to the same run. Please wait while the other storage is finished and try it again.",
                )
                .with_field("run", name)
                .with_source(e)
            })?;

        let guard = claim(&txn, existing, name, holder, timeout, Utc::now()).await?;
        txn.commit()
            .await
            .map_err(|e| held_by_other_user(name).with_source(e))?;
        Ok(guard)
    }
}

#[derive(Clone)]
pub struct RunLockService {
    db: DatabaseConnection,
    adapter: Arc<dyn RunLockAdapter>,
    timeout: chrono::Duration,
}

impl RunLockService {
    pub fn new(db: DatabaseConnection, timeout: chrono::Duration) -> Self {
        let adapter: Arc<dyn RunLockAdapter> = match db.get_database_backend() {
            DatabaseBackend::Postgres => Arc::new(PostgresRunLockAdapter),
            _ => Arc::new(OptimisticRunLockAdapter),
        };
        Self::with_adapter(db, adapter, timeout)
    }

    pub fn with_adapter(
        db: DatabaseConnection,
        adapter: Arc<dyn RunLockAdapter>,
        timeout: chrono::Duration,
    ) -> Self {
        Self {
            db,
            adapter,
            timeout,
        }
    }

    pub fn timeout(&self) -> chrono::Duration {
        self.timeout
    }

    pub async fn acquire(&self, name: &str, holder: &str) -> CoreResult<RunLockGuard> {
        let guard = self
            .adapter
            .acquire(&self.db, name, holder, self.timeout)
            .await?;
        debug!("Run lock '{}' acquired by {} (version {})", name, holder, guard.version);
        Ok(guard)
    }

    /// Refresh the lock timestamp from inside a store transaction. Fails
    /// when the lock was taken over in the meantime.
    pub async fn verify<C: ConnectionTrait>(
        conn: &C,
        guard: &RunLockGuard,
    ) -> Result<(), StoreError> {
        let touched = run_locks::Entity::update_many()
            .col_expr(run_locks::Column::LockedAt, Expr::value(Utc::now()))
            .filter(run_locks::Column::Name.eq(guard.name.as_str()))
            .filter(run_locks::Column::Version.eq(guard.version))
            .exec(conn)
            .await?;

        if touched.rows_affected == 0 {
            return Err(CoreError::conflict(format!(
                "The lock of run '{}' expired and was taken over while storing. Please try it again.",
                guard.name
            ))
            .with_field("run", guard.name.clone())
            .into());
        }
        Ok(())
    }

    /// Delete the lock row if it is still ours.
    pub async fn release(&self, guard: &RunLockGuard) -> CoreResult<()> {
        let deleted = run_locks::Entity::delete_many()
            .filter(run_locks::Column::Name.eq(guard.name.as_str()))
            .filter(run_locks::Column::Version.eq(guard.version))
            .exec(&self.db)
            .await?;

        if deleted.rows_affected == 0 {
            warn!(
                "Run lock '{}' (version {}) was already released or taken over",
                guard.name, guard.version
            );
        } else {
            debug!("Run lock '{}' released", guard.name);
        }
        Ok(())
    }

    /// Names among `run_names` with an unexpired lock.
    pub async fn locked_runs(&self, run_names: &[String]) -> CoreResult<Vec<String>> {
        if run_names.is_empty() {
            return Ok(Vec::new());
        }
        let threshold = Utc::now()
            .checked_sub_signed(self.timeout)
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
        let locks = run_locks::Entity::find()
            .filter(run_locks::Column::Name.is_in(run_names.iter().cloned()))
            .filter(run_locks::Column::LockedAt.gte(threshold))
            .all(&self.db)
            .await?;
        Ok(locks.into_iter().map(|lock| lock.name).collect())
    }

    pub async fn ensure_unlocked(&self, run_names: &[String]) -> CoreResult<()> {
        let mut locked = self.locked_runs(run_names).await?;
        if locked.is_empty() {
            return Ok(());
        }
        locked.sort();
        Err(CoreError::conflict(format!(
            "Can not remove results because the following runs are locked: {}",
            locked.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::setup_test_db;
    use crate::errors::CoreErrorKind;

    fn service(db: DatabaseConnection) -> RunLockService {
        RunLockService::new(db, chrono::Duration::seconds(1800))
    }

    #[tokio::test]
    async fn second_acquirer_is_refused_with_holder() {
        let db = setup_test_db().await;
        let locks = service(db);

        let guard = locks.acquire("proj", "alice").await.unwrap();
        assert_eq!(guard.version, 1);

        let err = locks.acquire("proj", "bob").await.unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Conflict);
        assert!(err.message().contains("is being stored into by alice"));

        locks.release(&guard).await.unwrap();
        let again = locks.acquire("proj", "bob").await.unwrap();
        assert_eq!(again.version, 1);
    }

    #[tokio::test]
    async fn expired_lock_is_taken_over() {
        let db = setup_test_db().await;
        run_locks::Entity::insert(run_locks::ActiveModel {
            name: Set("proj".to_string()),
            username: Set("crashed".to_string()),
            locked_at: Set(Utc::now() - chrono::Duration::seconds(3600)),
            version: Set(4),
        })
        .exec_without_returning(&db)
        .await
        .unwrap();

        let locks = service(db.clone());
        assert!(locks.locked_runs(&["proj".to_string()]).await.unwrap().is_empty());

        let guard = locks.acquire("proj", "alice").await.unwrap();
        assert_eq!(guard.version, 5);
        RunLockService::verify(&db, &guard).await.unwrap();

        let stale = RunLockGuard {
            name: "proj".to_string(),
            version: 4,
        };
        assert!(RunLockService::verify(&db, &stale).await.is_err());
        locks.release(&stale).await.unwrap();
        assert_eq!(locks.locked_runs(&["proj".to_string()]).await.unwrap(), vec!["proj"]);
    }

    #[tokio::test]
    async fn unexpired_lock_blocks_removal() {
        let db = setup_test_db().await;
        let locks = service(db);
        let _guard = locks.acquire("b", "alice").await.unwrap();
        let _other = locks.acquire("a", "alice").await.unwrap();

        let err = locks
            .ensure_unlocked(&["b".to_string(), "a".to_string(), "c".to_string()])
            .await
            .unwrap_err();
        assert_eq!(
            err.message(),
            "Can not remove results because the following runs are locked: a, b"
        );
        locks.ensure_unlocked(&["c".to_string()]).await.unwrap();
    }
}
