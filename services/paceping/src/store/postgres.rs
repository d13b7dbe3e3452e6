//! Postgres-backed implementation of the pace store.
//!
//! # What this module is
//! Implements [`PaceStore`] on top of `sqlx::PgPool`. Three tables back it:
//! `paces`, `pace_subscriptions`, and the append-only `action_log`.
//!
//! # Key invariants
//! - Every statement is parameterized; labels and subscriber ids are bound,
//!   never interpolated.
//! - Membership changes and the matching `follower_count` adjustment run in one
//!   transaction, and the counter only moves when a membership row was actually
//!   inserted or deleted. The pace row is locked `FOR UPDATE` first so
//!   concurrent subscribe/unsubscribe calls on one pace serialize.
//! - `delete_pace` removes subscriptions and the pace in one transaction.
//!
//! # Security notes
//! - Database URLs may contain credentials; avoid logging them.
//!
//! # Operational notes
//! - Migrations are executed at startup via `sqlx::migrate!("./migrations")`.
//! - Pool size and timeouts come from [`PostgresConfig`] so a stuck database
//!   fails requests instead of hanging them.
use super::{PaceStore, StoreError, StoreResult};
use crate::config::PostgresConfig;
use crate::model::{ActionLogEntry, Pace, PaceLabel};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use std::time::Duration;

/// Durable pace store backed by Postgres.
///
/// # Example
/// ```rust,no_run
/// use paceping::config::PostgresConfig;
/// use paceping::store::postgres::PostgresStore;
///
/// async fn open(pg: PostgresConfig) {
///     let _ = PostgresStore::connect(&pg).await;
/// }
/// ```
pub struct PostgresStore {
    pool: PgPool,
}

/// Row shape for the `paces` table.
#[derive(Debug, Clone, FromRow)]
struct DbPace {
    pace_id: i64,
    label: String,
    follower_count: i64,
}

#[derive(Debug, Clone, FromRow)]
struct DbActionLog {
    subscriber_id: String,
    logged_at: DateTime<Utc>,
    action: String,
}

impl From<DbPace> for Pace {
    fn from(row: DbPace) -> Self {
        Pace {
            pace_id: row.pace_id,
            label: row.label,
            follower_count: row.follower_count,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unexpected(err.into())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Unexpected(err.into())
    }
}

impl PostgresStore {
    /// Connect to Postgres and run the embedded migrations.
    ///
    /// # Errors
    /// - Connection, pool setup, or migration failures.
    pub async fn connect(pg: &PostgresConfig) -> StoreResult<Self> {
        Self::connect_internal(pg, true).await
    }

    /// Connect without running migrations, for tests that manage the schema.
    #[cfg(any(test, feature = "pg-tests"))]
    pub async fn connect_without_migrations(pg: &PostgresConfig) -> StoreResult<Self> {
        Self::connect_internal(pg, false).await
    }

    async fn connect_internal(pg: &PostgresConfig, run_migrations: bool) -> StoreResult<Self> {
        // Avoid logging `pg.url`; it may contain credentials.
        let connect_options = PgConnectOptions::from_str(&pg.url)?;
        let connect = PgPoolOptions::new()
            .max_connections(pg.max_connections)
            .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
            .connect_with(connect_options);
        let pool = tokio::time::timeout(Duration::from_millis(pg.connect_timeout_ms), connect)
            .await
            .map_err(|_| StoreError::Unexpected(anyhow::anyhow!("postgres connect timed out")))??;

        if run_migrations {
            // Handlers assume the schema exists; fail startup otherwise.
            sqlx::migrate!("./migrations").run(&pool).await?;
        }

        Ok(Self { pool })
    }
}

#[async_trait]
impl PaceStore for PostgresStore {
    async fn list_paces(&self) -> StoreResult<Vec<Pace>> {
        let rows = sqlx::query_as::<_, DbPace>(
            "SELECT pace_id, label, follower_count FROM paces ORDER BY label",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Pace::from).collect())
    }

    async fn pace_exists(&self, label: &PaceLabel) -> StoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM paces WHERE label = $1)")
                .bind(label.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create_pace(&self, label: &PaceLabel) -> StoreResult<Pace> {
        let insert = sqlx::query_as::<_, DbPace>(
            r#"INSERT INTO paces (label) VALUES ($1) RETURNING pace_id, label, follower_count"#,
        )
        .bind(label.as_str())
        .fetch_one(&self.pool)
        .await;
        match insert {
            Ok(row) => Ok(row.into()),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict("pace exists".into())),
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_pace(&self, label: &PaceLabel) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;
        let pace_id = lock_pace(&mut tx, label).await?;

        // Subscriptions first so the count reflects what was removed, even
        // though the foreign key would cascade.
        let removed = sqlx::query("DELETE FROM pace_subscriptions WHERE pace_id = $1")
            .bind(pace_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM paces WHERE pace_id = $1")
            .bind(pace_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(removed)
    }

    async fn subscribe(&self, label: &PaceLabel, subscriber_id: &str) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let pace_id = lock_pace(&mut tx, label).await?;

        let inserted = sqlx::query(
            r#"INSERT INTO pace_subscriptions (pace_id, subscriber_id) VALUES ($1, $2)
               ON CONFLICT (pace_id, subscriber_id) DO NOTHING"#,
        )
        .bind(pace_id)
        .bind(subscriber_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if inserted == 0 {
            // Dropping `tx` rolls back.
            return Err(StoreError::Conflict("subscription exists".into()));
        }

        sqlx::query("UPDATE paces SET follower_count = follower_count + 1 WHERE pace_id = $1")
            .bind(pace_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn unsubscribe(&self, label: &PaceLabel, subscriber_id: &str) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let pace_id = lock_pace(&mut tx, label).await?;

        let deleted = sqlx::query(
            "DELETE FROM pace_subscriptions WHERE pace_id = $1 AND subscriber_id = $2",
        )
        .bind(pace_id)
        .bind(subscriber_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if deleted == 0 {
            return Err(StoreError::NotFound("subscription".into()));
        }

        sqlx::query("UPDATE paces SET follower_count = follower_count - 1 WHERE pace_id = $1")
            .bind(pace_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn is_subscribed(&self, label: &PaceLabel, subscriber_id: &str) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"SELECT EXISTS(
                   SELECT 1 FROM pace_subscriptions s
                   INNER JOIN paces p ON p.pace_id = s.pace_id
                   WHERE p.label = $1 AND s.subscriber_id = $2)"#,
        )
        .bind(label.as_str())
        .bind(subscriber_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn list_subscribed(&self, subscriber_id: &str) -> StoreResult<Vec<Pace>> {
        let rows = sqlx::query_as::<_, DbPace>(
            r#"SELECT p.pace_id, p.label, p.follower_count FROM paces p
               INNER JOIN pace_subscriptions s ON s.pace_id = p.pace_id
               WHERE s.subscriber_id = $1
               ORDER BY p.label"#,
        )
        .bind(subscriber_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Pace::from).collect())
    }

    async fn subscribers(&self, label: &PaceLabel) -> StoreResult<Vec<String>> {
        let rows: Vec<String> = sqlx::query_scalar(
            r#"SELECT s.subscriber_id FROM pace_subscriptions s
               INNER JOIN paces p ON p.pace_id = s.pace_id
               WHERE p.label = $1
               ORDER BY s.subscribed_at, s.subscriber_id"#,
        )
        .bind(label.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn pace_labels(&self) -> StoreResult<Vec<String>> {
        let rows: Vec<String> = sqlx::query_scalar("SELECT label FROM paces ORDER BY label")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn append_log(&self, entry: ActionLogEntry) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO action_log (subscriber_id, logged_at, action) VALUES ($1, $2, $3)"#,
        )
        .bind(&entry.subscriber_id)
        .bind(entry.logged_at)
        .bind(&entry.action)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_log(&self, limit: usize) -> StoreResult<Vec<ActionLogEntry>> {
        let rows = sqlx::query_as::<_, DbActionLog>(
            r#"SELECT subscriber_id, logged_at, action FROM action_log ORDER BY seq DESC LIMIT $1"#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| ActionLogEntry {
                subscriber_id: row.subscriber_id,
                logged_at: row.logged_at,
                action: row.action,
            })
            .collect())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

/// Resolve a label to its id, holding a row lock until the transaction ends.
async fn lock_pace(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    label: &PaceLabel,
) -> StoreResult<i64> {
    let pace_id: Option<i64> =
        sqlx::query_scalar("SELECT pace_id FROM paces WHERE label = $1 FOR UPDATE")
            .bind(label.as_str())
            .fetch_optional(&mut **tx)
            .await?;
    pace_id.ok_or_else(|| StoreError::NotFound("pace".into()))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23505").unwrap_or(false);
    }
    false
}
