use std::time::Duration;

use sqlx::any::AnyPoolOptions;
use sqlx::{AnyPool, Executor};
use tracing::{debug, warn};

use crate::config;
use crate::error::{ApiError, ApiResult};
use crate::models::Paste;

const SCHEMA: &str = include_str!("../assets/schema.sql");

#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
    lock_timeout: Duration,
}

impl Database {
    /// Connect to the database described by `config`.
    pub async fn connect(config: &config::Database) -> anyhow::Result<Self> {
        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(&config.url)
            .await?;

        Ok(Self {
            pool,
            lock_timeout: config.lock_timeout(),
        })
    }

    /// Create the paste table if it does not exist yet.
    pub async fn init_schema(&self) -> ApiResult<()> {
        self.pool.execute(SCHEMA).await?;
        Ok(())
    }

    /// Check that the database is reachable.
    pub async fn ping(&self) -> bool {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                warn!("database ping failed: {e}");
                false
            }
        }
    }

    /// Insert a paste. The caller guarantees `id` is unique.
    pub async fn insert_paste(&self, paste: &Paste) -> ApiResult<()> {
        sqlx::query(
            "INSERT INTO paste (id, content, created_at, expires_at, remaining_views) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&paste.id)
        .bind(&paste.content)
        .bind(paste.created_at)
        .bind(paste.expires_at)
        .bind(paste.remaining_views)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get a paste that is available at `now` without touching its view budget.
    pub async fn read_without_consuming(&self, id: &str, now: i64) -> ApiResult<Option<Paste>> {
        let paste = sqlx::query_as::<_, Paste>(
            "SELECT id, content, created_at, expires_at, remaining_views FROM paste WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(paste.filter(|paste| paste.is_available(now)))
    }

    /// Get a paste that is available at `now` and spend one of its views.
    ///
    /// The returned snapshot carries the post-decrement view count. Concurrent
    /// calls for the same id are serialized by the row lock taken by the
    /// conditional update, so each remaining view is handed out exactly once.
    /// The whole operation is bounded by the configured lock timeout; on
    /// timeout or error the transaction is dropped and nothing changes.
    pub async fn read_and_consume(&self, id: &str, now: i64) -> ApiResult<Option<Paste>> {
        tokio::time::timeout(self.lock_timeout, self.consume(id, now))
            .await
            .map_err(|_| ApiError::LockTimeout)?
    }

    async fn consume(&self, id: &str, now: i64) -> ApiResult<Option<Paste>> {
        let mut tx = self.pool.begin().await?;

        // null - 1 stays null, so unlimited pastes pass through unchanged
        let paste = sqlx::query_as::<_, Paste>(
            "UPDATE paste SET remaining_views = remaining_views - 1 \
             WHERE id = $1 \
             AND (expires_at IS NULL OR expires_at > $2) \
             AND (remaining_views IS NULL OR remaining_views > 0) \
             RETURNING id, content, created_at, expires_at, remaining_views",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&mut tx)
        .await?;

        if paste.is_none() {
            let deleted = sqlx::query(
                "DELETE FROM paste WHERE id = $1 AND expires_at IS NOT NULL AND expires_at <= $2",
            )
            .bind(id)
            .bind(now)
            .execute(&mut tx)
            .await?
            .rows_affected();

            if deleted > 0 {
                debug!("deleted expired paste: {id}");
            }
        }

        tx.commit().await?;
        Ok(paste)
    }

    /// Delete every paste expired at `now`, returning how many were removed.
    pub async fn purge_expired(&self, now: i64) -> ApiResult<u64> {
        let result =
            sqlx::query("DELETE FROM paste WHERE expires_at IS NOT NULL AND expires_at <= $1")
                .bind(now)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
