use std::future::Future;

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::{LedgerRecord, MIGRATION_001_DOCUMENTS};

/// Whole-document persistence keyed by user id.
///
/// There are no partial updates: `write` replaces the stored record and the
/// last writer wins. A missing record is a normal first-use state.
pub trait DocumentStore {
    /// Fetch the user's record, or `None` if nothing was stored yet.
    fn read(&self, user_id: &str) -> impl Future<Output = Result<Option<LedgerRecord>>> + Send;

    /// Overwrite the user's record.
    fn write(&self, user_id: &str, record: &LedgerRecord) -> impl Future<Output = Result<()>> + Send;

    /// Remove the user's record entirely.
    fn delete(&self, user_id: &str) -> impl Future<Output = Result<()>> + Send;
}

/// SQLite-backed document store: one row per user holding the JSON document.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_DOCUMENTS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Connect and migrate. Safe to call on an existing database.
    pub async fn init(database_url: &str) -> Result<Self> {
        let store = Self::connect(database_url).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Open (creating if needed) the database file at `path`.
    pub async fn open(path: &str) -> Result<Self> {
        Self::init(&format!("sqlite:{}?mode=rwc", path)).await
    }

    /// Get the underlying SQLite pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Ids of every user with a stored document.
    pub async fn list_users(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT user_id FROM documents ORDER BY user_id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list users")?;
        Ok(rows.iter().map(|row| row.get("user_id")).collect())
    }
}

impl DocumentStore for SqliteStore {
    async fn read(&self, user_id: &str) -> Result<Option<LedgerRecord>> {
        let row = sqlx::query("SELECT body FROM documents WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch ledger document")?;

        let Some(row) = row else {
            debug!(user = user_id, "no stored document");
            return Ok(None);
        };

        let body: String = row.get("body");
        let record = LedgerRecord::from_json(&body)
            .with_context(|| format!("Stored document for '{}' is not valid JSON", user_id))?;
        Ok(Some(record))
    }

    async fn write(&self, user_id: &str, record: &LedgerRecord) -> Result<()> {
        let body = record.to_json().context("Failed to encode ledger document")?;

        sqlx::query(
            r#"
            INSERT INTO documents (user_id, body, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(&body)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save ledger document")?;

        debug!(user = user_id, bytes = body.len(), "ledger document saved");
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM documents WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete ledger document")?;

        debug!(
            user = user_id,
            removed = result.rows_affected(),
            "ledger document deleted"
        );
        Ok(())
    }
}
