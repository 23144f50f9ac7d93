//! SQLite-backed message store.
//!
//! The store is the sole source of truth for message identity and order:
//! identifiers are assigned here, timestamps are stamped here, and every
//! mutation goes through it. Addresses are immutable once created and never
//! deleted.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteConnectOptions, ConnectOptions, SqlitePool};
use std::{path::Path, str::FromStr};

/// Queries slower than this are logged at WARN through the `log` facade.
const SLOW_QUERY_THRESHOLD: std::time::Duration = std::time::Duration::from_millis(100);

// ─── Errors ───────────────────────────────────────────────────────────────────

/// Failures the store can surface to callers.
///
/// "Not found" is not an error here — lookups return `Option` and routes map
/// the `None` to a 404.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing SQLite store is unreachable or a query failed.
    #[error("storage unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("could not create data directory: {0}")]
    DataDir(#[from] std::io::Error),
}

// ─── Rows ─────────────────────────────────────────────────────────────────────

/// A disposable mailbox address.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRow {
    pub id: i64,
    pub address: String,
    pub created_at: String,
}

/// One simulated inbound message. Wire names (`emailId`, `otpCode`, …) match
/// what the browser client expects.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRow {
    pub id: i64,
    #[serde(rename = "emailId")]
    pub address_id: i64,
    pub sender: String,
    pub sender_name: String,
    pub subject: String,
    pub content: String,
    pub otp_code: Option<String>,
    pub received_at: String,
    pub is_read: bool,
}

/// Fields for one append. Identity, timestamp, and the read flag are the
/// store's to assign.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender: String,
    pub sender_name: String,
    pub subject: String,
    pub content: String,
    pub otp_code: Option<String>,
}

// ─── Storage ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Open (or create) `{data_dir}/driftmail.db` and run migrations.
    pub async fn new(data_dir: &Path) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db_path = data_dir.join("driftmail.db");
        let opts =
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .create_if_missing(true)
                .log_slow_statements(log::LevelFilter::Warn, SLOW_QUERY_THRESHOLD);

        let pool = SqlitePool::connect_with(opts).await?;
        sqlx::migrate!("src/storage/migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Return a clone of the connection pool (cheap — Arc-backed).
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    // ── Addresses ─────────────────────────────────────────────────────────────

    /// Insert an address, or return the existing record when the value is
    /// already taken. Generation is idempotent on collision by design.
    pub async fn create_address(&self, address: &str) -> Result<AddressRow, StoreError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO addresses (address, created_at) VALUES (?, ?)
             ON CONFLICT(address) DO NOTHING",
        )
        .bind(address)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as("SELECT * FROM addresses WHERE address = ?")
            .bind(address)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn get_address_by_value(
        &self,
        address: &str,
    ) -> Result<Option<AddressRow>, StoreError> {
        Ok(sqlx::query_as("SELECT * FROM addresses WHERE address = ?")
            .bind(address)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn list_addresses(&self) -> Result<Vec<AddressRow>, StoreError> {
        Ok(sqlx::query_as("SELECT * FROM addresses ORDER BY id")
            .fetch_all(&self.pool)
            .await?)
    }

    // ── Messages ──────────────────────────────────────────────────────────────

    /// Append a message to an address's inbox: fresh id, `received_at = now`,
    /// unread. Returns the stored record.
    pub async fn append_message(
        &self,
        address_id: i64,
        fields: NewMessage,
    ) -> Result<MessageRow, StoreError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO messages
                 (address_id, sender, sender_name, subject, content, otp_code, received_at, is_read)
             VALUES (?, ?, ?, ?, ?, ?, ?, 0)",
        )
        .bind(address_id)
        .bind(&fields.sender)
        .bind(&fields.sender_name)
        .bind(&fields.subject)
        .bind(&fields.content)
        .bind(fields.otp_code.as_deref())
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as("SELECT * FROM messages WHERE id = ?")
            .bind(result.last_insert_rowid())
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    /// All messages for an address in ascending creation order. The id
    /// tiebreak keeps insertion order for same-timestamp appends.
    pub async fn list_messages(&self, address_id: i64) -> Result<Vec<MessageRow>, StoreError> {
        Ok(sqlx::query_as(
            "SELECT * FROM messages WHERE address_id = ? ORDER BY received_at ASC, id ASC",
        )
        .bind(address_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn get_message(&self, id: i64) -> Result<Option<MessageRow>, StoreError> {
        Ok(sqlx::query_as("SELECT * FROM messages WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Flip the read flag to true. Idempotent: re-marking an already-read
    /// message succeeds and returns it unchanged. `None` for unknown ids.
    pub async fn mark_read(&self, id: i64) -> Result<Option<MessageRow>, StoreError> {
        sqlx::query("UPDATE messages SET is_read = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.get_message(id).await
    }

    /// Remove a message. True when a record was actually deleted.
    pub async fn delete_message(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
