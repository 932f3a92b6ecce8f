// ABOUTME: SQLite connection management and schema migrations for the chat server
// ABOUTME: Owns the pool handed to the quota tracker, conversation log, and prompt store
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Database Management
//!
//! Thin wrapper around an `sqlx` SQLite pool. [`Database::new`] connects
//! (creating the file when missing) and runs the idempotent schema
//! migrations for the three tables the server persists into:
//! `conversation_logs`, `prompt_versions`, and `api_quota`.

mod conversations;
mod prompts;

pub use conversations::{ConversationLogManager, ConversationLogRecord};
pub use prompts::{PromptVersionManager, PromptVersionRecord, PromptVersionSummary};

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use crate::errors::{AppError, AppResult};

/// Database manager owning the shared SQLite pool
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect to the database and run migrations
    ///
    /// The database file is created when it does not exist yet. In-memory
    /// databases are pinned to a single connection, since every pooled
    /// connection to `sqlite::memory:` would otherwise see its own
    /// independent database.
    pub async fn new(database_url: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::database(format!("Invalid database URL: {e}")))?
            .create_if_missing(true);

        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            5
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| AppError::database(format!("Failed to connect to database: {e}")))?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Get a reference to the underlying pool
    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Run database migrations
    pub async fn migrate(&self) -> AppResult<()> {
        self.migrate_conversation_logs().await?;
        self.migrate_prompt_versions().await?;
        self.migrate_api_quota().await?;

        Ok(())
    }

    /// Create the conversation log table
    async fn migrate_conversation_logs(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS conversation_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                source TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create conversation_logs: {e}")))?;

        Ok(())
    }

    /// Create the prompt version table
    async fn migrate_prompt_versions(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS prompt_versions (
                id TEXT PRIMARY KEY,
                version INTEGER NOT NULL,
                editor TEXT NOT NULL,
                comment TEXT,
                prompt_data TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create prompt_versions: {e}")))?;

        Ok(())
    }

    /// Create the singleton quota row table
    async fn migrate_api_quota(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS api_quota (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                request_count_today INTEGER NOT NULL,
                last_reset_date TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create api_quota: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = Database::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db.migrate().await.unwrap();
    }

    #[tokio::test]
    async fn test_in_memory_pool_shares_one_database() {
        let db = Database::new("sqlite::memory:").await.unwrap();

        sqlx::query("INSERT INTO api_quota (id, request_count_today, last_reset_date) VALUES (1, 3, '2026-08-26')")
            .execute(db.pool())
            .await
            .unwrap();

        let row: (i64,) = sqlx::query_as("SELECT request_count_today FROM api_quota WHERE id = 1")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(row.0, 3);
    }
}
