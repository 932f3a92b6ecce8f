// ABOUTME: Database operations for the append-only conversation log
// ABOUTME: Records every answered question and serves the CSV export query
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation log persistence.
//!
//! Every answered chat request is appended here, regardless of whether the
//! FAQ matcher or the LLM produced the reply. Rows are only ever inserted
//! and read back in insertion order for the export endpoint.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::errors::{AppError, AppResult};

/// A single logged question/answer exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationLogRecord {
    /// Row ID, assigned on insert
    pub id: i64,
    /// User the exchange belongs to
    pub user_id: String,
    /// The question as received
    pub question: String,
    /// The reply that was sent back
    pub answer: String,
    /// Which component produced the reply ("faq", "ai", or "system")
    pub source: String,
    /// When the exchange was recorded (ISO 8601)
    pub created_at: String,
}

/// Manager for conversation log operations
#[derive(Clone)]
pub struct ConversationLogManager {
    pool: SqlitePool,
}

impl ConversationLogManager {
    /// Create a new manager over the shared pool
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append one exchange to the log
    pub async fn record(
        &self,
        user_id: &str,
        question: &str,
        answer: &str,
        source: &str,
    ) -> AppResult<()> {
        let created_at = Utc::now().to_rfc3339();

        sqlx::query(
            r"
            INSERT INTO conversation_logs (user_id, question, answer, source, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(user_id)
        .bind(question)
        .bind(answer)
        .bind(source)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to record conversation: {e}")))?;

        Ok(())
    }

    /// Fetch the full log in insertion order
    pub async fn fetch_all(&self) -> AppResult<Vec<ConversationLogRecord>> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, question, answer, source, created_at
            FROM conversation_logs
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to fetch conversation log: {e}")))?;

        rows.iter()
            .map(|row| {
                Ok(ConversationLogRecord {
                    id: row.try_get("id")?,
                    user_id: row.try_get("user_id")?,
                    question: row.try_get("question")?,
                    answer: row.try_get("answer")?,
                    source: row.try_get("source")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    /// Count logged exchanges
    pub async fn count(&self) -> AppResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM conversation_logs")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count conversations: {e}")))?;

        row.try_get("count")
            .map_err(|e| AppError::database(format!("Failed to read conversation count: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    async fn manager() -> ConversationLogManager {
        let db = Database::new("sqlite::memory:").await.unwrap();
        ConversationLogManager::new(db.pool().clone())
    }

    #[tokio::test]
    async fn test_record_and_fetch_in_insertion_order() {
        let log = manager().await;

        log.record("user-a", "q1", "a1", "faq").await.unwrap();
        log.record("user-b", "q2", "a2", "ai").await.unwrap();

        let rows = log.fetch_all().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].question, "q1");
        assert_eq!(rows[0].source, "faq");
        assert_eq!(rows[1].user_id, "user-b");
        assert_eq!(rows[1].source, "ai");
    }

    #[tokio::test]
    async fn test_count_tracks_inserts() {
        let log = manager().await;
        assert_eq!(log.count().await.unwrap(), 0);

        log.record("u", "q", "a", "ai").await.unwrap();
        assert_eq!(log.count().await.unwrap(), 1);
    }
}
