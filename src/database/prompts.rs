// ABOUTME: Database operations for versioned prompt configurations
// ABOUTME: Stores immutable snapshots and tracks which version is active
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt version persistence.
//!
//! Each saved configuration becomes an immutable row with a
//! monotonically increasing version number. Exactly one row carries the
//! active flag; activation flips it inside a transaction so readers never
//! observe zero or two active versions.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::errors::{AppError, AppResult, ErrorCode};
use crate::prompt::PromptConfig;

/// A stored prompt configuration version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptVersionRecord {
    /// Unique version ID
    pub id: String,
    /// Monotonic version number, starting at 1
    pub version: i64,
    /// Who saved this version
    pub editor: String,
    /// Optional free-form change note
    pub comment: Option<String>,
    /// The structured configuration snapshot
    pub prompt_data: PromptConfig,
    /// Whether this version is currently active
    pub is_active: bool,
    /// When the version was saved (ISO 8601)
    pub created_at: String,
}

/// Version metadata without the configuration payload, for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptVersionSummary {
    /// Unique version ID
    pub id: String,
    /// Monotonic version number
    pub version: i64,
    /// Who saved this version
    pub editor: String,
    /// Optional change note
    pub comment: Option<String>,
    /// When the version was saved (ISO 8601)
    pub created_at: String,
}

/// Manager for prompt version operations
#[derive(Clone)]
pub struct PromptVersionManager {
    pool: SqlitePool,
}

impl PromptVersionManager {
    /// Create a new manager over the shared pool
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Save a new version and make it the active one
    ///
    /// The version number is one past the current maximum, so numbers keep
    /// growing even when older versions are deleted externally.
    pub async fn save_version(
        &self,
        prompt_data: &PromptConfig,
        editor: &str,
        comment: Option<&str>,
    ) -> AppResult<PromptVersionRecord> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().to_rfc3339();
        let payload = serde_json::to_string(prompt_data)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

        let row = sqlx::query("SELECT COALESCE(MAX(version), 0) as max_version FROM prompt_versions")
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to read version counter: {e}")))?;
        let version: i64 = row
            .try_get::<i64, _>("max_version")
            .map_err(|e| AppError::database(format!("Failed to read version counter: {e}")))?
            + 1;

        sqlx::query("UPDATE prompt_versions SET is_active = 0 WHERE is_active = 1")
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to clear active version: {e}")))?;

        sqlx::query(
            r"
            INSERT INTO prompt_versions (id, version, editor, comment, prompt_data, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, 1, $6)
            ",
        )
        .bind(&id)
        .bind(version)
        .bind(editor)
        .bind(comment)
        .bind(&payload)
        .bind(&created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to save prompt version: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit prompt version: {e}")))?;

        Ok(PromptVersionRecord {
            id,
            version,
            editor: editor.to_owned(),
            comment: comment.map(ToOwned::to_owned),
            prompt_data: prompt_data.clone(),
            is_active: true,
            created_at,
        })
    }

    /// Get the active version, if any has been saved yet
    pub async fn get_active(&self) -> AppResult<Option<PromptVersionRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, version, editor, comment, prompt_data, is_active, created_at
            FROM prompt_versions
            WHERE is_active = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get active version: {e}")))?;

        row.map(|row| Self::row_to_record(&row)).transpose()
    }

    /// List all versions, newest first
    pub async fn list_versions(&self) -> AppResult<Vec<PromptVersionSummary>> {
        let rows = sqlx::query(
            r"
            SELECT id, version, editor, comment, created_at
            FROM prompt_versions
            ORDER BY version DESC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list versions: {e}")))?;

        rows.iter()
            .map(|row| {
                Ok(PromptVersionSummary {
                    id: row.try_get("id")?,
                    version: row.try_get("version")?,
                    editor: row.try_get("editor")?,
                    comment: row.try_get("comment")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    /// Make an existing version the active one
    ///
    /// Returns the newly activated record, or `ResourceNotFound` when no
    /// version with the given ID exists.
    pub async fn activate(&self, version_id: &str) -> AppResult<PromptVersionRecord> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

        let row = sqlx::query(
            r"
            SELECT id, version, editor, comment, prompt_data, is_active, created_at
            FROM prompt_versions
            WHERE id = $1
            ",
        )
        .bind(version_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to look up version: {e}")))?;

        let Some(row) = row else {
            return Err(AppError::new(
                ErrorCode::ResourceNotFound,
                format!("Prompt version not found: {version_id}"),
            ));
        };

        sqlx::query("UPDATE prompt_versions SET is_active = 0 WHERE is_active = 1")
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to clear active version: {e}")))?;

        sqlx::query("UPDATE prompt_versions SET is_active = 1 WHERE id = $1")
            .bind(version_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to activate version: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit activation: {e}")))?;

        let mut record = Self::row_to_record(&row)?;
        record.is_active = true;
        Ok(record)
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> AppResult<PromptVersionRecord> {
        let payload: String = row.try_get("prompt_data")?;
        let prompt_data: PromptConfig = serde_json::from_str(&payload)?;
        let is_active: i64 = row.try_get("is_active")?;

        Ok(PromptVersionRecord {
            id: row.try_get("id")?,
            version: row.try_get("version")?,
            editor: row.try_get("editor")?,
            comment: row.try_get("comment")?,
            prompt_data,
            is_active: is_active != 0,
            created_at: row.try_get("created_at")?,
        })
    }
}
