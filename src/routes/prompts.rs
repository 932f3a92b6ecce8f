// ABOUTME: Prompt editor route handlers for saving, listing, and activating versions
// ABOUTME: Activation reassembles the system instruction and swaps it atomically
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt version routes.
//!
//! Used by the prompt editor: save a new configuration version, list the
//! history, read the active one back, and roll back to an older version.
//! Saving and activating both rebuild the assembled instruction and swap
//! it into [`crate::prompt::ActivePrompt`], so the next chat request sees
//! the new text without a restart.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::database::{PromptVersionRecord, PromptVersionSummary};
use crate::errors::{AppError, AppResult};
use crate::prompt::{assemble, PromptConfig};
use crate::resources::ServerResources;

/// Request to save a new prompt version
#[derive(Debug, Deserialize)]
pub struct SaveVersionRequest {
    /// The structured configuration from the editor form
    #[serde(rename = "promptData")]
    pub prompt_data: PromptConfig,
    /// Who is saving, typically the editor's login email
    #[serde(default)]
    pub editor: Option<String>,
    /// Optional change note
    #[serde(default)]
    pub comment: Option<String>,
}

/// Request to activate an existing version
#[derive(Debug, Deserialize)]
pub struct ActivateVersionRequest {
    /// ID of the version to activate
    #[serde(rename = "versionId")]
    pub version_id: String,
}

/// The active version with its full configuration payload
#[derive(Debug, Serialize, Deserialize)]
pub struct ActiveVersionResponse {
    /// ID of the active version
    #[serde(rename = "activeVersionId")]
    pub active_version_id: String,
    /// Monotonic version number
    pub version: i64,
    /// Who saved it
    pub editor: String,
    /// Change note, if any
    pub comment: Option<String>,
    /// The stored configuration
    #[serde(rename = "promptData")]
    pub prompt_data: PromptConfig,
}

/// Result of saving or activating a version
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionMutationResponse {
    /// ID of the now-active version
    #[serde(rename = "versionId")]
    pub version_id: String,
    /// Its version number
    pub version: i64,
}

/// Version history listing
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionListResponse {
    /// All versions, newest first
    pub versions: Vec<PromptVersionSummary>,
}

/// Prompt version routes implementation
pub struct PromptRoutes;

impl PromptRoutes {
    /// Create all prompt version routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/get_active_prompt_version", get(Self::get_active))
            .route("/api/prompt_versions", get(Self::list_versions))
            .route("/api/save_prompt_version", post(Self::save_version))
            .route("/api/activate_prompt_version", post(Self::activate_version))
            .with_state(resources)
    }

    /// Return the active version with its configuration
    async fn get_active(
        State(resources): State<Arc<ServerResources>>,
    ) -> AppResult<Json<ActiveVersionResponse>> {
        let record = resources
            .prompt_versions
            .get_active()
            .await?
            .ok_or_else(|| AppError::not_found("active prompt version"))?;

        Ok(Json(ActiveVersionResponse {
            active_version_id: record.id,
            version: record.version,
            editor: record.editor,
            comment: record.comment,
            prompt_data: record.prompt_data,
        }))
    }

    /// List all saved versions, newest first
    async fn list_versions(
        State(resources): State<Arc<ServerResources>>,
    ) -> AppResult<Json<VersionListResponse>> {
        let versions = resources.prompt_versions.list_versions().await?;
        Ok(Json(VersionListResponse { versions }))
    }

    /// Save a new version and make it active
    async fn save_version(
        State(resources): State<Arc<ServerResources>>,
        Json(body): Json<SaveVersionRequest>,
    ) -> AppResult<Json<VersionMutationResponse>> {
        let editor = body.editor.as_deref().unwrap_or("unknown");
        let record = resources
            .prompt_versions
            .save_version(&body.prompt_data, editor, body.comment.as_deref())
            .await?;

        swap_active(&resources, &record).await;
        info!(version = record.version, editor = %record.editor, "saved new prompt version");

        Ok(Json(VersionMutationResponse {
            version_id: record.id,
            version: record.version,
        }))
    }

    /// Activate an existing version
    async fn activate_version(
        State(resources): State<Arc<ServerResources>>,
        Json(body): Json<ActivateVersionRequest>,
    ) -> AppResult<Json<VersionMutationResponse>> {
        let record = resources.prompt_versions.activate(&body.version_id).await?;

        swap_active(&resources, &record).await;
        info!(version = record.version, "activated prompt version");

        Ok(Json(VersionMutationResponse {
            version_id: record.id,
            version: record.version,
        }))
    }
}

/// Reassemble the instruction from a record and swap it in
async fn swap_active(resources: &Arc<ServerResources>, record: &PromptVersionRecord) {
    let instruction = assemble(&record.prompt_data);
    resources.active_prompt.swap(instruction).await;
}
