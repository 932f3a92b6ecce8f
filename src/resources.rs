// ABOUTME: Centralized resource container for dependency injection across route handlers
// ABOUTME: Owns the shared database managers, quota tracker, session store, and FAQ rules
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Server Resources Module
//!
//! Centralized resource container for dependency injection. Expensive
//! shared objects are created once at startup and handed to the routers
//! behind `Arc`, so request handlers never rebuild them.

use std::sync::Arc;

use crate::config::environment::ServerConfig;
use crate::database::{ConversationLogManager, Database, PromptVersionManager};
use crate::faq::FaqMatcher;
use crate::llm::LlmProvider;
use crate::prompt::ActivePrompt;
use crate::quota::QuotaTracker;
use crate::sessions::SessionStore;

/// Centralized resource container for dependency injection
#[derive(Clone)]
pub struct ServerResources {
    pub database: Arc<Database>,
    pub conversation_log: Arc<ConversationLogManager>,
    pub prompt_versions: Arc<PromptVersionManager>,
    pub active_prompt: Arc<ActivePrompt>,
    pub quota: Arc<QuotaTracker>,
    pub sessions: Arc<SessionStore>,
    pub faq: Arc<FaqMatcher>,
    pub config: Arc<ServerConfig>,
}

impl ServerResources {
    /// Create new server resources with proper Arc sharing
    #[must_use]
    pub fn new(
        database: Database,
        quota: QuotaTracker,
        faq: FaqMatcher,
        provider: Arc<dyn LlmProvider>,
        config: Arc<ServerConfig>,
    ) -> Self {
        let pool = database.pool().clone();

        Self {
            database: Arc::new(database),
            conversation_log: Arc::new(ConversationLogManager::new(pool.clone())),
            prompt_versions: Arc::new(PromptVersionManager::new(pool)),
            active_prompt: Arc::new(ActivePrompt::new()),
            quota: Arc::new(quota),
            sessions: Arc::new(SessionStore::new(provider, config.session_capacity)),
            faq: Arc::new(faq),
            config,
        }
    }

    /// Load the persisted active prompt version into the in-memory swap
    ///
    /// Called once at startup so a restart does not lose the configured
    /// instruction. No stored version is not an error; chat requests that
    /// need the LLM will refuse until one is activated.
    pub async fn restore_active_prompt(&self) -> crate::errors::AppResult<()> {
        if let Some(record) = self.prompt_versions.get_active().await? {
            let instruction = crate::prompt::assemble(&record.prompt_data);
            self.active_prompt.swap(instruction).await;
            tracing::info!(version = record.version, "restored active prompt version");
        } else {
            tracing::warn!("no active prompt version configured yet");
        }

        Ok(())
    }
}
