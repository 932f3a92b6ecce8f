// ABOUTME: Per-user LLM conversation sessions with LRU-bounded storage
// ABOUTME: Serializes concurrent sends per user and keeps history only for completed turns
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Conversation Session Store
//!
//! Holds one dialogue history per user so the LLM sees the preceding turns
//! of a conversation. The map is LRU-bounded; the least recently used
//! session is dropped when a new user arrives at capacity. Eviction is
//! capacity-based only, there is no idle expiry.
//!
//! Two requests for the same user are serialized through a per-session
//! mutex held across the LLM call, so interleaved sends cannot corrupt the
//! turn order. Different users never wait on each other.
//!
//! History is only extended after a completed exchange: when the provider
//! call fails, the history stays exactly as it was before the send.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tracing::{debug, instrument};

use crate::errors::AppResult;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};

/// One user's dialogue history, user and assistant turns alternating
#[derive(Debug, Default)]
struct SessionState {
    history: Vec<ChatMessage>,
}

/// LRU-bounded store of per-user conversation sessions
pub struct SessionStore {
    sessions: std::sync::Mutex<LruCache<String, Arc<tokio::sync::Mutex<SessionState>>>>,
    provider: Arc<dyn LlmProvider>,
}

impl SessionStore {
    /// Create a store holding at most `capacity` concurrent user sessions
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);

        Self {
            sessions: std::sync::Mutex::new(LruCache::new(capacity)),
            provider: Arc::clone(&provider),
        }
    }

    /// Send one user turn through the LLM with the user's session history
    ///
    /// Holds the user's session lock across the provider call, so a second
    /// request for the same user waits until this exchange settles. The
    /// history gains the user and assistant turns only when the provider
    /// call succeeds.
    #[instrument(skip(self, utterance, system_instruction), fields(user_id = %user_id))]
    pub async fn send(
        &self,
        user_id: &str,
        utterance: &str,
        system_instruction: &str,
    ) -> AppResult<String> {
        let session = self.get_or_create(user_id);
        let mut state = session.lock().await;

        let mut messages = Vec::with_capacity(state.history.len() + 2);
        messages.push(ChatMessage::system(system_instruction));
        messages.extend(state.history.iter().cloned());
        messages.push(ChatMessage::user(utterance));

        let request = ChatRequest::new(messages);
        let response = self.provider.complete(&request).await?;

        state.history.push(ChatMessage::user(utterance));
        state.history.push(ChatMessage::assistant(&response.content));
        debug!(turns = state.history.len() / 2, "session history extended");

        Ok(response.content)
    }

    /// Number of live sessions, for diagnostics
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .map(|sessions| sessions.len())
            .unwrap_or(0)
    }

    /// Whether no sessions exist yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_or_create(&self, user_id: &str) -> Arc<tokio::sync::Mutex<SessionState>> {
        let mut sessions = match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(session) = sessions.get(user_id) {
            return Arc::clone(session);
        }

        debug!(user_id = %user_id, "creating new conversation session");
        let session = Arc::new(tokio::sync::Mutex::new(SessionState::default()));
        sessions.put(user_id.to_owned(), Arc::clone(&session));
        session
    }

    #[cfg(test)]
    async fn history_len(&self, user_id: &str) -> usize {
        let session = self.get_or_create(user_id);
        let state = session.lock().await;
        state.history.len()
    }
}
