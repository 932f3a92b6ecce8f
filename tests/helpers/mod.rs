// ABOUTME: Shared test helpers for integration tests
// ABOUTME: Builds a full application router backed by a scripted LLM provider
//
// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod axum_test;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use camper_chatbot::{
    config::environment::ServerConfig,
    database::Database,
    errors::{AppError, AppResult},
    faq::FaqMatcher,
    llm::{ChatRequest, ChatResponse, LlmProvider},
    prompt::PromptConfig,
    quota::QuotaTracker,
    resources::ServerResources,
    server,
};

/// FAQ rules used across the integration tests
pub const TEST_FAQ_JSON: &str = r#"[
    {
        "keywords": ["ペット"],
        "answer": "ペットの同乗はご相談ください。",
        "relatedLink": "https://example.com/pets",
        "linkText": "ペット同乗の詳細"
    },
    {
        "questionPatternSource": "営業時間",
        "answer": "営業時間は9時から18時です。"
    }
]"#;

/// LLM provider double with switchable failure mode
pub struct ScriptedProvider {
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, _request: &ChatRequest) -> AppResult<ChatResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::llm("provider unavailable"));
        }

        Ok(ChatResponse {
            content: format!("scripted reply {call}"),
            model: "scripted-model".to_owned(),
            usage: None,
            finish_reason: Some("stop".to_owned()),
        })
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

fn test_config() -> ServerConfig {
    ServerConfig {
        http_port: 0,
        gemini_api_key: "test-key".to_owned(),
        gemini_model: "scripted-model".to_owned(),
        daily_request_limit: 500,
        database_url: "sqlite::memory:".to_owned(),
        faq_path: "faq.json".to_owned(),
        llm_timeout_secs: 5,
        session_capacity: 8,
        cors_allowed_origins: "*".to_owned(),
    }
}

/// Build the full application with an in-memory database
///
/// A first prompt version is saved and activated unless `configured` is
/// false, so the LLM path works out of the box.
pub async fn build_app(
    provider: Arc<dyn LlmProvider>,
    daily_limit: u32,
    configured: bool,
) -> (Router, Arc<ServerResources>) {
    let database = Database::new("sqlite::memory:")
        .await
        .expect("in-memory database");
    let quota = QuotaTracker::new(database.pool().clone(), daily_limit).await;
    let faq = FaqMatcher::from_json(TEST_FAQ_JSON).expect("test FAQ rules");

    let mut config = test_config();
    config.daily_request_limit = daily_limit;

    let resources = Arc::new(ServerResources::new(
        database,
        quota,
        faq,
        provider,
        Arc::new(config),
    ));

    if configured {
        let mut prompt = PromptConfig::default();
        prompt.bot_personality.role_description =
            "あなたはキャンピングカーレンタルの案内係です。".to_owned();
        resources
            .prompt_versions
            .save_version(&prompt, "tests", None)
            .await
            .expect("save prompt version");
        resources
            .restore_active_prompt()
            .await
            .expect("restore active prompt");
    }

    let app = server::build_router(&resources);
    (app, resources)
}

/// Poll the conversation log until it reaches `expected` rows or time runs out
pub async fn wait_for_log_rows(resources: &Arc<ServerResources>, expected: i64) -> i64 {
    for _ in 0..50 {
        let count = resources
            .conversation_log
            .count()
            .await
            .expect("count conversations");
        if count >= expected {
            return count;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    resources
        .conversation_log
        .count()
        .await
        .expect("count conversations")
}
