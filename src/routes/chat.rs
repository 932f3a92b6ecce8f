// ABOUTME: Chat route handlers answering customer questions from FAQ or the LLM
// ABOUTME: Implements the quota gate, FAQ-first resolution, and fire-and-forget logging
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat routes.
//!
//! `POST /api/chat` runs the full answering pipeline: validate, check the
//! daily quota, try the FAQ rules, and only then spend one quota unit on
//! an LLM call through the user's conversation session. Every answered
//! exchange is logged off the request path. `GET /api/quota_status`
//! exposes the remaining daily budget to the frontend.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::resources::ServerResources;

/// User ID recorded when the frontend sends none
const DEFAULT_USER_ID: &str = "defaultUser";

/// Customer-facing Japanese messages, kept stable for the frontend
const MSG_INVALID_MESSAGE: &str = "メッセージが無効です。";
const MSG_QUOTA_ERROR: &str = "本日の利用上限に達しました。明日またお試しください。";
const MSG_QUOTA_REPLY: &str =
    "申し訳ありませんが、本日の利用可能な回数を超えました。明日以降に再度お試しいただけますでしょうか。";
const MSG_LLM_ERROR: &str = "AIとの通信中にエラーが発生しました。";
const MSG_NOT_CONFIGURED: &str = "サーバー設定エラー（プロンプト未設定）。";

/// Incoming chat request from the browser widget
#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    /// The customer's question
    #[serde(default)]
    pub message: Option<String>,
    /// Stable per-browser user identifier
    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,
    /// Skip the FAQ rules and go straight to the LLM
    #[serde(default, rename = "forceAI")]
    pub force_ai: bool,
}

/// Successful chat reply
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponseBody {
    /// The answer text, possibly containing an HTML link for FAQ hits
    pub reply: String,
    /// Which component answered ("faq" or "ai")
    pub source: String,
}

/// Error body matching the frontend contract
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatErrorBody {
    /// Operator-facing description
    pub error: String,
    /// Friendly reply text shown in the chat window, when applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    /// Always "system" for error replies
    pub source: String,
}

/// Chat routes implementation
pub struct ChatRoutes;

impl ChatRoutes {
    /// Create all chat routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/chat", post(Self::chat))
            .route("/api/quota_status", get(Self::quota_status))
            .with_state(resources)
    }

    /// Handle one customer question
    async fn chat(
        State(resources): State<Arc<ServerResources>>,
        Json(body): Json<ChatRequestBody>,
    ) -> Response {
        let user_id = body
            .user_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER_ID.to_owned());

        let Some(message) = body
            .message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(ToOwned::to_owned)
        else {
            warn!(user_id = %user_id, "rejected chat request with empty message");
            return system_error(StatusCode::BAD_REQUEST, MSG_INVALID_MESSAGE);
        };

        if resources.quota.is_exhausted().await {
            warn!(user_id = %user_id, "daily request limit reached");
            return quota_exceeded();
        }

        if !body.force_ai {
            if let Some(faq_match) = resources.faq.find(&message) {
                let mut reply = faq_match.answer;
                if let Some(link) = faq_match.related_link {
                    reply.push_str(&format!(
                        "\n<br>詳しくはこちらもご覧ください: <a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>",
                        link.url, link.text
                    ));
                }

                info!(user_id = %user_id, "answered from FAQ");
                spawn_log(&resources, user_id, message, reply.clone(), "faq");
                return (
                    StatusCode::OK,
                    Json(ChatResponseBody {
                        reply,
                        source: "faq".to_owned(),
                    }),
                )
                    .into_response();
            }
            info!(user_id = %user_id, "no FAQ rule matched, falling back to LLM");
        } else {
            info!(user_id = %user_id, "forceAI set, skipping FAQ rules");
        }

        let instruction = match resources.active_prompt.get().await {
            Ok(instruction) => instruction,
            Err(e) => {
                error!(user_id = %user_id, error = %e, "chat request refused, no active prompt");
                return system_error(StatusCode::INTERNAL_SERVER_ERROR, MSG_NOT_CONFIGURED);
            }
        };

        // The quota unit is spent before the call and not refunded on failure
        if !resources.quota.check_and_consume().await {
            warn!(user_id = %user_id, "daily request limit reached");
            return quota_exceeded();
        }

        match resources.sessions.send(&user_id, &message, &instruction).await {
            Ok(reply) => {
                info!(user_id = %user_id, "answered from LLM");
                spawn_log(&resources, user_id, message, reply.clone(), "ai");
                (
                    StatusCode::OK,
                    Json(ChatResponseBody {
                        reply,
                        source: "ai".to_owned(),
                    }),
                )
                    .into_response()
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "LLM call failed");
                system_error(StatusCode::INTERNAL_SERVER_ERROR, MSG_LLM_ERROR)
            }
        }
    }

    /// Report the remaining daily budget
    async fn quota_status(State(resources): State<Arc<ServerResources>>) -> Response {
        Json(resources.quota.status().await).into_response()
    }
}

/// Record the exchange off the request path; failures only warn
fn spawn_log(
    resources: &Arc<ServerResources>,
    user_id: String,
    question: String,
    answer: String,
    source: &'static str,
) {
    let log = Arc::clone(&resources.conversation_log);
    tokio::spawn(async move {
        if let Err(e) = log.record(&user_id, &question, &answer, source).await {
            warn!(user_id = %user_id, error = %e, "failed to record conversation");
        }
    });
}

fn system_error(status: StatusCode, error: &str) -> Response {
    (
        status,
        Json(ChatErrorBody {
            error: error.to_owned(),
            reply: None,
            source: "system".to_owned(),
        }),
    )
        .into_response()
}

fn quota_exceeded() -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(ChatErrorBody {
            error: MSG_QUOTA_ERROR.to_owned(),
            reply: Some(MSG_QUOTA_REPLY.to_owned()),
            source: "system".to_owned(),
        }),
    )
        .into_response()
}
