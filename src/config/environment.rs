// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, defaults, and runtime configuration parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Environment-based configuration management for production deployment

use anyhow::{Context, Result};
use std::env;

/// Default HTTP port the server listens on
const DEFAULT_HTTP_PORT: u16 = 3000;

/// Default daily ceiling on LLM invocations
const DEFAULT_DAILY_REQUEST_LIMIT: u32 = 500;

/// Default Gemini model identifier
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-latest";

/// Default SQLite database location
const DEFAULT_DATABASE_URL: &str = "sqlite:data/camper_chatbot.db";

/// Default FAQ rule file location
const DEFAULT_FAQ_PATH: &str = "faq.json";

/// Default ceiling on a single LLM call, in seconds
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;

/// Maximum number of per-user conversation sessions retained in memory
const DEFAULT_SESSION_CAPACITY: usize = 256;

/// Default CORS origin policy; wildcard suits the embedded chat widget
const DEFAULT_CORS_ALLOWED_ORIGINS: &str = "*";

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listening port
    pub http_port: u16,
    /// Gemini API credential
    pub gemini_api_key: String,
    /// Gemini model identifier
    pub gemini_model: String,
    /// Daily ceiling on LLM invocations
    pub daily_request_limit: u32,
    /// SQLite connection string
    pub database_url: String,
    /// Path to the FAQ rule file
    pub faq_path: String,
    /// Ceiling on a single LLM call, in seconds
    pub llm_timeout_secs: u64,
    /// Maximum number of per-user sessions retained in memory
    pub session_capacity: usize,
    /// Comma-separated allowed CORS origins, or "*" for any
    pub cors_allowed_origins: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `GEMINI_API_KEY` is unset or a numeric variable
    /// fails to parse.
    pub fn from_env() -> Result<Self> {
        let gemini_api_key = env::var("GEMINI_API_KEY")
            .context("GEMINI_API_KEY environment variable not set")?;

        let http_port = parse_env("HTTP_PORT", DEFAULT_HTTP_PORT)?;
        let daily_request_limit =
            parse_env("DAILY_REQUEST_LIMIT", DEFAULT_DAILY_REQUEST_LIMIT)?;
        let llm_timeout_secs = parse_env("LLM_TIMEOUT_SECS", DEFAULT_LLM_TIMEOUT_SECS)?;
        let session_capacity = parse_env("SESSION_CAPACITY", DEFAULT_SESSION_CAPACITY)?;

        Ok(Self {
            http_port,
            gemini_api_key,
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_owned()),
            daily_request_limit,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_owned()),
            faq_path: env::var("FAQ_PATH").unwrap_or_else(|_| DEFAULT_FAQ_PATH.to_owned()),
            llm_timeout_secs,
            session_capacity,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| DEFAULT_CORS_ALLOWED_ORIGINS.to_owned()),
        })
    }

    /// One-line configuration summary for startup logging, credential omitted
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "port={} model={} daily_limit={} db={} faq={} llm_timeout={}s sessions={}",
            self.http_port,
            self.gemini_model,
            self.daily_request_limit,
            self.database_url,
            self.faq_path,
            self.llm_timeout_secs,
            self.session_capacity
        )
    }
}

/// Parse an environment variable with a typed default
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("invalid value for {name}: {value}")),
        Err(_) => Ok(default),
    }
}
