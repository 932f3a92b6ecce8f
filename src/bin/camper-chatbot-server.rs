// ABOUTME: Server binary wiring configuration, database, FAQ rules, and the LLM provider
// ABOUTME: Starts the customer support chat API for the camper van rental service
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Camper Chatbot Server Binary
//!
//! Loads configuration from the environment, connects the SQLite database,
//! compiles the FAQ rules, builds the Gemini provider, and serves the chat
//! API until ctrl-c.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use camper_chatbot::{
    config::environment::ServerConfig,
    database::Database,
    faq::FaqMatcher,
    llm::{GeminiProvider, LlmProvider},
    logging,
    quota::QuotaTracker,
    resources::ServerResources,
    server,
};
use clap::Parser;
use tracing::info;

#[derive(Parser)]
#[command(name = "camper-chatbot-server")]
#[command(about = "Customer support chat API for camper van rentals")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Override FAQ rule file path
    #[arg(long)]
    faq_path: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }
    if let Some(faq_path) = args.faq_path {
        config.faq_path = faq_path;
    }

    logging::init_from_env()?;

    info!("Starting camper chatbot server");
    info!("{}", config.summary());

    let database = Database::new(&config.database_url).await?;
    info!("Database initialized: {}", config.database_url);

    let quota = QuotaTracker::new(database.pool().clone(), config.daily_request_limit).await;

    let faq = FaqMatcher::from_file(&config.faq_path)?;

    let provider = GeminiProvider::new(
        config.gemini_api_key.clone(),
        Duration::from_secs(config.llm_timeout_secs),
    )?
    .with_default_model(config.gemini_model.clone());
    let provider: Arc<dyn LlmProvider> = Arc::new(provider);

    let resources = Arc::new(ServerResources::new(
        database,
        quota,
        faq,
        provider,
        Arc::new(config),
    ));
    resources.restore_active_prompt().await?;

    server::run(resources).await?;
    Ok(())
}
