// ABOUTME: Main library entry point for the camper-van rental support chat server
// ABOUTME: Provides FAQ matching, LLM fallback, quota tracking, and prompt versioning
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![deny(unsafe_code)]

//! # Camper Chatbot Server
//!
//! A customer-support chat backend for a camper-van rental business. Incoming
//! questions are answered from a configured FAQ rule set when possible and
//! fall back to a Gemini conversation otherwise, gated by a daily request
//! quota. Every exchange is logged for the usage dashboard, and the LLM's
//! system instruction is assembled from versioned prompt content managed
//! through the admin editor API.
//!
//! ## Architecture
//!
//! - **`faq`**: ordered rule set with first-match-wins resolution
//! - **`quota`**: daily LLM call ceiling with calendar-day rollover
//! - **`sessions`**: bounded per-user multi-turn conversation store
//! - **`prompt`**: structured prompt content and instruction assembly
//! - **`llm`**: provider abstraction and the Gemini client
//! - **`database`**: SQLite persistence for logs, quota, and prompt versions
//! - **`routes`**: axum HTTP handlers per domain

/// Server configuration management
pub mod config;

/// SQLite persistence for conversation logs, quota state, and prompt versions
pub mod database;

/// Unified error handling with standard error codes and HTTP responses
pub mod errors;

/// FAQ rule loading and first-match-wins resolution
pub mod faq;

/// LLM provider abstraction and the Gemini implementation
pub mod llm;

/// Structured logging setup
pub mod logging;

/// Prompt content model and instruction assembly
pub mod prompt;

/// Daily LLM request quota tracking
pub mod quota;

/// Shared dependency container handed to route handlers
pub mod resources;

/// HTTP route handlers organized by domain
pub mod routes;

/// HTTP server assembly and lifecycle
pub mod server;

/// Bounded per-user conversation session store
pub mod sessions;
