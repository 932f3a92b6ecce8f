// ABOUTME: HTTP route handler modules grouped by domain
// ABOUTME: Each submodule exposes a routes() constructor merged into the server router
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP route handlers.
//!
//! Each submodule owns one slice of the API surface and exposes a
//! `routes(resources)` constructor returning an `axum::Router`; the server
//! merges them into the single application router.

pub mod chat;
pub mod export;
pub mod health;
pub mod prompts;

pub use chat::ChatRoutes;
pub use export::ExportRoutes;
pub use health::HealthRoutes;
pub use prompts::PromptRoutes;
