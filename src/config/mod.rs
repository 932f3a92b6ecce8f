// ABOUTME: Configuration module organization for the chat server
// ABOUTME: Environment-based configuration is the single source of runtime settings
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration management

/// Environment-based server configuration
pub mod environment;

pub use environment::ServerConfig;
