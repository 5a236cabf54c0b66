//! # BabelDOC MCP
//!
//! A Model Context Protocol (MCP) server that lets AI agents translate PDF
//! documents with the BabelDOC pipeline while keeping the original layout.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Requests, page selectors, jobs and results
//! - [`providers`]: Translation backends and credential resolution
//! - [`utils`]: Request validation and Unicode path resolution
//! - [`pipeline`]: The external translation pipeline and a mock for tests
//! - [`dispatch`]: Bounded-concurrency job admission and output verification
//! - [`status`]: Status snapshots and result rendering
//! - [`bridge`]: Request-to-result entry point shared by the tools and the CLI
//! - [`mcp`]: MCP protocol implementation and server
//! - [`config`]: Configuration management

pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod mcp;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod status;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use bridge::TranslationBridge;
pub use error::{BridgeError, ToolError};
pub use models::{JobResult, ToolRequest};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
