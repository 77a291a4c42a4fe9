//! # Code Insight - incremental code summaries and question answering
//!
//! Code Insight keeps a natural-language summary of every function, class and
//! method in a Python project, indexes the summaries for semantic retrieval and
//! answers questions about the code from them. It is exposed as a library, a CLI
//! and a Model Context Protocol (MCP) server.
//!
//! ## Overview
//!
//! Each ingestion run compares structural fingerprints of the project against the
//! snapshot stored by the previous run. Only units whose structure changed are sent
//! to the language model, and the search index receives a delete-then-insert update
//! for exactly those units. The snapshot is written last, so a failed run leaves the
//! previous state untouched and can simply be retried.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐      ┌──────────────────┐
//! │   MCP Client    │      │       CLI        │
//! └────────┬────────┘      └────────┬─────────┘
//!          │ stdio                  │
//! ┌────────▼────────────────────────▼─────────┐
//! │              InsightClient                │
//! └──┬──────────┬──────────┬──────────┬───────┘
//!    │          │          │          │
//! ┌──▼────┐ ┌───▼────┐ ┌───▼─────┐ ┌──▼─────────┐
//! │Scanner│ │Changes │ │Summari- │ │ LanceDB +  │
//! │Parser │ │Detector│ │zer (LLM)│ │ FastEmbed  │
//! └───────┘ └────────┘ └─────────┘ └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`client`]: The ingestion pipeline and the query path
//! - [`indexer`]: File walking, Python parsing and structural fingerprints
//! - [`changes`]: Snapshot comparison producing unit change records
//! - [`summarizer`]: Bounded, paced summary generation
//! - [`reconcile`]: Applying changes to the summary store and the index
//! - [`llm`]: Language model clients (Gemini, OpenAI-compatible)
//! - [`embedding`]: Embedding generation using FastEmbed
//! - [`vector_db`]: Vector index abstraction (LanceDB and in-memory)
//! - [`mcp_server`]: MCP tools and prompts
//!
//! ## Usage Example
//!
//! ```no_run
//! use code_insight::mcp_server::InsightMcpServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = InsightMcpServer::new().await?;
//!     server.serve_stdio().await?;
//!     Ok(())
//! }
//! ```

/// Snapshot comparison producing per-unit change records
pub mod changes;

/// Library client running ingestion and queries
pub mod client;

/// Configuration management with environment variable overrides
pub mod config;

/// Embedding generation using FastEmbed
pub mod embedding;

/// Error types and utilities
pub mod error;

/// File walking, Python parsing and structural hashing
pub mod indexer;

/// Language model clients
pub mod llm;

/// MCP server implementation with tools and prompts
pub mod mcp_server;

/// Platform paths for configuration and per-project state
pub mod paths;

/// Turning detected changes into store and index updates
pub mod reconcile;

/// Persisted structural fingerprints
pub mod snapshot;

mod state_file;

/// Summary generation with bounded concurrency
pub mod summarizer;

/// Persisted per-project summaries
pub mod summary_store;

/// Request/response types with JSON schema definitions
pub mod types;

/// Vector index abstraction supporting LanceDB and an in-memory backend
pub mod vector_db;

pub use client::InsightClient;
pub use config::Config;
pub use error::InsightError;
pub use types::*;
