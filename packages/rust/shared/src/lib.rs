//! Shared types, error model, and configuration for MindGraph.
//!
//! This crate is the foundation depended on by all other MindGraph crates.
//! It provides:
//! - [`MindGraphError`]: the unified error type
//! - Domain types ([`AiResult`], [`GraphNode`], [`GraphEdge`], [`GraphSnapshot`], [`WritePlan`])
//! - Collaborator seams ([`AnswerGenerator`], [`GraphStore`])
//! - Configuration ([`AppConfig`], config loading and startup validation)

pub mod backend;
pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use backend::{AnswerGenerator, GraphStore};
pub use config::{
    AppConfig, GeminiConfig, GraphStoreConfig, ServerConfig, config_dir, config_file_path,
    expand_home, init_config, init_config_at, load_config, load_config_from, resolve_api_key,
    resolve_store_token,
};
pub use error::{MindGraphError, Result};
pub use types::{
    AiResult, GraphEdge, GraphNode, GraphSnapshot, NodeId, NodeKind, Relation, WriteOp, WritePlan,
};
