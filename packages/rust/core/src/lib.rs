//! Request-to-graph pipeline for MindGraph.
//!
//! Turns a question into a validated AI answer, a sanitized keyword set, and a
//! question → answer → keywords graph that is persisted and returned as-is.

pub mod graph;
pub mod keywords;
pub mod normalize;
pub mod pipeline;

pub use graph::{BuiltGraph, build_graph, build_graph_with};
pub use keywords::{MAX_KEYWORDS, sanitize_keywords};
pub use normalize::normalize_response;
pub use pipeline::{ChatOutcome, ChatPipeline, RequestStage, SYSTEM_INSTRUCTION};
