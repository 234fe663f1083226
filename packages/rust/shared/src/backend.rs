//! Seams to the two external collaborators the pipeline talks to.
//!
//! Concrete implementations live in `mindgraph-gemini` and
//! `mindgraph-storage`; tests substitute in-process fakes.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::WritePlan;

/// Generative text backend.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Send `prompt` under `system_instruction` and return the raw text reply.
    ///
    /// Transport-level failures must surface as
    /// [`MindGraphError::AiTransport`](crate::MindGraphError::AiTransport).
    async fn generate(&self, prompt: &str, system_instruction: &str) -> Result<String>;
}

/// Graph persistence backend.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Apply every op in `plan` atomically: all of it commits or none of it.
    ///
    /// Failures must surface as
    /// [`MindGraphError::Persistence`](crate::MindGraphError::Persistence).
    async fn execute_transaction(&self, plan: &WritePlan) -> Result<()>;
}
