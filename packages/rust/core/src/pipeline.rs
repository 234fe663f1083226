//! Chat pipeline: question → AI → normalize → graph → persist → response.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use mindgraph_shared::{AnswerGenerator, GraphSnapshot, GraphStore, MindGraphError, Result};

use crate::graph::build_graph;
use crate::normalize::normalize_response;

/// Instruction sent with every question.
pub const SYSTEM_INSTRUCTION: &str = "You are a concise assistant for a 3D knowledge map. \
Answer in 1-3 short sentences. \
Return 3-7 short keyword phrases that capture the core concepts, with no duplicates. \
Respond only with valid JSON using this schema:\n\
{\"answer\": \"...\", \"keywords\": [\"...\", \"...\"]}\n";

/// Default bound on a single AI call.
const DEFAULT_AI_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle of one request. Each stage is entered only after the previous
/// one succeeded, so on failure the current stage is the one that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStage {
    Received,
    AiCalled,
    Normalized,
    GraphBuilt,
    Persisted,
    Responded,
}

impl RequestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::AiCalled => "ai_called",
            Self::Normalized => "normalized",
            Self::GraphBuilt => "graph_built",
            Self::Persisted => "persisted",
            Self::Responded => "responded",
        }
    }
}

/// Fully populated result of a successful request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub question: String,
    pub answer: String,
    pub keywords: Vec<String>,
    pub graph: GraphSnapshot,
}

/// Stateless per-request orchestrator over the two collaborators.
#[derive(Clone)]
pub struct ChatPipeline {
    generator: Arc<dyn AnswerGenerator>,
    store: Arc<dyn GraphStore>,
    ai_timeout: Duration,
}

impl ChatPipeline {
    pub fn new(generator: Arc<dyn AnswerGenerator>, store: Arc<dyn GraphStore>) -> Self {
        Self {
            generator,
            store,
            ai_timeout: DEFAULT_AI_TIMEOUT,
        }
    }

    /// Override the bound on the AI call.
    pub fn with_ai_timeout(mut self, timeout: Duration) -> Self {
        self.ai_timeout = timeout;
        self
    }

    /// Run one request end to end.
    ///
    /// Nothing is persisted unless the AI call and normalization succeed, and
    /// nothing is returned unless the write-plan committed.
    #[instrument(skip_all, fields(message_len = message.len()))]
    pub async fn run(&self, message: &str) -> Result<ChatOutcome> {
        let mut stage = RequestStage::Received;
        match self.run_stages(message, &mut stage).await {
            Ok(outcome) => {
                info!(
                    keywords = outcome.keywords.len(),
                    nodes = outcome.graph.nodes.len(),
                    "chat request completed"
                );
                Ok(outcome)
            }
            Err(e) => {
                warn!(stage = stage.as_str(), error = %e, "chat request failed");
                Err(e)
            }
        }
    }

    async fn run_stages(&self, message: &str, stage: &mut RequestStage) -> Result<ChatOutcome> {
        let question = message.trim();
        if question.is_empty() {
            return Err(MindGraphError::validation("message must not be empty"));
        }

        enter(stage, RequestStage::AiCalled);
        let raw = tokio::time::timeout(
            self.ai_timeout,
            self.generator.generate(question, SYSTEM_INSTRUCTION),
        )
        .await
        .map_err(|_| {
            MindGraphError::AiTransport(format!(
                "AI call timed out after {}s",
                self.ai_timeout.as_secs_f32()
            ))
        })?
        .map_err(into_ai_transport)?;

        enter(stage, RequestStage::Normalized);
        let ai = normalize_response(&raw)?;

        enter(stage, RequestStage::GraphBuilt);
        let built = build_graph(question, &ai.answer, &ai.keywords);

        enter(stage, RequestStage::Persisted);
        self.store
            .execute_transaction(&built.plan)
            .await
            .map_err(into_persistence)?;

        enter(stage, RequestStage::Responded);
        Ok(ChatOutcome {
            question: question.to_string(),
            answer: ai.answer,
            keywords: ai.keywords,
            graph: built.snapshot,
        })
    }
}

/// Move to the stage about to be attempted.
fn enter(stage: &mut RequestStage, next: RequestStage) {
    debug!(from = stage.as_str(), to = next.as_str(), "request stage");
    *stage = next;
}

/// Keep generator failures within the AI transport kind.
fn into_ai_transport(e: MindGraphError) -> MindGraphError {
    match e {
        MindGraphError::AiTransport(_) => e,
        other => MindGraphError::AiTransport(other.to_string()),
    }
}

/// Keep store failures within the persistence kind.
fn into_persistence(e: MindGraphError) -> MindGraphError {
    match e {
        MindGraphError::Persistence(_) => e,
        other => MindGraphError::Persistence(other.to_string()),
    }
}
