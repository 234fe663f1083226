//! Core domain types for a single question → answer → keywords interaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// NodeId
// ---------------------------------------------------------------------------

/// Opaque graph node identifier backed by a random (v4) UUID.
///
/// 122 random bits keep ids collision-free across concurrently running
/// requests without any coordination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// AiResult
// ---------------------------------------------------------------------------

/// A validated AI answer with its sanitized keyword list.
///
/// `answer` is never empty. `keywords` holds at most 7 case-insensitively
/// unique entries; it may hold fewer than 3 when sanitization removed them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiResult {
    pub answer: String,
    pub keywords: Vec<String>,
}

// ---------------------------------------------------------------------------
// Graph types
// ---------------------------------------------------------------------------

/// Role of a node within one interaction graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Question,
    Answer,
    Keyword,
}

impl NodeKind {
    /// Stable string form, shared by the wire format and the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::Answer => "answer",
            Self::Keyword => "keyword",
        }
    }
}

impl std::str::FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "question" => Ok(Self::Question),
            "answer" => Ok(Self::Answer),
            "keyword" => Ok(Self::Keyword),
            other => Err(format!("unknown node kind: {other}")),
        }
    }
}

/// A node as returned to API callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
}

/// A directed, attribute-free edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: NodeId,
    pub target: NodeId,
}

/// Relationship label carried by an edge in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relation {
    /// question → answer
    HasAnswer,
    /// answer → keyword
    HasKeyword,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HasAnswer => "HAS_ANSWER",
            Self::HasKeyword => "HAS_KEYWORD",
        }
    }
}

/// Node/edge structure returned to the caller.
///
/// Nodes are ordered `[question, answer, keyword...]`; links are ordered
/// `[question→answer, answer→keyword...]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphEdge>,
}

// ---------------------------------------------------------------------------
// WritePlan
// ---------------------------------------------------------------------------

/// A single creation instruction within a [`WritePlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    CreateNode(GraphNode),
    CreateEdge {
        edge: GraphEdge,
        relation: Relation,
    },
}

/// Ordered node/edge creations to apply in one atomic store transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePlan {
    /// Creation timestamp shared by every node in the plan.
    pub created_at: DateTime<Utc>,
    pub ops: Vec<WriteOp>,
}

impl WritePlan {
    /// Nodes created by this plan, in plan order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.ops.iter().filter_map(|op| match op {
            WriteOp::CreateNode(node) => Some(node),
            WriteOp::CreateEdge { .. } => None,
        })
    }

    /// Edges created by this plan, in plan order.
    pub fn edges(&self) -> impl Iterator<Item = (&GraphEdge, Relation)> {
        self.ops.iter().filter_map(|op| match op {
            WriteOp::CreateEdge { edge, relation } => Some((edge, *relation)),
            WriteOp::CreateNode(_) => None,
        })
    }
}
