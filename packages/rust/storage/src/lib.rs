//! libSQL-backed graph store.
//!
//! The [`Storage`] struct wraps a libSQL database (local file or remote
//! server) holding question/answer/keyword nodes and their edges.
//!
//! Every write-plan runs on its own connection inside one IMMEDIATE
//! transaction; the connection is released when the call returns, so no
//! session is held across requests.

mod migrations;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database, TransactionBehavior, params};
use tracing::{debug, instrument};

use mindgraph_shared::{
    GraphEdge, GraphNode, GraphStore, MindGraphError, NodeId, NodeKind, Relation, Result, WriteOp,
    WritePlan,
};

/// How long a local connection waits on a competing writer.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    db: Database,
    local: bool,
}

/// A node as stored, with its creation timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredNode {
    pub node: GraphNode,
    pub created_at: DateTime<Utc>,
}

fn db_err(e: libsql::Error) -> MindGraphError {
    MindGraphError::Persistence(e.to_string())
}

impl Storage {
    /// Open or create a local database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| MindGraphError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;

        let storage = Self { db, local: true };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Connect to a remote libSQL server.
    pub async fn open_remote(url: &str, auth_token: &str) -> Result<Self> {
        let db = libsql::Builder::new_remote(url.to_string(), auth_token.to_string())
            .build()
            .await
            .map_err(db_err)?;

        let storage = Self { db, local: false };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Acquire a fresh connection.
    async fn connect(&self) -> Result<Connection> {
        let conn = self.db.connect().map_err(db_err)?;
        conn.execute_batch(&connection_pragmas(self.local))
            .await
            .map_err(db_err)?;
        Ok(conn)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let conn = self.connect().await?;
        let current_version = schema_version(&conn).await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                conn.execute_batch(migration.sql).await.map_err(|e| {
                    MindGraphError::Persistence(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Apply a write-plan atomically.
    ///
    /// Ops run in plan order. The first failing op rolls the whole
    /// transaction back, so a plan is either fully visible or not at all.
    #[instrument(skip_all, fields(ops = plan.ops.len()))]
    pub async fn execute_plan(&self, plan: &WritePlan) -> Result<()> {
        let conn = self.connect().await?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await
            .map_err(db_err)?;

        let created_at = plan.created_at.to_rfc3339();
        for op in &plan.ops {
            if let Err(e) = apply_op(&tx, op, &created_at).await {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                return Err(e);
            }
        }

        tx.commit().await.map_err(db_err)?;
        debug!("write-plan committed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Get a node by id.
    pub async fn node(&self, id: &NodeId) -> Result<Option<StoredNode>> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query(
                "SELECT id, label, kind, created_at FROM nodes WHERE id = ?1",
                params![id.as_str()],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_stored_node(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    /// Edges leaving `id`, in insertion order.
    pub async fn edges_from(&self, id: &NodeId) -> Result<Vec<(GraphEdge, Relation)>> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query(
                "SELECT source_id, target_id, relation FROM edges WHERE source_id = ?1 ORDER BY id",
                params![id.as_str()],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            let source: String = row.get(0).map_err(db_err)?;
            let target: String = row.get(1).map_err(db_err)?;
            let relation: String = row.get(2).map_err(db_err)?;
            let relation = match relation.as_str() {
                "HAS_ANSWER" => Relation::HasAnswer,
                "HAS_KEYWORD" => Relation::HasKeyword,
                other => {
                    return Err(MindGraphError::Persistence(format!(
                        "unknown relation in store: {other}"
                    )));
                }
            };
            results.push((
                GraphEdge {
                    source: NodeId(source),
                    target: NodeId(target),
                },
                relation,
            ));
        }
        Ok(results)
    }

    /// Total number of stored nodes.
    pub async fn count_nodes(&self) -> Result<u64> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query("SELECT COUNT(*) FROM nodes", params![])
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(row.get::<i64>(0).map_err(db_err)? as u64),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl GraphStore for Storage {
    async fn execute_transaction(&self, plan: &WritePlan) -> Result<()> {
        self.execute_plan(plan).await
    }
}

/// Per-connection settings. Edge references are enforced on every
/// connection; the busy timeout only matters for local file locking.
fn connection_pragmas(local: bool) -> String {
    let mut pragmas = String::from("PRAGMA foreign_keys = ON;");
    if local {
        pragmas.push_str(&format!(" PRAGMA busy_timeout = {};", BUSY_TIMEOUT.as_millis()));
    }
    pragmas
}

/// Get the current schema version, or 0 if no migrations have been applied.
async fn schema_version(conn: &Connection) -> u32 {
    let result = conn
        .query("SELECT MAX(version) FROM schema_migrations", params![])
        .await;

    match result {
        Ok(mut rows) => {
            if let Ok(Some(row)) = rows.next().await {
                row.get::<u32>(0).unwrap_or(0)
            } else {
                0
            }
        }
        Err(_) => 0, // Table doesn't exist yet
    }
}

/// Execute a single plan op on an open transaction.
async fn apply_op(conn: &Connection, op: &WriteOp, created_at: &str) -> Result<()> {
    match op {
        WriteOp::CreateNode(node) => {
            conn.execute(
                "INSERT INTO nodes (id, label, kind, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    node.id.as_str(),
                    node.label.as_str(),
                    node.kind.as_str(),
                    created_at
                ],
            )
            .await
            .map_err(|e| MindGraphError::Persistence(format!("create node {}: {e}", node.id)))?;
        }
        WriteOp::CreateEdge { edge, relation } => {
            conn.execute(
                "INSERT INTO edges (source_id, target_id, relation, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    edge.source.as_str(),
                    edge.target.as_str(),
                    relation.as_str(),
                    created_at
                ],
            )
            .await
            .map_err(|e| {
                MindGraphError::Persistence(format!(
                    "create edge {} -> {}: {e}",
                    edge.source, edge.target
                ))
            })?;
        }
    }
    Ok(())
}

/// Convert a database row to a [`StoredNode`].
fn row_to_stored_node(row: &libsql::Row) -> Result<StoredNode> {
    let kind: String = row.get(2).map_err(db_err)?;
    let created_at: String = row.get(3).map_err(db_err)?;

    Ok(StoredNode {
        node: GraphNode {
            id: NodeId(row.get::<String>(0).map_err(db_err)?),
            label: row.get::<String>(1).map_err(db_err)?,
            kind: kind
                .parse::<NodeKind>()
                .map_err(MindGraphError::Persistence)?,
        },
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| MindGraphError::Persistence(format!("invalid date: {e}")))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use uuid::Uuid;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("mg_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn node(id: &str, label: &str, kind: NodeKind) -> GraphNode {
        GraphNode {
            id: NodeId::from(id),
            label: label.into(),
            kind,
        }
    }

    fn edge(source: &str, target: &str, relation: Relation) -> WriteOp {
        WriteOp::CreateEdge {
            edge: GraphEdge {
                source: NodeId::from(source),
                target: NodeId::from(target),
            },
            relation,
        }
    }

    /// question → answer → one keyword per label, with ids prefixed by `tag`.
    fn plan(tag: &str, keywords: &[&str]) -> WritePlan {
        let q = format!("{tag}-q");
        let a = format!("{tag}-a");
        let mut ops = vec![
            WriteOp::CreateNode(node(&q, "What is a BST?", NodeKind::Question)),
            WriteOp::CreateNode(node(&a, "A sorted binary tree.", NodeKind::Answer)),
            edge(&q, &a, Relation::HasAnswer),
        ];
        for (i, kw) in keywords.iter().enumerate() {
            let k = format!("{tag}-k{i}");
            ops.push(WriteOp::CreateNode(node(&k, kw, NodeKind::Keyword)));
            ops.push(edge(&a, &k, Relation::HasKeyword));
        }
        WritePlan {
            created_at: Utc::now(),
            ops,
        }
    }

    #[test]
    fn foreign_keys_enforced_for_local_and_remote() {
        let remote = connection_pragmas(false);
        assert!(remote.contains("foreign_keys = ON"));
        assert!(!remote.contains("busy_timeout"));

        let local = connection_pragmas(true);
        assert!(local.contains("foreign_keys = ON"));
        assert!(local.contains("busy_timeout = 5000"));
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        let conn = storage.connect().await.unwrap();
        assert_eq!(schema_version(&conn).await, 1);
        assert_eq!(storage.count_nodes().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn reopen_does_not_reapply_migrations() {
        let tmp = std::env::temp_dir().join(format!("mg_test_{}.db", Uuid::now_v7()));
        let first = Storage::open(&tmp).await.expect("first open");
        first.execute_plan(&plan("p", &["tree"])).await.unwrap();
        drop(first);

        let second = Storage::open(&tmp).await.expect("second open");
        assert_eq!(second.count_nodes().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn plan_is_persisted_in_full() {
        let storage = test_storage().await;
        let plan = plan("p", &["binary search tree", "ordering"]);
        storage.execute_plan(&plan).await.expect("execute plan");

        assert_eq!(storage.count_nodes().await.unwrap(), 4);

        let stored = storage
            .node(&NodeId::from("p-q"))
            .await
            .unwrap()
            .expect("question stored");
        assert_eq!(stored.node.kind, NodeKind::Question);
        assert_eq!(stored.node.label, "What is a BST?");
        assert_eq!(stored.created_at.timestamp(), plan.created_at.timestamp());

        let from_answer = storage.edges_from(&NodeId::from("p-a")).await.unwrap();
        assert_eq!(from_answer.len(), 2);
        assert!(from_answer.iter().all(|(_, r)| *r == Relation::HasKeyword));
        assert_eq!(from_answer[0].0.target, NodeId::from("p-k0"));

        let from_question = storage.edges_from(&NodeId::from("p-q")).await.unwrap();
        assert_eq!(from_question.len(), 1);
        assert_eq!(from_question[0].1, Relation::HasAnswer);
    }

    #[tokio::test]
    async fn nodes_share_plan_timestamp() {
        let storage = test_storage().await;
        let plan = plan("t", &["a", "b"]);
        storage.execute_plan(&plan).await.unwrap();

        let mut stamps = Vec::new();
        for id in plan.nodes().map(|n| n.id.clone()) {
            stamps.push(storage.node(&id).await.unwrap().unwrap().created_at);
        }
        assert!(stamps.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn failing_op_rolls_back_whole_plan() {
        let storage = test_storage().await;
        let mut plan = plan("r", &["one", "two"]);
        // Reuse the first keyword id: the primary key rejects it mid-plan.
        plan.ops
            .push(WriteOp::CreateNode(node("r-k0", "dup", NodeKind::Keyword)));

        let err = storage.execute_plan(&plan).await.unwrap_err();
        assert!(matches!(err, MindGraphError::Persistence(_)));
        assert_eq!(storage.count_nodes().await.unwrap(), 0);
        assert!(storage.node(&NodeId::from("r-q")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dangling_edge_is_rejected() {
        let storage = test_storage().await;
        let plan = WritePlan {
            created_at: Utc::now(),
            ops: vec![
                WriteOp::CreateNode(node("d-q", "q", NodeKind::Question)),
                edge("d-q", "missing", Relation::HasAnswer),
            ],
        };

        let err = storage.execute_plan(&plan).await.unwrap_err();
        assert!(matches!(err, MindGraphError::Persistence(_)));
        assert_eq!(storage.count_nodes().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_plans_do_not_interfere() {
        let storage = Arc::new(test_storage().await);

        let mut handles = Vec::new();
        for i in 0..8 {
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(async move {
                storage
                    .execute_transaction(&plan(&format!("c{i}"), &["x", "y", "z"]))
                    .await
            }));
        }
        for handle in handles {
            handle.await.expect("join").expect("plan committed");
        }

        assert_eq!(storage.count_nodes().await.unwrap(), 8 * 5);
    }

    #[tokio::test]
    async fn missing_node_is_none() {
        let storage = test_storage().await;
        assert!(storage.node(&NodeId::new()).await.unwrap().is_none());
        assert!(storage.edges_from(&NodeId::new()).await.unwrap().is_empty());
    }
}
