//! Builds the question → answer → keywords graph for one interaction.
//!
//! The write-plan sent to the store and the snapshot returned to the caller
//! come from the same generated ids: the snapshot is read back out of the
//! plan rather than assembled separately.

use chrono::{DateTime, Utc};

use mindgraph_shared::{
    GraphEdge, GraphNode, GraphSnapshot, NodeId, NodeKind, Relation, WriteOp, WritePlan,
};

/// Persistence plan plus the caller-facing view of the same graph.
#[derive(Debug, Clone)]
pub struct BuiltGraph {
    pub plan: WritePlan,
    pub snapshot: GraphSnapshot,
}

/// Build the graph with random node ids and the current time.
pub fn build_graph(question: &str, answer: &str, keywords: &[String]) -> BuiltGraph {
    build_graph_with(question, answer, keywords, NodeId::new, Utc::now())
}

/// Build the graph with caller-supplied id generation and timestamp.
///
/// Plan order: question node, answer node, question→answer edge, then a
/// keyword node followed by its answer→keyword edge for each keyword.
pub fn build_graph_with(
    question: &str,
    answer: &str,
    keywords: &[String],
    mut next_id: impl FnMut() -> NodeId,
    created_at: DateTime<Utc>,
) -> BuiltGraph {
    let question_node = GraphNode {
        id: next_id(),
        label: question.to_string(),
        kind: NodeKind::Question,
    };
    let answer_node = GraphNode {
        id: next_id(),
        label: answer.to_string(),
        kind: NodeKind::Answer,
    };
    let answer_id = answer_node.id.clone();
    let has_answer = GraphEdge {
        source: question_node.id.clone(),
        target: answer_id.clone(),
    };

    let mut ops = Vec::with_capacity(3 + keywords.len() * 2);
    ops.push(WriteOp::CreateNode(question_node));
    ops.push(WriteOp::CreateNode(answer_node));
    ops.push(WriteOp::CreateEdge {
        edge: has_answer,
        relation: Relation::HasAnswer,
    });

    for keyword in keywords {
        let node = GraphNode {
            id: next_id(),
            label: keyword.clone(),
            kind: NodeKind::Keyword,
        };
        let edge = GraphEdge {
            source: answer_id.clone(),
            target: node.id.clone(),
        };
        ops.push(WriteOp::CreateNode(node));
        ops.push(WriteOp::CreateEdge {
            edge,
            relation: Relation::HasKeyword,
        });
    }

    let plan = WritePlan { created_at, ops };
    let snapshot = GraphSnapshot {
        nodes: plan.nodes().cloned().collect(),
        links: plan.edges().map(|(edge, _)| edge.clone()).collect(),
    };

    BuiltGraph { plan, snapshot }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn keywords(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn sequential_ids() -> impl FnMut() -> NodeId {
        let mut n = 0;
        move || {
            n += 1;
            NodeId(format!("n{n}"))
        }
    }

    #[test]
    fn node_order_and_kinds() {
        let built = build_graph(
            "What is a BST?",
            "A sorted binary tree.",
            &keywords(&["binary search tree", "ordering"]),
        );
        let kinds: Vec<_> = built.snapshot.nodes.iter().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Question,
                NodeKind::Answer,
                NodeKind::Keyword,
                NodeKind::Keyword
            ]
        );
        let labels: Vec<_> = built.snapshot.nodes.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["What is a BST?", "A sorted binary tree.", "binary search tree", "ordering"]
        );
    }

    #[test]
    fn cardinality_matches_keyword_count() {
        for k in 0..=7 {
            let kws: Vec<String> = (0..k).map(|i| format!("kw{i}")).collect();
            let built = build_graph("q", "a", &kws);
            let snap = &built.snapshot;
            let answer_id = &snap.nodes[1].id;

            assert_eq!(snap.nodes.len(), k + 2);
            assert_eq!(snap.links.len(), k + 1);
            assert_eq!(snap.links.iter().filter(|l| &l.target == answer_id).count(), 1);
            assert_eq!(snap.links.iter().filter(|l| &l.source == answer_id).count(), k);
        }
    }

    #[test]
    fn links_reference_existing_nodes() {
        let built = build_graph("q", "a", &keywords(&["x", "y", "z"]));
        let ids: HashSet<_> = built.snapshot.nodes.iter().map(|n| &n.id).collect();
        assert_eq!(ids.len(), built.snapshot.nodes.len(), "ids must be unique");
        for link in &built.snapshot.links {
            assert!(ids.contains(&link.source));
            assert!(ids.contains(&link.target));
        }
    }

    #[test]
    fn plan_and_snapshot_share_ids() {
        let built = build_graph("q", "a", &keywords(&["x", "y"]));
        let plan_nodes: Vec<_> = built.plan.nodes().cloned().collect();
        let plan_links: Vec<_> = built.plan.edges().map(|(e, _)| e.clone()).collect();
        assert_eq!(plan_nodes, built.snapshot.nodes);
        assert_eq!(plan_links, built.snapshot.links);
    }

    #[test]
    fn plan_op_sequence() {
        let ts = Utc::now();
        let built = build_graph_with("q", "a", &keywords(&["k1", "k2"]), sequential_ids(), ts);
        assert_eq!(built.plan.created_at, ts);

        let shape: Vec<String> = built
            .plan
            .ops
            .iter()
            .map(|op| match op {
                WriteOp::CreateNode(n) => format!("node:{}", n.id),
                WriteOp::CreateEdge { edge, relation } => {
                    format!("{}:{}->{}", relation.as_str(), edge.source, edge.target)
                }
            })
            .collect();
        assert_eq!(
            shape,
            vec![
                "node:n1",
                "node:n2",
                "HAS_ANSWER:n1->n2",
                "node:n3",
                "HAS_KEYWORD:n2->n3",
                "node:n4",
                "HAS_KEYWORD:n2->n4",
            ]
        );
    }

    #[test]
    fn separate_builds_never_share_ids() {
        let a = build_graph("q", "a", &keywords(&["x"]));
        let b = build_graph("q", "a", &keywords(&["x"]));
        let a_ids: HashSet<_> = a.snapshot.nodes.iter().map(|n| n.id.clone()).collect();
        assert!(b.snapshot.nodes.iter().all(|n| !a_ids.contains(&n.id)));
    }
}
