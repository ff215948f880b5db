//! Breadth-first neighborhood extraction.

use std::collections::HashSet;

use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use tracing::debug;

use crate::graph::{KnowledgeGraph, NodeMeta};

/// A typed edge inside a [`ContextSubgraph`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextEdge {
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Relationship label.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Bounded neighborhood around a seed set.
///
/// `nodes` holds only declared nodes; `edges` may reference placeholder
/// vertices that have no entry in `nodes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContextSubgraph {
    /// Declared nodes in discovery order.
    pub nodes: Vec<NodeMeta>,
    /// Edges with both endpoints inside the neighborhood.
    pub edges: Vec<ContextEdge>,
}

impl ContextSubgraph {
    /// Whether the subgraph has neither nodes nor edges.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Ids of the listed nodes, in order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.nodes.iter().map(|n| n.id.as_str())
    }
}

impl KnowledgeGraph {
    /// Collect every vertex within `hops` undirected steps of `seeds`.
    ///
    /// Each round only expands the vertices added by the previous round.
    /// Seeds missing from the graph are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use semgraph_core::{EdgeRecord, NodeRecord, SnapshotFile};
    /// use semgraph_context::loader::load_snapshots;
    ///
    /// let record = |id: &str, to: &str| NodeRecord {
    ///     id: id.into(),
    ///     kind: "CLASS".into(),
    ///     edges: vec![EdgeRecord { to: to.into(), kind: "CALL".into() }],
    ///     ..NodeRecord::default()
    /// };
    /// // targets are declared before the edges that point at them
    /// let snapshot = SnapshotFile {
    ///     uri: "chain.java".into(),
    ///     nodes: vec![record("C", "D"), record("B", "C"), record("A", "B")],
    /// };
    /// let (graph, _) = load_snapshots(vec![Ok(snapshot)]);
    ///
    /// let ctx = graph.expand(&["A"], 2);
    /// let ids: Vec<&str> = ctx.node_ids().collect();
    /// assert_eq!(ids, vec!["A", "B", "C"]);
    /// assert_eq!(ctx.edges.len(), 2);
    /// ```
    pub fn expand<S: AsRef<str>>(&self, seeds: &[S], hops: usize) -> ContextSubgraph {
        let graph = self.inner();
        let mut included = HashSet::new();
        let mut order = Vec::new();

        for seed in seeds {
            let seed = seed.as_ref();
            match self.vertex(seed) {
                Some(idx) => {
                    if included.insert(idx) {
                        order.push(idx);
                    }
                }
                None => debug!("ignoring unknown seed id {seed}"),
            }
        }

        let mut frontier = order.clone();
        for _ in 0..hops {
            if frontier.is_empty() {
                break;
            }
            let mut next = Vec::new();
            for &idx in &frontier {
                for neighbor in graph.neighbors_undirected(idx) {
                    if included.insert(neighbor) {
                        next.push(neighbor);
                        order.push(neighbor);
                    }
                }
            }
            frontier = next;
        }

        let nodes = order
            .iter()
            .filter_map(|&idx| self.node(&graph[idx]).cloned())
            .collect();

        let mut edges = Vec::new();
        for &idx in &order {
            for edge in graph.edges_directed(idx, Direction::Outgoing) {
                if included.contains(&edge.target()) {
                    edges.push(ContextEdge {
                        source: graph[edge.source()].clone(),
                        target: graph[edge.target()].clone(),
                        kind: edge.weight().clone(),
                    });
                }
            }
        }

        ContextSubgraph { nodes, edges }
    }
}
