use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::graph::KnowledgeGraph;

/// Label used for empty kinds and edge types.
const UNKNOWN: &str = "unknown";

/// Entries shown per histogram in the text rendering.
const TOP_N: usize = 5;

/// Size and shape summary of a loaded graph.
///
/// # Examples
///
/// ```
/// use semgraph_context::graph::KnowledgeGraph;
///
/// let mut graph = KnowledgeGraph::new();
/// graph.upsert_edge("A", "B", "CALL");
/// let stats = graph.stats();
/// assert_eq!(stats.vertices, 2);
/// assert_eq!(stats.edge_types, vec![("CALL".to_string(), 1)]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    /// Declared nodes.
    pub nodes: usize,
    /// Vertices, placeholders included.
    pub vertices: usize,
    /// Directed edges.
    pub edges: usize,
    /// Declared node count per kind, most common first.
    pub kinds: Vec<(String, usize)>,
    /// Edge count per type label, most common first.
    pub edge_types: Vec<(String, usize)>,
}

impl KnowledgeGraph {
    /// Summarize the graph.
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            nodes: self.node_count(),
            vertices: self.vertex_count(),
            edges: self.edge_count(),
            kinds: histogram(self.nodes().iter().map(|n| n.kind.as_str())),
            edge_types: histogram(self.edges().map(|(_, _, kind)| kind)),
        }
    }
}

fn histogram<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        let label = if label.is_empty() { UNKNOWN } else { label };
        *counts.entry(label).or_default() += 1;
    }
    let mut sorted: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(label, count)| (label.to_string(), count))
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted
}

fn write_top(f: &mut fmt::Formatter<'_>, title: &str, entries: &[(String, usize)]) -> fmt::Result {
    if entries.is_empty() {
        return Ok(());
    }
    let top = entries
        .iter()
        .take(TOP_N)
        .map(|(label, count)| format!("{label}:{count}"))
        .collect::<Vec<_>>()
        .join(", ");
    writeln!(f, "{title}: {top}")
}

impl fmt::Display for GraphStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Nodes: {} ({} vertices incl. undeclared)",
            self.nodes, self.vertices
        )?;
        writeln!(f, "Edges: {}", self.edges)?;
        write_top(f, "Kinds", &self.kinds)?;
        write_top(f, "Edge types", &self.edge_types)
    }
}
