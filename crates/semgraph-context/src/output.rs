use std::fmt::Write;

use semgraph_core::ScgError;

use crate::expand::ContextSubgraph;
use crate::graph::{KnowledgeGraph, NodeMeta};

/// Render a context subgraph as plain text for an LLM prompt.
///
/// Nodes are grouped by kind in order of each kind's first appearance.
/// Relationship endpoints resolve to display names through `graph`, falling
/// back to the raw id for undeclared vertices.
///
/// # Examples
///
/// ```
/// use semgraph_context::expand::ContextSubgraph;
/// use semgraph_context::graph::KnowledgeGraph;
/// use semgraph_context::output::render;
///
/// let text = render(&ContextSubgraph::default(), &KnowledgeGraph::new());
/// assert!(text.starts_with("CODEBASE CONTEXT:"));
/// assert!(text.contains("Relationships:"));
/// ```
pub fn render(subgraph: &ContextSubgraph, graph: &KnowledgeGraph) -> String {
    let mut out = String::from("CODEBASE CONTEXT:\n\nEntities:\n");

    for (kind, nodes) in group_by_kind(&subgraph.nodes) {
        let _ = writeln!(out, "  [{kind}]");
        for node in nodes {
            let _ = writeln!(out, "    - {} (ID: {})", node.label(), node.id);
        }
    }

    out.push_str("\nRelationships:\n");
    for edge in &subgraph.edges {
        let _ = writeln!(
            out,
            "  - {} --[{}]--> {}",
            endpoint_label(graph, &edge.source),
            edge.kind,
            endpoint_label(graph, &edge.target)
        );
    }

    out
}

/// Render a context subgraph as Markdown.
///
/// # Examples
///
/// ```
/// use semgraph_context::expand::ContextSubgraph;
/// use semgraph_context::graph::KnowledgeGraph;
/// use semgraph_context::output::render_markdown;
///
/// let md = render_markdown(&ContextSubgraph::default(), &KnowledgeGraph::new());
/// assert!(md.contains("# Codebase Context"));
/// ```
pub fn render_markdown(subgraph: &ContextSubgraph, graph: &KnowledgeGraph) -> String {
    let mut out = String::from("# Codebase Context\n\n");

    for (kind, nodes) in group_by_kind(&subgraph.nodes) {
        let _ = writeln!(out, "## {kind}\n");
        for node in nodes {
            let _ = writeln!(out, "- **{}** `{}`", node.label(), node.id);
        }
        out.push('\n');
    }

    if !subgraph.edges.is_empty() {
        out.push_str("## Relationships\n\n");
        for edge in &subgraph.edges {
            let _ = writeln!(
                out,
                "- {} `{}` {}",
                endpoint_label(graph, &edge.source),
                edge.kind,
                endpoint_label(graph, &edge.target)
            );
        }
    }

    out
}

/// Serialize a context subgraph as pretty JSON.
///
/// # Errors
///
/// Returns [`ScgError::Serialization`] if serialization fails.
pub fn render_json(subgraph: &ContextSubgraph) -> Result<String, ScgError> {
    serde_json::to_string_pretty(subgraph).map_err(ScgError::from)
}

fn group_by_kind(nodes: &[NodeMeta]) -> Vec<(&str, Vec<&NodeMeta>)> {
    let mut groups: Vec<(&str, Vec<&NodeMeta>)> = Vec::new();
    for node in nodes {
        match groups.iter().position(|(kind, _)| *kind == node.kind) {
            Some(i) => groups[i].1.push(node),
            None => groups.push((node.kind.as_str(), vec![node])),
        }
    }
    groups
}

/// Declared endpoints print their display name as-is, even when empty. Only
/// an endpoint with no metadata falls back to its id.
fn endpoint_label<'a>(graph: &'a KnowledgeGraph, id: &'a str) -> &'a str {
    graph
        .node(id)
        .map_or(id, |node| node.display_name.as_deref().unwrap_or_default())
}
