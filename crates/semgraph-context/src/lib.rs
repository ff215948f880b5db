//! Knowledge graph construction and context extraction from semantic-graph
//! snapshots.
//!
//! Merges per-file snapshots into one petgraph-backed graph, expands
//! bounded neighborhoods around seed nodes, and renders them for LLM
//! prompts as text, Markdown, or JSON.

pub mod expand;
pub mod graph;
pub mod loader;
pub mod output;
pub mod snapshot;
pub mod stats;

use std::path::Path;

use semgraph_core::{OutputFormat, ScgError};

use crate::expand::ContextSubgraph;
use crate::graph::KnowledgeGraph;
use crate::loader::LoadReport;

/// Load every JSON snapshot under `dir` into a fresh graph.
///
/// Unreadable snapshots are logged and skipped.
///
/// # Errors
///
/// Returns [`ScgError::FileNotFound`] if `dir` does not exist.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use semgraph_context::load_snapshot_dir;
///
/// let (graph, report) = load_snapshot_dir(Path::new("data/glide/.semanticgraphs"), "json").unwrap();
/// println!("{} nodes from {} files", graph.node_count(), report.files_loaded);
/// ```
pub fn load_snapshot_dir(
    dir: &Path,
    extension: &str,
) -> Result<(KnowledgeGraph, LoadReport), ScgError> {
    let reader = snapshot::read_snapshot_dir(dir, extension, &snapshot::JsonSnapshotDecoder)?;
    Ok(loader::load_snapshots(reader))
}

/// Render a context subgraph in the requested format.
///
/// # Errors
///
/// Returns [`ScgError::Serialization`] if JSON output fails.
pub fn format_context(
    subgraph: &ContextSubgraph,
    graph: &KnowledgeGraph,
    format: OutputFormat,
) -> Result<String, ScgError> {
    match format {
        OutputFormat::Text => Ok(output::render(subgraph, graph)),
        OutputFormat::Markdown => Ok(output::render_markdown(subgraph, graph)),
        OutputFormat::Json => output::render_json(subgraph),
    }
}
