//! The retrieval engine: a loaded graph plus the search side built over it.

use semgraph_context::expand::ContextSubgraph;
use semgraph_context::graph::KnowledgeGraph;
use semgraph_context::loader::{self, LoadReport};
use semgraph_context::{format_context, output};
use semgraph_core::{OutputFormat, ScgError, SnapshotFile};

use crate::encoder::Encoder;
use crate::search::{NodeHit, NodeSearch, SearchMode};

/// Graph retrieval over merged semantic-graph snapshots.
///
/// Everything is built in [`GraphRag::new`]; afterwards the engine is
/// read-only and can be shared across threads.
///
/// # Examples
///
/// ```
/// use semgraph_core::{EdgeRecord, NodeRecord, SnapshotFile};
/// use semgraph_lens::encoder::Encoder;
/// use semgraph_lens::rag::GraphRag;
///
/// let snapshot = SnapshotFile {
///     uri: "Lru.java".into(),
///     nodes: vec![NodeRecord {
///         id: "LruCache#".into(),
///         kind: "CLASS".into(),
///         display_name: Some("LruCache".into()),
///         edges: vec![EdgeRecord { to: "Map#".into(), kind: "EXTENDS".into() }],
///         ..NodeRecord::default()
///     }],
/// };
/// let rag = GraphRag::from_snapshots(vec![Ok(snapshot)], Encoder::Disabled);
///
/// let hits = rag.find("lru", 1).unwrap();
/// let seeds: Vec<&str> = hits.iter().map(|h| h.node.id.as_str()).collect();
/// let context = rag.render(&rag.expand(&seeds, 1));
/// assert!(context.contains("LruCache --[EXTENDS]--> Map#"));
/// ```
#[derive(Debug)]
pub struct GraphRag {
    graph: KnowledgeGraph,
    search: NodeSearch,
    report: LoadReport,
}

impl GraphRag {
    /// Build the engine over an already loaded graph.
    pub fn new(graph: KnowledgeGraph, encoder: Encoder) -> Self {
        let report = LoadReport {
            nodes: graph.node_count(),
            vertices: graph.vertex_count(),
            edges: graph.edge_count(),
            ..LoadReport::default()
        };
        Self::with_report(graph, report, encoder)
    }

    /// Load `snapshots` and build the engine over the result.
    ///
    /// Failed snapshots are logged and skipped; see
    /// [`semgraph_context::loader::GraphLoader::load`].
    pub fn from_snapshots<I>(snapshots: I, encoder: Encoder) -> Self
    where
        I: IntoIterator<Item = Result<SnapshotFile, ScgError>>,
    {
        let (graph, report) = loader::load_snapshots(snapshots);
        Self::with_report(graph, report, encoder)
    }

    fn with_report(graph: KnowledgeGraph, report: LoadReport, encoder: Encoder) -> Self {
        let search = NodeSearch::build(&graph, encoder);
        Self {
            graph,
            search,
            report,
        }
    }

    /// Rank nodes against `query`, returning at most `limit` hits.
    ///
    /// # Errors
    ///
    /// Returns [`ScgError::Embedding`] if the query cannot be encoded.
    pub fn find(&self, query: &str, limit: usize) -> Result<Vec<NodeHit>, ScgError> {
        self.search.find(&self.graph, query, limit)
    }

    /// Neighborhood of `seeds` within `hops` rounds.
    pub fn expand<S: AsRef<str>>(&self, seeds: &[S], hops: usize) -> ContextSubgraph {
        self.graph.expand(seeds, hops)
    }

    /// Render `subgraph` as the plain-text context block.
    pub fn render(&self, subgraph: &ContextSubgraph) -> String {
        output::render(subgraph, &self.graph)
    }

    /// Render `subgraph` in `format`.
    ///
    /// # Errors
    ///
    /// Returns [`ScgError::Serialization`] if JSON output fails.
    pub fn format(&self, subgraph: &ContextSubgraph, format: OutputFormat) -> Result<String, ScgError> {
        format_context(subgraph, &self.graph, format)
    }

    /// The merged graph.
    pub fn graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    /// Search strategy in use.
    pub fn mode(&self) -> SearchMode {
        self.search.mode()
    }

    /// Summary of the load that produced the graph.
    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }
}

#[cfg(test)]
mod tests {
    use semgraph_core::{EdgeRecord, NodeRecord};

    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn engine_is_send_and_sync() {
        assert_send_sync::<GraphRag>();
    }

    fn snapshot() -> SnapshotFile {
        SnapshotFile {
            uri: "Cache.java".into(),
            nodes: vec![
                NodeRecord {
                    id: "Pool#".into(),
                    kind: "CLASS".into(),
                    display_name: Some("Pool".into()),
                    ..NodeRecord::default()
                },
                NodeRecord {
                    id: "LruCache#".into(),
                    kind: "CLASS".into(),
                    display_name: Some("LruCache".into()),
                    edges: vec![EdgeRecord {
                        to: "Pool#".into(),
                        kind: "CALL".into(),
                    }],
                    ..NodeRecord::default()
                },
            ],
        }
    }

    #[test]
    fn new_reports_graph_counts() {
        let (graph, _) = loader::load_snapshots(vec![Ok(snapshot())]);
        let rag = GraphRag::new(graph, Encoder::Disabled);
        let report = rag.load_report();
        assert_eq!(report.nodes, 2);
        assert_eq!(report.edges, 1);
        assert_eq!(report.files_loaded, 0);
    }

    #[test]
    fn from_snapshots_keeps_loader_report() {
        let rag = GraphRag::from_snapshots(
            vec![Ok(snapshot()), Err(ScgError::Config("bad".into()))],
            Encoder::Disabled,
        );
        assert_eq!(rag.load_report().files_loaded, 1);
        assert_eq!(rag.load_report().files_skipped, 1);
        assert_eq!(rag.mode(), SearchMode::Keyword);
    }

    #[test]
    fn format_matches_render_for_text() {
        let rag = GraphRag::from_snapshots(vec![Ok(snapshot())], Encoder::Disabled);
        let ctx = rag.expand(&["LruCache#"], 1);
        assert_eq!(rag.format(&ctx, OutputFormat::Text).unwrap(), rag.render(&ctx));
        assert!(rag.render(&ctx).contains("  - LruCache --[CALL]--> Pool\n"));
    }
}
