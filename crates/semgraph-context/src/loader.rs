//! Merge snapshot records into one [`KnowledgeGraph`].

use semgraph_core::{ScgError, SnapshotFile};
use serde::Serialize;
use tracing::{info, warn};

use crate::graph::{KnowledgeGraph, NodeMeta};

/// Counters describing one load run.
///
/// # Examples
///
/// ```
/// use semgraph_context::loader::LoadReport;
///
/// let report = LoadReport::default();
/// assert_eq!(report.files_loaded, 0);
/// assert_eq!(report.files_skipped, 0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    /// Snapshots merged into the graph.
    pub files_loaded: usize,
    /// Snapshots skipped because they could not be read or decoded.
    pub files_skipped: usize,
    /// Declared nodes after loading.
    pub nodes: usize,
    /// Vertices after loading, placeholders included.
    pub vertices: usize,
    /// Directed edges after loading.
    pub edges: usize,
}

/// Incremental builder that merges snapshots into a shared graph.
///
/// # Examples
///
/// ```
/// use semgraph_core::{EdgeRecord, NodeRecord, SnapshotFile};
/// use semgraph_context::loader::GraphLoader;
///
/// let snapshot = SnapshotFile {
///     uri: "A.java".into(),
///     nodes: vec![NodeRecord {
///         id: "A".into(),
///         kind: "CLASS".into(),
///         edges: vec![EdgeRecord { to: "B".into(), kind: "CALL".into() }],
///         ..NodeRecord::default()
///     }],
/// };
///
/// let mut loader = GraphLoader::new();
/// loader.merge(&snapshot);
/// let (graph, report) = loader.finish();
/// assert_eq!(report.nodes, 1);
/// assert_eq!(report.vertices, 2);
/// assert_eq!(graph.edge_kind("A", "B"), Some("CALL"));
/// ```
#[derive(Debug, Default)]
pub struct GraphLoader {
    graph: KnowledgeGraph,
    files_loaded: usize,
    files_skipped: usize,
}

impl GraphLoader {
    /// Start from an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one decoded snapshot.
    ///
    /// Ids with no vertex yet get their metadata registered. Known ids,
    /// including placeholders created by an earlier edge, are left as they
    /// are. Every outgoing edge is applied either way.
    pub fn merge(&mut self, snapshot: &SnapshotFile) {
        for record in &snapshot.nodes {
            self.graph
                .register(NodeMeta::from_record(record, &snapshot.uri));
            for edge in &record.edges {
                self.graph.upsert_edge(&record.id, &edge.to, &edge.kind);
            }
        }
        self.files_loaded += 1;
    }

    /// Merge every readable snapshot, logging and skipping failures.
    pub fn load<I>(&mut self, snapshots: I)
    where
        I: IntoIterator<Item = Result<SnapshotFile, ScgError>>,
    {
        for snapshot in snapshots {
            match snapshot {
                Ok(snapshot) => self.merge(&snapshot),
                Err(e) => {
                    warn!("skipping snapshot: {e}");
                    self.files_skipped += 1;
                }
            }
        }
    }

    /// Finish loading and hand out the graph with its report.
    pub fn finish(self) -> (KnowledgeGraph, LoadReport) {
        let report = LoadReport {
            files_loaded: self.files_loaded,
            files_skipped: self.files_skipped,
            nodes: self.graph.node_count(),
            vertices: self.graph.vertex_count(),
            edges: self.graph.edge_count(),
        };
        info!(
            "graph loaded: {} nodes, {} edges ({} files, {} skipped)",
            report.nodes, report.edges, report.files_loaded, report.files_skipped
        );
        (self.graph, report)
    }
}

/// Load a sequence of snapshot results into a fresh graph.
///
/// # Examples
///
/// ```
/// use semgraph_context::loader::load_snapshots;
///
/// let (graph, report) = load_snapshots(Vec::new());
/// assert_eq!(graph.node_count(), 0);
/// assert_eq!(report.edges, 0);
/// ```
pub fn load_snapshots<I>(snapshots: I) -> (KnowledgeGraph, LoadReport)
where
    I: IntoIterator<Item = Result<SnapshotFile, ScgError>>,
{
    let mut loader = GraphLoader::new();
    loader.load(snapshots);
    loader.finish()
}
