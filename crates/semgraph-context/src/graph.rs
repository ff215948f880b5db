use std::collections::{BTreeMap, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use semgraph_core::{Location, NodeRecord};
use serde::Serialize;

/// Metadata registered for a declared node.
///
/// Immutable once registered: later declarations of the same id never
/// overwrite it.
///
/// # Examples
///
/// ```
/// use semgraph_core::NodeRecord;
/// use semgraph_context::graph::NodeMeta;
///
/// let record = NodeRecord {
///     id: "com/bumptech/glide/LruCache#".into(),
///     kind: "CLASS".into(),
///     display_name: Some("LruCache".into()),
///     ..NodeRecord::default()
/// };
/// let meta = NodeMeta::from_record(&record, "LruCache.java");
/// assert_eq!(meta.label(), "LruCache");
/// assert_eq!(meta.file_uri, "LruCache.java");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMeta {
    /// Globally unique node id.
    pub id: String,
    /// Kind tag.
    pub kind: String,
    /// Display name as declared, if any.
    pub display_name: Option<String>,
    /// Source location.
    pub location: Location,
    /// String properties.
    pub properties: BTreeMap<String, String>,
    /// Uri of the snapshot that first declared the node.
    pub file_uri: String,
}

impl NodeMeta {
    /// Build metadata from a snapshot record declared in `file_uri`.
    pub fn from_record(record: &NodeRecord, file_uri: &str) -> Self {
        Self {
            id: record.id.clone(),
            kind: record.kind.clone(),
            display_name: record.display_name.clone(),
            location: record.location.clone(),
            properties: record.properties.clone(),
            file_uri: file_uri.to_string(),
        }
    }

    /// Display name, or the id when the name is missing or empty.
    pub fn label(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.id,
        }
    }
}

/// Directed knowledge graph keyed by node id, plus the metadata table.
///
/// Vertices carry their id; edges carry their type label. A vertex may exist
/// without metadata when it was first seen as an edge endpoint. At most
/// one edge exists per (source, target) pair.
///
/// # Examples
///
/// ```
/// use semgraph_context::graph::KnowledgeGraph;
///
/// let mut graph = KnowledgeGraph::new();
/// graph.upsert_edge("P", "Q", "CALLS");
/// graph.upsert_edge("P", "Q", "REFERENCES");
/// assert_eq!(graph.edge_count(), 1);
/// assert_eq!(graph.edge_kind("P", "Q"), Some("REFERENCES"));
/// assert_eq!(graph.node_count(), 0);
/// assert_eq!(graph.vertex_count(), 2);
/// ```
#[derive(Debug, Default)]
pub struct KnowledgeGraph {
    graph: DiGraph<String, String>,
    vertices: HashMap<String, NodeIndex>,
    metadata: Vec<NodeMeta>,
    meta_index: HashMap<String, usize>,
}

impl KnowledgeGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the vertex for `id`, creating a metadata-less one if absent.
    pub fn ensure_vertex(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.vertices.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.to_string());
        self.vertices.insert(id.to_string(), idx);
        idx
    }

    /// Register metadata for a node, creating its vertex if needed.
    ///
    /// Returns `false` and leaves the table untouched when a vertex with
    /// this id already exists, whether declared or created as an edge
    /// endpoint. Placeholders stay metadata-less.
    pub fn register(&mut self, meta: NodeMeta) -> bool {
        if self.vertices.contains_key(&meta.id) {
            return false;
        }
        self.ensure_vertex(&meta.id);
        self.meta_index.insert(meta.id.clone(), self.metadata.len());
        self.metadata.push(meta);
        true
    }

    /// Insert the directed edge `source -> target`, or overwrite its type
    /// label if the pair is already connected.
    pub fn upsert_edge(&mut self, source: &str, target: &str, kind: &str) {
        let from = self.ensure_vertex(source);
        let to = self.ensure_vertex(target);
        self.graph.update_edge(from, to, kind.to_string());
    }

    /// Metadata for `id`, if the node was ever declared.
    pub fn node(&self, id: &str) -> Option<&NodeMeta> {
        self.meta_index.get(id).map(|&i| &self.metadata[i])
    }

    /// All declared nodes in registration order.
    pub fn nodes(&self) -> &[NodeMeta] {
        &self.metadata
    }

    /// Whether `id` exists as a vertex, declared or not.
    pub fn contains_vertex(&self, id: &str) -> bool {
        self.vertices.contains_key(id)
    }

    /// Number of declared nodes.
    pub fn node_count(&self) -> usize {
        self.metadata.len()
    }

    /// Number of vertices, placeholders included.
    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Type label of the edge `source -> target`, if present.
    pub fn edge_kind(&self, source: &str, target: &str) -> Option<&str> {
        let from = *self.vertices.get(source)?;
        let to = *self.vertices.get(target)?;
        self.graph
            .find_edge(from, to)
            .map(|e| self.graph[e].as_str())
    }

    /// Iterate `(source, target, type)` for every edge, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &str)> + '_ {
        self.graph.edge_references().map(|e| {
            (
                self.graph[e.source()].as_str(),
                self.graph[e.target()].as_str(),
                e.weight().as_str(),
            )
        })
    }

    /// Edge list grouped by type label, for bulk graph-database loaders.
    ///
    /// # Examples
    ///
    /// ```
    /// use semgraph_context::graph::KnowledgeGraph;
    ///
    /// let mut graph = KnowledgeGraph::new();
    /// graph.upsert_edge("A", "B", "CALL");
    /// graph.upsert_edge("B", "C", "CALL");
    /// graph.upsert_edge("C", "A", "EXTEND");
    /// let by_type = graph.edges_by_type();
    /// assert_eq!(by_type["CALL"].len(), 2);
    /// assert_eq!(by_type["EXTEND"], vec![("C".to_string(), "A".to_string())]);
    /// ```
    pub fn edges_by_type(&self) -> BTreeMap<String, Vec<(String, String)>> {
        let mut by_type: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
        for (source, target, kind) in self.edges() {
            by_type
                .entry(kind.to_string())
                .or_default()
                .push((source.to_string(), target.to_string()));
        }
        by_type
    }

    pub(crate) fn vertex(&self, id: &str) -> Option<NodeIndex> {
        self.vertices.get(id).copied()
    }

    pub(crate) fn inner(&self) -> &DiGraph<String, String> {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(id: &str, kind: &str, name: &str, file: &str) -> NodeMeta {
        NodeMeta {
            id: id.to_string(),
            kind: kind.to_string(),
            display_name: Some(name.to_string()),
            location: Location::default(),
            properties: BTreeMap::new(),
            file_uri: file.to_string(),
        }
    }

    #[test]
    fn ensure_vertex_is_idempotent() {
        let mut graph = KnowledgeGraph::new();
        let a = graph.ensure_vertex("A");
        let again = graph.ensure_vertex("A");
        assert_eq!(a, again);
        assert_eq!(graph.vertex_count(), 1);
        assert!(graph.node("A").is_none(), "placeholder has no metadata");
    }

    #[test]
    fn first_registration_wins() {
        let mut graph = KnowledgeGraph::new();
        assert!(graph.register(meta("A", "CLASS", "Alpha", "a.java")));
        assert!(!graph.register(meta("A", "METHOD", "Other", "b.java")));

        let node = graph.node("A").unwrap();
        assert_eq!(node.kind, "CLASS");
        assert_eq!(node.label(), "Alpha");
        assert_eq!(node.file_uri, "a.java");
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn placeholder_stays_undeclared() {
        let mut graph = KnowledgeGraph::new();
        graph.upsert_edge("A", "B", "CALL");
        assert!(graph.node("B").is_none());

        assert!(!graph.register(meta("B", "METHOD", "bee", "b.java")));
        assert!(graph.node("B").is_none());
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.vertex_count(), 2);
    }

    #[test]
    fn edges_keyed_by_endpoints_only() {
        let mut graph = KnowledgeGraph::new();
        graph.upsert_edge("P", "Q", "CALLS");
        graph.upsert_edge("P", "Q", "REFERENCES");
        graph.upsert_edge("Q", "P", "CALLS");

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.edge_kind("P", "Q"), Some("REFERENCES"));
        assert_eq!(graph.edge_kind("Q", "P"), Some("CALLS"));
        assert_eq!(graph.edge_kind("P", "missing"), None);
    }

    #[test]
    fn nodes_keep_registration_order() {
        let mut graph = KnowledgeGraph::new();
        graph.register(meta("z", "CLASS", "Zed", "z.java"));
        graph.register(meta("a", "CLASS", "Ay", "a.java"));
        let ids: Vec<&str> = graph.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a"]);
    }

    #[test]
    fn label_falls_back_to_id() {
        let mut node = meta("pkg/Foo#", "CLASS", "", "f.java");
        assert_eq!(node.label(), "pkg/Foo#");
        node.display_name = None;
        assert_eq!(node.label(), "pkg/Foo#");
    }
}
