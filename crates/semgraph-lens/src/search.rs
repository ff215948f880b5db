//! Node lookup: semantic ranking when an index exists, keyword matching
//! otherwise.

use semgraph_context::graph::{KnowledgeGraph, NodeMeta};
use semgraph_core::ScgError;
use serde::Serialize;
use tracing::warn;

use crate::encoder::{Encoder, TextEncoder};
use crate::index::EmbeddingIndex;

/// Keyword score for a display-name match.
const NAME_MATCH_SCORE: f64 = 2.0;
/// Keyword score for an id match.
const ID_MATCH_SCORE: f64 = 1.0;

/// A ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeHit {
    /// Cosine similarity (semantic) or match score (keyword).
    pub score: f64,
    /// The matched node.
    #[serde(flatten)]
    pub node: NodeMeta,
}

/// Which strategy a [`NodeSearch`] was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Cosine similarity over the embedding index.
    Semantic,
    /// Case-insensitive substring matching.
    Keyword,
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchMode::Semantic => write!(f, "semantic"),
            SearchMode::Keyword => write!(f, "keyword"),
        }
    }
}

/// Search strategy, fixed once at construction.
pub enum NodeSearch {
    /// Encoder plus the index built with it.
    Semantic {
        /// Encoder used for queries.
        encoder: Box<dyn TextEncoder>,
        /// Index over the graph's declared nodes.
        index: EmbeddingIndex,
    },
    /// No usable encoder.
    Keyword,
}

impl NodeSearch {
    /// Build the search side for `graph`.
    ///
    /// A disabled encoder selects keyword mode. An enabled encoder builds
    /// the embedding index; if that fails the failure is logged and keyword
    /// mode is used instead.
    pub fn build(graph: &KnowledgeGraph, encoder: Encoder) -> Self {
        let Encoder::Enabled(encoder) = encoder else {
            return NodeSearch::Keyword;
        };
        match EmbeddingIndex::build(graph, encoder.as_ref()) {
            Ok(index) => NodeSearch::Semantic { encoder, index },
            Err(e) => {
                warn!("embedding index unavailable, falling back to keyword search: {e}");
                NodeSearch::Keyword
            }
        }
    }

    /// The active strategy.
    pub fn mode(&self) -> SearchMode {
        match self {
            NodeSearch::Semantic { .. } => SearchMode::Semantic,
            NodeSearch::Keyword => SearchMode::Keyword,
        }
    }

    /// Rank nodes of `graph` against `query`, returning at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`ScgError::Embedding`] if the query cannot be encoded in
    /// semantic mode. Keyword mode never fails.
    pub fn find(
        &self,
        graph: &KnowledgeGraph,
        query: &str,
        limit: usize,
    ) -> Result<Vec<NodeHit>, ScgError> {
        match self {
            NodeSearch::Semantic { encoder, index } => {
                find_semantic(graph, encoder.as_ref(), index, query, limit)
            }
            NodeSearch::Keyword => Ok(find_keyword(graph, query, limit)),
        }
    }
}

impl std::fmt::Debug for NodeSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeSearch::Semantic { index, .. } => f
                .debug_struct("Semantic")
                .field("nodes", &index.len())
                .field("dimensions", &index.dimensions())
                .finish_non_exhaustive(),
            NodeSearch::Keyword => f.write_str("Keyword"),
        }
    }
}

fn find_semantic(
    graph: &KnowledgeGraph,
    encoder: &dyn TextEncoder,
    index: &EmbeddingIndex,
    query: &str,
    limit: usize,
) -> Result<Vec<NodeHit>, ScgError> {
    let k = limit.min(index.len());
    if k == 0 {
        return Ok(Vec::new());
    }

    let query_vector = encoder.encode_one(query)?;
    let hits = index
        .top_k(&query_vector, k)?
        .into_iter()
        .filter_map(|(row, score)| {
            let node = graph.node(index.id(row)?)?;
            Some(NodeHit {
                score,
                node: node.clone(),
            })
        })
        .collect();
    Ok(hits)
}

/// Case-insensitive substring ranking over every declared node.
///
/// A display-name match scores 2 and an id match scores 1. Nodes scoring 0
/// are dropped; ties keep registration order. The empty query matches
/// everything.
///
/// # Examples
///
/// ```
/// use semgraph_core::{NodeRecord, SnapshotFile};
/// use semgraph_context::loader::load_snapshots;
/// use semgraph_lens::search::find_keyword;
///
/// let snapshot = SnapshotFile {
///     uri: "Lru.java".into(),
///     nodes: vec![NodeRecord {
///         id: "engine/LruCache#".into(),
///         kind: "CLASS".into(),
///         display_name: Some("LruCache".into()),
///         ..NodeRecord::default()
///     }],
/// };
/// let (graph, _) = load_snapshots(vec![Ok(snapshot)]);
/// let hits = find_keyword(&graph, "cache", 3);
/// assert_eq!(hits[0].score, 3.0);
/// ```
pub fn find_keyword(graph: &KnowledgeGraph, query: &str, limit: usize) -> Vec<NodeHit> {
    let needle = query.to_lowercase();
    let mut matches: Vec<(f64, &NodeMeta)> = graph
        .nodes()
        .iter()
        .filter_map(|node| {
            let mut score = 0.0;
            let name = node.display_name.as_deref().unwrap_or_default();
            if name.to_lowercase().contains(&needle) {
                score += NAME_MATCH_SCORE;
            }
            if node.id.to_lowercase().contains(&needle) {
                score += ID_MATCH_SCORE;
            }
            (score > 0.0).then_some((score, node))
        })
        .collect();

    matches.sort_by(|a, b| b.0.total_cmp(&a.0));
    matches
        .into_iter()
        .take(limit)
        .map(|(score, node)| NodeHit {
            score,
            node: node.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use semgraph_context::loader::load_snapshots;
    use semgraph_core::{NodeRecord, SnapshotFile};

    use super::*;

    /// One axis per vocabulary word; a text lights the axes of the words it
    /// contains.
    struct VocabEncoder;

    const VOCAB: [&str; 3] = ["cache", "http", "parse"];

    impl TextEncoder for VocabEncoder {
        fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ScgError> {
            Ok(texts
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    VOCAB
                        .iter()
                        .map(|w| if t.contains(w) { 1.0 } else { 0.0 })
                        .collect()
                })
                .collect())
        }
    }

    struct FailingEncoder;

    impl TextEncoder for FailingEncoder {
        fn encode_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, ScgError> {
            Err(ScgError::Embedding("service unavailable".into()))
        }
    }

    fn sample_graph() -> KnowledgeGraph {
        let node = |id: &str, kind: &str, name: Option<&str>| NodeRecord {
            id: id.to_string(),
            kind: kind.to_string(),
            display_name: name.map(str::to_string),
            ..NodeRecord::default()
        };
        let snapshot = SnapshotFile {
            uri: "sample.java".into(),
            nodes: vec![
                node("net/HttpClient#", "CLASS", Some("HttpClient")),
                node("engine/LruCache#", "CLASS", Some("LruCache")),
                node("engine/cache/DiskStore#", "CLASS", Some("DiskStore")),
                node("util/Parser#parse().", "METHOD", Some("parse")),
                node("anon#", "CLASS", None),
            ],
        };
        load_snapshots(vec![Ok(snapshot)]).0
    }

    #[test]
    fn keyword_scores_name_above_id() {
        let graph = sample_graph();
        let hits = find_keyword(&graph, "CACHE", 10);
        let ranked: Vec<(&str, f64)> = hits.iter().map(|h| (h.node.id.as_str(), h.score)).collect();
        assert_eq!(
            ranked,
            vec![("engine/LruCache#", 3.0), ("engine/cache/DiskStore#", 1.0)]
        );
    }

    #[test]
    fn keyword_excludes_non_matches_and_respects_limit() {
        let graph = sample_graph();
        assert!(find_keyword(&graph, "zzz", 5).is_empty());
        assert_eq!(find_keyword(&graph, "#", 2).len(), 2);
    }

    #[test]
    fn keyword_empty_query_matches_everything_in_order() {
        let graph = sample_graph();
        let hits = find_keyword(&graph, "", 10);
        assert_eq!(hits.len(), 5);
        // anon# has no display name; "" still matches its (empty) name
        assert!(hits.iter().all(|h| h.score == 3.0));
        assert_eq!(hits[0].node.id, "net/HttpClient#");
        assert_eq!(hits[4].node.id, "anon#");
    }

    #[test]
    fn disabled_encoder_selects_keyword_mode() {
        let graph = sample_graph();
        let search = NodeSearch::build(&graph, Encoder::Disabled);
        assert_eq!(search.mode(), SearchMode::Keyword);
        let hits = search.find(&graph, "cache", 3).unwrap();
        assert_eq!(hits[0].node.id, "engine/LruCache#");
        assert!(hits[0].score >= 2.0);
    }

    #[test]
    fn failed_index_build_falls_back_to_keyword() {
        let graph = sample_graph();
        let search = NodeSearch::build(&graph, Encoder::enabled(FailingEncoder));
        assert_eq!(search.mode(), SearchMode::Keyword);
    }

    struct NanEncoder;

    impl TextEncoder for NanEncoder {
        fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ScgError> {
            Ok(texts.iter().map(|_| vec![f32::NAN, 1.0]).collect())
        }
    }

    #[test]
    fn non_finite_vectors_fall_back_to_keyword() {
        let graph = sample_graph();
        let search = NodeSearch::build(&graph, Encoder::enabled(NanEncoder));
        assert_eq!(search.mode(), SearchMode::Keyword);
        let hits = search.find(&graph, "cache", 3).unwrap();
        assert_eq!(hits[0].node.id, "engine/LruCache#");
    }

    #[test]
    fn semantic_ranks_by_cosine_then_row() {
        let graph = sample_graph();
        let search = NodeSearch::build(&graph, Encoder::enabled(VocabEncoder));
        assert_eq!(search.mode(), SearchMode::Semantic);

        let hits = search.find(&graph, "http cache", 3).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.node.id.as_str()).collect();
        // HttpClient and LruCache tie at 1/sqrt(2); the earlier row wins
        assert_eq!(ids, vec!["net/HttpClient#", "engine/LruCache#", "engine/cache/DiskStore#"]);
        assert!((hits[0].score - hits[1].score).abs() < 1e-9);
        assert_eq!(hits[2].score, 0.0);
    }

    #[test]
    fn semantic_limit_is_clamped_and_unfiltered() {
        let graph = sample_graph();
        let search = NodeSearch::build(&graph, Encoder::enabled(VocabEncoder));
        let hits = search.find(&graph, "nothing relevant", 50).unwrap();
        assert_eq!(hits.len(), graph.node_count());
    }

    #[test]
    fn semantic_search_is_deterministic() {
        let graph = sample_graph();
        let search = NodeSearch::build(&graph, Encoder::enabled(VocabEncoder));
        let first = search.find(&graph, "parse", 5).unwrap();
        let second = search.find(&graph, "parse", 5).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].node.id, "util/Parser#parse().");
    }

    #[test]
    fn hit_serializes_flat() {
        let graph = sample_graph();
        let hits = find_keyword(&graph, "LruCache", 1);
        let json = serde_json::to_value(&hits[0]).unwrap();
        assert_eq!(json["id"], "engine/LruCache#");
        assert_eq!(json["kind"], "CLASS");
        assert_eq!(json["displayName"], "LruCache");
        assert_eq!(json["fileUri"], "sample.java");
        assert_eq!(json["score"], 3.0);
    }
}
