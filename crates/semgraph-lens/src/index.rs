//! Embedding index over the declared nodes of a knowledge graph.
//!
//! Row `i` of the matrix always describes `ids[i]`. Cosine similarity is
//! computed in Rust against every row.

use semgraph_context::graph::{KnowledgeGraph, NodeMeta};
use semgraph_core::ScgError;
use tracing::info;

use crate::encoder::TextEncoder;

/// Encoder input describing a node: `"{kind}: {display_name_or_id}"`.
///
/// # Examples
///
/// ```
/// use semgraph_core::NodeRecord;
/// use semgraph_context::graph::NodeMeta;
/// use semgraph_lens::index::fingerprint;
///
/// let record = NodeRecord { id: "Lru#".into(), kind: "CLASS".into(), ..NodeRecord::default() };
/// assert_eq!(fingerprint(&NodeMeta::from_record(&record, "Lru.java")), "CLASS: Lru#");
/// ```
pub fn fingerprint(node: &NodeMeta) -> String {
    format!("{}: {}", node.kind, node.label())
}

/// Node ids with their aligned embedding vectors.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingIndex {
    ids: Vec<String>,
    vectors: Vec<Vec<f32>>,
    dimensions: usize,
}

impl EmbeddingIndex {
    /// Encode every declared node of `graph` in registration order.
    ///
    /// An empty graph yields an empty index without calling the encoder.
    ///
    /// # Errors
    ///
    /// Returns [`ScgError::Embedding`] if encoding fails, the vector count
    /// differs from the node count, or vectors disagree on dimension.
    pub fn build(graph: &KnowledgeGraph, encoder: &dyn TextEncoder) -> Result<Self, ScgError> {
        let nodes = graph.nodes();
        if nodes.is_empty() {
            return Ok(Self::default());
        }

        info!("computing embeddings for {} nodes", nodes.len());
        let texts: Vec<String> = nodes.iter().map(fingerprint).collect();
        let vectors = encoder.encode_batch(&texts)?;

        let ids = nodes.iter().map(|n| n.id.clone()).collect();
        let index = Self::from_parts(ids, vectors)?;
        info!("embeddings computed ({} dimensions)", index.dimensions);
        Ok(index)
    }

    /// Assemble an index from already computed vectors.
    ///
    /// # Errors
    ///
    /// Returns [`ScgError::Embedding`] if the sequences differ in length,
    /// the vectors are empty or of mixed dimension, or any component is NaN
    /// or infinite.
    ///
    /// # Examples
    ///
    /// ```
    /// use semgraph_lens::index::EmbeddingIndex;
    ///
    /// let index = EmbeddingIndex::from_parts(
    ///     vec!["a".into(), "b".into()],
    ///     vec![vec![1.0, 0.0], vec![0.0, 1.0]],
    /// ).unwrap();
    /// assert_eq!(index.len(), 2);
    /// assert_eq!(index.dimensions(), 2);
    ///
    /// assert!(EmbeddingIndex::from_parts(vec!["a".into()], vec![]).is_err());
    /// ```
    pub fn from_parts(ids: Vec<String>, vectors: Vec<Vec<f32>>) -> Result<Self, ScgError> {
        if ids.len() != vectors.len() {
            return Err(ScgError::Embedding(format!(
                "encoder returned {} vectors for {} nodes",
                vectors.len(),
                ids.len()
            )));
        }

        let dimensions = vectors.first().map_or(0, Vec::len);
        if !vectors.is_empty() && dimensions == 0 {
            return Err(ScgError::Embedding("encoder returned empty vectors".into()));
        }
        if let Some(pos) = vectors.iter().position(|v| v.len() != dimensions) {
            return Err(ScgError::Embedding(format!(
                "vector {pos} has {} dimensions, expected {dimensions}",
                vectors[pos].len()
            )));
        }
        if let Some(pos) = vectors.iter().position(|v| v.iter().any(|x| !x.is_finite())) {
            return Err(ScgError::Embedding(format!(
                "vector {pos} has a non-finite component"
            )));
        }

        Ok(Self {
            ids,
            vectors,
            dimensions,
        })
    }

    /// Number of indexed nodes.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the index holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Vector dimension (0 for an empty index).
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Node id stored at row `row`.
    pub fn id(&self, row: usize) -> Option<&str> {
        self.ids.get(row).map(String::as_str)
    }

    /// The `k` rows most similar to `query`, best first.
    ///
    /// Every row is eligible; ties keep the lower row first.
    ///
    /// # Errors
    ///
    /// Returns [`ScgError::Embedding`] if `query` has the wrong dimension.
    pub fn top_k(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f64)>, ScgError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(ScgError::Embedding(format!(
                "query has {} dimensions, index has {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<(usize, f64)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(row, vector)| (row, cosine_similarity(query, vector)))
            .collect();

        // stable sort: equal scores stay in row order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        Ok(scored)
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b) {
        let x = f64::from(*x);
        let y = f64::from(*y);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }

    dot / denom
}
