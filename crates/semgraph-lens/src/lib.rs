//! Node search over a semantic knowledge graph.
//!
//! Builds an embedding index through an injected [`encoder::TextEncoder`]
//! and ranks nodes by cosine similarity, or falls back to keyword matching
//! when no encoder is available. [`rag::GraphRag`] ties search, expansion
//! and rendering together.

pub mod encoder;
pub mod index;
pub mod rag;
pub mod search;
