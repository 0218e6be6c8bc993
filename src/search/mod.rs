//! Resource search
//!
//! Keyword and attribute filtering, re-ranked by a text-embedding index
//! when one is available.

pub mod embedder;
pub mod engine;
pub mod index;
pub mod query;
pub mod vectordb;

pub use embedder::{create_embedder, Embedder, HashEmbedder, Model2VecEmbedder};
pub use engine::{SearchEngine, SemanticRanker, SemanticSignal};
pub use index::{IndexingStats, StoreLocation, VectorIndex};
pub use query::SearchQuery;
pub use vectordb::{DocumentMetadata, IndexStats, IndexedDocument, VectorDB};
