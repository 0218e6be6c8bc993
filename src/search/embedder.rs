//! Embedder trait and implementations for semantic search
//!
//! Provides abstraction over different embedding models:
//! - Model2VecEmbedder: static sentence embeddings (requires model download)
//! - HashEmbedder: feature-hashed bag of words (built-in, no model file)

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use model2vec::Model2Vec;
use regex::Regex;
use std::path::Path;

use crate::core::config::{EmbedderKind, IndexConfig};

/// Embedding model abstraction
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Get embedding dimension
    fn dimension(&self) -> usize;

    /// Get model name/identifier
    fn name(&self) -> &str;
}

// ============================================================================
// Hash Embedder
// ============================================================================

/// Hash embedder dimension
pub const HASH_DIM: usize = 256;

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"[a-z0-9']+").unwrap();
}

/// Feature-hashed bag of words, L2 normalized.
///
/// Texts sharing words land close together; no notion of synonyms.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self { dim: HASH_DIM }
    }

    fn fnv1a(bytes: &[u8]) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for &b in bytes {
            hash ^= u64::from(b);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        hash
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dim];
        let lowered = text.to_lowercase();

        for word in WORD_RE.find_iter(&lowered) {
            let hash = Self::fnv1a(word.as_str().as_bytes());
            let slot = (hash % self.dim as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[slot] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn name(&self) -> &str {
        "hash-256"
    }
}

// ============================================================================
// Model2Vec Embedder
// ============================================================================

/// Model2Vec based embedder
pub struct Model2VecEmbedder {
    model: Model2Vec,
    model_path: String,
    dimension: usize,
}

impl Model2VecEmbedder {
    /// Load model from local path
    pub fn from_path(path: &Path) -> Result<Self> {
        let model = Model2Vec::from_pretrained(path.to_string_lossy().as_ref(), None, None)
            .with_context(|| format!("Failed to load Model2Vec from: {}", path.display()))?;

        Self::with_model(model, path.to_string_lossy().to_string())
    }

    /// Load model from HuggingFace Hub
    pub fn from_pretrained(model_id: &str) -> Result<Self> {
        let model = Model2Vec::from_pretrained(model_id, None, None)
            .with_context(|| format!("Failed to load Model2Vec: {}", model_id))?;

        Self::with_model(model, model_id.to_string())
    }

    fn with_model(model: Model2Vec, model_path: String) -> Result<Self> {
        let sample = model
            .encode(&["dimension check"])
            .context("Failed to determine embedding dimension")?;

        Ok(Self {
            dimension: sample.ncols(),
            model,
            model_path,
        })
    }
}

impl Embedder for Model2VecEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text];
        let embeddings = self.model.encode(&texts).context("Failed to encode text")?;
        Ok(embeddings.row(0).to_vec())
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let embeddings = self.model.encode(texts).context("Failed to encode texts")?;
        Ok(embeddings.rows().into_iter().map(|r| r.to_vec()).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model_path
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Create embedder based on configuration
pub fn create_embedder(config: &IndexConfig) -> Result<Box<dyn Embedder>> {
    match config.embedder {
        EmbedderKind::Model2vec => {
            let embedder = match &config.model_path {
                Some(path) => Model2VecEmbedder::from_path(Path::new(path))?,
                None => Model2VecEmbedder::from_pretrained(&config.model_id)?,
            };
            Ok(Box::new(embedder))
        }
        EmbedderKind::Hash => Ok(Box::new(HashEmbedder::new())),
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a > 0.0 && norm_b > 0.0 {
        dot / (norm_a * norm_b)
    } else {
        0.0
    }
}
