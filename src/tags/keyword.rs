//! Keyword extraction using Model2Vec token embeddings
//!
//! Scores each whole word of a text by the cosine similarity of its
//! embedding to the mean document embedding. Words are unigrams rebuilt
//! from subword tokens.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;

use safetensors::SafeTensors;
use tokenizers::Tokenizer;

use super::frequency::is_candidate;
use crate::search::embedder::cosine_similarity;

/// English Model2Vec model used for keyword extraction
pub const DEFAULT_KEYWORD_MODEL_CACHE: &str =
    ".cache/huggingface/hub/models--minishlab--potion-base-8M/snapshots";

/// Words scoring below this are not keywords
const MIN_SCORE: f32 = 0.1;

/// Keyword extractor using Model2Vec embeddings
pub struct KeywordExtractor {
    tokenizer: Tokenizer,
    embeddings: Vec<Vec<f32>>,
    embedding_dim: usize,
}

impl KeywordExtractor {
    /// Load from Model2Vec model directory
    pub fn from_model_path(model_path: &Path) -> Result<Self> {
        let tok_path = model_path.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tok_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        let mdl_path = model_path.join("model.safetensors");
        let model_bytes = std::fs::read(&mdl_path).context("Failed to read model.safetensors")?;
        let safet =
            SafeTensors::deserialize(&model_bytes).context("Failed to parse safetensors")?;

        let tensor = safet
            .tensor("embeddings")
            .or_else(|_| safet.tensor("0"))
            .context("No embeddings tensor found")?;

        let shape = tensor.shape();
        if shape.len() != 2 || shape[1] == 0 {
            anyhow::bail!("Unexpected embeddings shape: {:?}", shape);
        }
        let cols = shape[1];

        let floats: Vec<f32> = tensor
            .data()
            .chunks_exact(4)
            .map(|bs| f32::from_le_bytes([bs[0], bs[1], bs[2], bs[3]]))
            .collect();

        let embeddings: Vec<Vec<f32>> = floats
            .chunks_exact(cols)
            .map(|chunk: &[f32]| chunk.to_vec())
            .collect();

        Ok(Self {
            tokenizer,
            embeddings,
            embedding_dim: cols,
        })
    }

    /// Load from default HuggingFace cache path
    pub fn from_default_cache() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME not set")?;
        let cache_path = Path::new(&home).join(DEFAULT_KEYWORD_MODEL_CACHE);

        let snapshot_dir = std::fs::read_dir(&cache_path)
            .with_context(|| format!("No model cache at {}", cache_path.display()))?
            .filter_map(|e| e.ok())
            .find(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .context("No snapshot found")?;

        Self::from_model_path(&snapshot_dir.path())
    }

    fn get_embedding(&self, token_id: u32) -> Option<&[f32]> {
        self.embeddings.get(token_id as usize).map(|v| v.as_slice())
    }

    /// Mean of the embeddings of `token_ids`
    fn mean_embedding(&self, token_ids: &[u32]) -> Vec<f32> {
        let mut mean = vec![0.0f32; self.embedding_dim];
        let mut count = 0;

        for &id in token_ids {
            if let Some(emb) = self.get_embedding(id) {
                for (i, &v) in emb.iter().enumerate() {
                    mean[i] += v;
                }
                count += 1;
            }
        }

        if count > 0 {
            for v in &mut mean {
                *v /= count as f32;
            }
        }

        mean
    }

    /// Extract keywords from text
    ///
    /// Returns keywords sorted by relevance (similarity to document embedding).
    /// Equal scores keep first-occurrence order.
    pub fn extract_keywords(&self, text: &str, limit: usize) -> Result<Vec<Keyword>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let token_ids: Vec<u32> = encoding.get_ids().to_vec();
        if token_ids.is_empty() {
            return Ok(vec![]);
        }

        let doc_emb = self.mean_embedding(&token_ids);
        let words = merge_subwords(encoding.get_tokens(), &token_ids);

        let mut seen: HashSet<String> = HashSet::new();
        let mut keywords: Vec<Keyword> = Vec::new();

        for word in &words {
            if word.text.starts_with('[') || word.text.starts_with('<') {
                continue;
            }

            let clean_word = clean_token(&word.text);
            if !is_keyword_shaped(&clean_word) || !seen.insert(clean_word.clone()) {
                continue;
            }

            let word_emb = self.mean_embedding(&word.token_ids);
            if word_emb.iter().all(|&v| v == 0.0) {
                continue;
            }

            let score = cosine_similarity(&word_emb, &doc_emb);
            if score > MIN_SCORE {
                keywords.push(Keyword {
                    token: clean_word,
                    score,
                });
            }
        }

        // stable: ties keep first occurrence
        keywords.sort_by(|a, b| b.score.total_cmp(&a.score));
        keywords.truncate(limit);

        Ok(keywords)
    }
}

/// Merge subword tokens into complete words
fn merge_subwords(tokens: &[String], token_ids: &[u32]) -> Vec<Word> {
    let mut words = Vec::new();
    let mut current_word = String::new();
    let mut current_ids = Vec::new();
    let wordpiece = is_wordpiece(tokens);

    for (i, (token, &token_id)) in tokens.iter().zip(token_ids).enumerate() {
        let is_word_start = if wordpiece {
            !token.starts_with("##")
        } else {
            token.starts_with('▁') || token.starts_with('Ġ') || i == 0
        };

        if is_word_start {
            if !current_word.is_empty() {
                words.push(Word {
                    text: std::mem::take(&mut current_word),
                    token_ids: std::mem::take(&mut current_ids),
                });
            }
            current_word = clean_token(token);
            current_ids = vec![token_id];
        } else {
            current_word.push_str(token.trim_start_matches("##"));
            current_ids.push(token_id);
        }
    }

    if !current_word.is_empty() {
        words.push(Word {
            text: current_word,
            token_ids: current_ids,
        });
    }

    words
}

/// BERT-style vocabularies mark continuations with `##` and leave word
/// starts bare
fn is_wordpiece(tokens: &[String]) -> bool {
    tokens.iter().any(|t| t.starts_with("##"))
        && !tokens.iter().any(|t| t.starts_with('▁') || t.starts_with('Ġ'))
}

fn is_keyword_shaped(word: &str) -> bool {
    is_candidate(word) && word.chars().all(|c| c.is_alphanumeric() || c == '\'')
}

/// Reconstructed word from subword tokens
struct Word {
    text: String,
    token_ids: Vec<u32>,
}

/// Clean token (remove BPE markers like Ġ, ##, etc.)
fn clean_token(token: &str) -> String {
    token
        .trim_start_matches('Ġ')
        .trim_start_matches("##")
        .trim_start_matches('▁')
        .to_lowercase()
}

/// Extracted keyword with relevance score
#[derive(Debug, Clone)]
pub struct Keyword {
    pub token: String,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merge_sentencepiece() {
        let tokens = toks(&["▁mental", "▁heal", "th", "▁clinic"]);
        let words = merge_subwords(&tokens, &[1, 2, 3, 4]);
        let texts: Vec<_> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["mental", "health", "clinic"]);
        assert_eq!(words[1].token_ids, vec![2, 3]);
    }

    #[test]
    fn test_merge_wordpiece() {
        let tokens = toks(&["family", "support", "##ive", "services"]);
        let words = merge_subwords(&tokens, &[1, 2, 3, 4]);
        let texts: Vec<_> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["family", "supportive", "services"]);
    }

    #[test]
    fn test_keyword_shape() {
        assert!(is_keyword_shaped("housing"));
        assert!(is_keyword_shaped("children's"));
        assert!(!is_keyword_shaped("the"));
        assert!(!is_keyword_shaped("ok"));
        assert!(!is_keyword_shaped("co-op"));
    }

    #[test]
    #[ignore] // Requires model
    fn test_keyword_extraction() {
        let extractor = KeywordExtractor::from_default_cache().unwrap();

        let keywords = extractor
            .extract_keywords("Bilingual therapy for teens and families", 5)
            .unwrap();

        let tokens: Vec<_> = keywords.iter().map(|k| k.token.as_str()).collect();
        assert!(tokens.contains(&"therapy") || tokens.contains(&"bilingual"));
    }
}
