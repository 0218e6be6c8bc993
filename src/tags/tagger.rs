//! Tag extraction for resource records
//!
//! A model-backed [`KeywordSource`] is tried first; when it is missing,
//! fails, or finds nothing, tags come from word frequency instead.

use anyhow::Result;
use std::path::Path;
use tracing::{debug, warn};

use super::frequency::extract_by_frequency;
use super::keyword::KeywordExtractor;
use crate::core::resource::{Resource, ResourceRow};

/// Default number of tags per record
pub const DEFAULT_TOP_K: usize = 5;

/// Primary keyword extraction strategy
pub trait KeywordSource: Send + Sync {
    /// Up to `limit` single-word keywords, best first
    fn keywords(&self, text: &str, limit: usize) -> Result<Vec<String>>;
}

impl KeywordSource for KeywordExtractor {
    fn keywords(&self, text: &str, limit: usize) -> Result<Vec<String>> {
        Ok(self
            .extract_keywords(text, limit)?
            .into_iter()
            .map(|k| k.token)
            .collect())
    }
}

/// Records the tagger can read text from and write tags to
pub trait Taggable {
    fn name(&self) -> Option<&str>;
    fn description(&self) -> Option<&str>;
    fn set_tags(&mut self, tags: Vec<String>);
}

impl Taggable for Resource {
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn set_tags(&mut self, tags: Vec<String>) {
        self.tags = Some(tags);
    }
}

impl Taggable for ResourceRow {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn set_tags(&mut self, tags: Vec<String>) {
        self.tags = Some(tags);
    }
}

/// Keyword tagger with optional model-backed primary strategy
#[derive(Default)]
pub struct Tagger {
    primary: Option<Box<dyn KeywordSource>>,
}

impl Tagger {
    /// Frequency-only tagger
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(source: Box<dyn KeywordSource>) -> Self {
        Self {
            primary: Some(source),
        }
    }

    /// Tagger using the Model2Vec keyword model at `model_path`, or the
    /// cached default model. Falls back to frequency-only if neither loads.
    pub fn load(model_path: Option<&Path>) -> Self {
        let extractor = match model_path {
            Some(path) => KeywordExtractor::from_model_path(path),
            None => KeywordExtractor::from_default_cache(),
        };

        match extractor {
            Ok(extractor) => Self::with_source(Box::new(extractor)),
            Err(e) => {
                warn!("Keyword model unavailable, using frequency tagging: {:#}", e);
                Self::new()
            }
        }
    }

    pub fn has_model(&self) -> bool {
        self.primary.is_some()
    }

    /// Up to `top_k` lowercase tags from `name` and `description`
    pub fn extract_tags(
        &self,
        name: Option<&str>,
        description: Option<&str>,
        top_k: usize,
    ) -> Vec<String> {
        let text = [name.unwrap_or(""), description.unwrap_or("")]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let text = text.trim();
        if text.is_empty() || top_k == 0 {
            return vec![];
        }

        let tags = self.extract_primary(text, top_k);
        if !tags.is_empty() {
            return tags;
        }
        extract_by_frequency(text, top_k)
    }

    fn extract_primary(&self, text: &str, top_k: usize) -> Vec<String> {
        let Some(source) = &self.primary else {
            return vec![];
        };

        let candidates = match source.keywords(text, top_k * 2) {
            Ok(candidates) => candidates,
            Err(e) => {
                debug!("Primary keyword extraction failed: {:#}", e);
                return vec![];
            }
        };

        let mut tags: Vec<String> = Vec::with_capacity(top_k);
        for candidate in candidates {
            let tag = candidate.trim().to_lowercase();
            if tag.is_empty() || tags.contains(&tag) {
                continue;
            }
            tags.push(tag);
            if tags.len() >= top_k {
                break;
            }
        }
        tags
    }

    /// Replace each record's tags with freshly extracted ones
    pub fn tag_records<T: Taggable>(&self, records: Vec<T>, top_k: usize) -> Vec<T> {
        records
            .into_iter()
            .map(|mut record| {
                let tags = self.extract_tags(record.name(), record.description(), top_k);
                record.set_tags(tags);
                record
            })
            .collect()
    }
}
