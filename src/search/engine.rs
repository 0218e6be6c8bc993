//! Search Engine - attribute filtering with semantic re-ranking
//!
//! Filters run in a fixed order and each keeps the relative order of what
//! it is given. The only reordering step is the semantic re-rank, which
//! moves records the vector index ranked to the front without adding or
//! removing any.

use std::sync::Arc;
use tracing::debug;

use super::query::SearchQuery;
use crate::core::error::Result;
use crate::core::resource::{Resource, ResourceStore};

/// Outcome of asking the vector index for a ranking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticSignal {
    /// Resource ids, most similar first
    Ranked(Vec<i64>),
    /// No semantic signal; keep keyword order
    Unavailable,
}

/// Source of semantic rankings for a keyword
pub trait SemanticRanker: Send + Sync {
    fn rank(&self, text: &str) -> SemanticSignal;
}

/// Search engine over the in-memory resource store
#[derive(Clone)]
pub struct SearchEngine {
    store: Arc<ResourceStore>,
    ranker: Option<Arc<dyn SemanticRanker>>,
}

impl SearchEngine {
    /// Keyword and attribute filtering only
    pub fn new(store: Arc<ResourceStore>) -> Self {
        Self {
            store,
            ranker: None,
        }
    }

    pub fn with_ranker(store: Arc<ResourceStore>, ranker: Arc<dyn SemanticRanker>) -> Self {
        Self {
            store,
            ranker: Some(ranker),
        }
    }

    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    /// All resources, unfiltered
    pub fn all(&self) -> Vec<Resource> {
        self.store.all().to_vec()
    }

    /// Look up a single resource
    pub fn get(&self, id: i64) -> Result<Resource> {
        self.store.get(id).cloned()
    }

    pub fn search(&self, query: &SearchQuery) -> Vec<Resource> {
        let mut results: Vec<&Resource> = self.store.all().iter().collect();

        if let Some(keyword) = query.keyword() {
            let needle = keyword.to_lowercase();
            results.retain(|r| matches_keyword(r, &needle));

            if let Some(ranker) = &self.ranker {
                match ranker.rank(keyword) {
                    SemanticSignal::Ranked(ids) => rerank(&mut results, &ids),
                    SemanticSignal::Unavailable => {
                        debug!("No semantic signal, keeping keyword order")
                    }
                }
            }
        }

        if let Some(tags) = query.tags() {
            results.retain(|r| matches_tags(r, tags));
        }

        if let Some(age) = query.age {
            results.retain(|r| matches_age(r, age));
        }

        if let Some(county) = query.county() {
            results.retain(|r| contains_ignore_case(&r.counties, county));
        }

        if let Some(insurance) = query.insurance() {
            results.retain(|r| contains_ignore_case(&r.insurance_types, insurance));
        }

        if let Some(systems) = query.system() {
            results.retain(|r| matches_system(r, systems));
        }

        debug!(results = results.len(), "Search complete");
        results.into_iter().cloned().collect()
    }
}

/// `needle` must already be lowercase
fn matches_keyword(resource: &Resource, needle: &str) -> bool {
    [
        Some(resource.name.as_str()),
        resource.description.as_deref(),
        resource.eligibility.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(needle))
}

/// Move ranked ids to the front in rank order; everything else keeps its
/// relative order after them
fn rerank(results: &mut [&Resource], ranked_ids: &[i64]) {
    results.sort_by_key(|r| {
        ranked_ids
            .iter()
            .position(|id| *id == r.id)
            .unwrap_or(usize::MAX)
    });
}

fn matches_tags(resource: &Resource, wanted: &[String]) -> bool {
    resource
        .tags
        .as_ref()
        .is_some_and(|tags| tags.iter().any(|t| wanted.contains(t)))
}

fn matches_age(resource: &Resource, age: i64) -> bool {
    resource.min_age.map_or(true, |min| min <= age)
        && resource.max_age.map_or(true, |max| age <= max)
}

fn contains_ignore_case(values: &Option<Vec<String>>, wanted: &str) -> bool {
    let wanted = wanted.to_lowercase();
    values
        .as_ref()
        .is_some_and(|values| values.iter().any(|v| v.trim().to_lowercase() == wanted))
}

fn matches_system(resource: &Resource, systems: &[String]) -> bool {
    resource
        .system
        .as_ref()
        .is_some_and(|system| systems.contains(system))
}
