pub mod index;
pub mod ingest;
pub mod init;
pub mod search;
#[cfg(feature = "server")]
pub mod serve;
pub mod tags;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use resource_finder::core::config::Config;
use resource_finder::core::resource::ResourceStore;
use resource_finder::ingest as loader;
use resource_finder::tags::Tagger;

/// Tagger per config, falling back to frequency tagging
pub(crate) fn load_tagger(config: &Config) -> Tagger {
    Tagger::load(config.tagger.model_path.as_deref().map(Path::new))
}

/// Resources from `source` (or the configured data source), seed data when
/// neither is set
pub(crate) fn load_store(config: &Config, source: Option<&Path>) -> Result<ResourceStore> {
    let Some(path) = source.or(config.data.source.as_deref()) else {
        info!("No data source configured, using seed resources");
        return Ok(ResourceStore::seeded());
    };

    let mut rows =
        loader::load(path).with_context(|| format!("Failed to load {}", path.display()))?;

    if config.tagger.auto_tag {
        let tagger = load_tagger(config);
        rows = tagger.tag_records(rows, config.tagger.top_k);
    }

    let store = ResourceStore::from_rows(rows);
    info!(
        source = %path.display(),
        resources = store.len(),
        "Loaded resources"
    );
    Ok(store)
}
