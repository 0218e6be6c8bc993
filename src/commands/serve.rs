//! Serve command - load resources, build the index, start the HTTP API

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use resource_finder::core::config::Config;
use resource_finder::search::{SearchEngine, VectorIndex};
use resource_finder::server::{self, AppState};

use super::load_store;

pub fn run(config: Config) -> Result<()> {
    config.require_database_url()?;

    let store = Arc::new(load_store(&config, None)?);

    let index = VectorIndex::from_config(&config.index);
    match index.index(store.all()) {
        Ok(stats) => info!(
            indexed = stats.indexed,
            skipped = stats.skipped,
            removed = stats.removed,
            duration_ms = stats.duration_ms as u64,
            "Vector index ready"
        ),
        Err(e) => warn!(
            "Startup indexing failed, searches use keyword order until the index loads: {:#}",
            e
        ),
    }

    let engine = SearchEngine::with_ranker(store, Arc::new(index));

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::serve(AppState::new(engine), &config.server))
}
