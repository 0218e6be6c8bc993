//! Search command - run a structured query from the terminal

use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;

use resource_finder::core::config::Config;
use resource_finder::core::resource::Resource;
use resource_finder::search::{SearchEngine, SearchQuery, VectorIndex};

use super::load_store;

pub fn run(
    config: &Config,
    source: Option<&Path>,
    query: SearchQuery,
    fallback: bool,
    json: bool,
) -> Result<()> {
    let store = Arc::new(load_store(config, source)?);

    let use_index = !fallback && config.index.paths().db.exists();
    let engine = if use_index {
        SearchEngine::with_ranker(store, Arc::new(VectorIndex::from_config(&config.index)))
    } else {
        SearchEngine::new(store)
    };

    let results = engine.search(&query);

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("{} No matching resources", "→".dimmed());
        return Ok(());
    }

    println!("{} {} results", "→".dimmed(), results.len());
    if !use_index && query.keyword().is_some() {
        println!("  {} keyword order (no vector index)", "→".dimmed());
    }
    println!();

    for (i, resource) in results.iter().enumerate() {
        print_result(i + 1, resource);
    }

    Ok(())
}

fn print_result(rank: usize, resource: &Resource) {
    println!(
        "{}. {} {}",
        rank.to_string().bold(),
        resource.name.cyan(),
        format!("[{}]", resource.id).dimmed()
    );

    if let Some(ref description) = resource.description {
        // char-aware truncation
        let display = if description.chars().count() > 100 {
            format!("{}...", description.chars().take(100).collect::<String>())
        } else {
            description.clone()
        };
        println!("   {}", display.dimmed());
    }

    if let (Some(system), Some(counties)) = (&resource.system, &resource.counties) {
        println!("   {} | {}", system, counties.join(", "));
    }
    if let Some(ref url) = resource.url {
        println!("   {}", url.blue());
    }
    println!();
}
