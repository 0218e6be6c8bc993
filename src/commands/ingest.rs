//! Ingest command - preview normalized rows from a workbook or JSON file

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use resource_finder::core::config::Config;
use resource_finder::core::resource::{Resource, ResourceStore};
use resource_finder::ingest;

use super::load_tagger;

pub fn run(config: &Config, path: &Path, tag: bool, json: bool) -> Result<()> {
    let mut rows =
        ingest::load(path).with_context(|| format!("Failed to load {}", path.display()))?;
    let row_count = rows.len();

    if tag {
        rows = load_tagger(config).tag_records(rows, config.tagger.top_k);
    }

    let store = ResourceStore::from_rows(rows);

    if json {
        println!("{}", serde_json::to_string_pretty(store.all())?);
        return Ok(());
    }

    println!(
        "{} {} rows read from {}",
        "→".dimmed(),
        row_count.to_string().cyan(),
        path.display()
    );
    let skipped = row_count - store.len();
    if skipped > 0 {
        println!("  {} {} rows without a name skipped", "!".yellow(), skipped);
    }
    println!();

    for resource in store.all() {
        print_resource(resource);
    }

    Ok(())
}

fn print_resource(resource: &Resource) {
    println!(
        "{}. {}",
        resource.id.to_string().bold(),
        resource.name.cyan()
    );

    let ages = match (resource.min_age, resource.max_age) {
        (None, None) => None,
        (min, max) => Some(format!(
            "{}-{}",
            min.map_or("?".to_string(), |v| v.to_string()),
            max.map_or("?".to_string(), |v| v.to_string())
        )),
    };

    let details: Vec<String> = [
        resource.system.clone(),
        ages.map(|a| format!("ages {a}")),
        resource.counties.as_ref().map(|c| c.join(", ")),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !details.is_empty() {
        println!("   {}", details.join(" | "));
    }

    if let Some(tags) = resource.tags.as_ref().filter(|t| !t.is_empty()) {
        println!("   {}", format!("#{}", tags.join(" #")).dimmed());
    }
}
