//! Index command - build the vector index

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use resource_finder::core::config::Config;
use resource_finder::search::VectorIndex;

use super::load_store;

pub fn run(
    config: &Config,
    source: Option<&Path>,
    status_only: bool,
    rebuild: bool,
    json: bool,
) -> Result<()> {
    let db_path = config.index.paths().db;

    if status_only {
        return show_status(config, &db_path, json);
    }

    if rebuild && db_path.exists() {
        std::fs::remove_file(&db_path)?;
        if !json {
            println!("{} Removed existing index", "→".dimmed());
        }
    }

    let store = load_store(config, source)?;
    let index = VectorIndex::from_config(&config.index);

    if !json {
        println!("{} Building search index...", "→".dimmed());
    }

    let stats = index.index(store.all()).context("Indexing failed")?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "indexed": stats.indexed,
                "skipped": stats.skipped,
                "removed": stats.removed,
                "duration_ms": stats.duration_ms,
            })
        );
    } else {
        println!();
        println!(
            "{} Indexed {} resources in {:.2}s",
            "✓".green().bold(),
            stats.indexed.to_string().cyan(),
            stats.duration_ms as f64 / 1000.0
        );
        if stats.skipped > 0 {
            println!(
                "  {} {} resources skipped (no text)",
                "→".dimmed(),
                stats.skipped
            );
        }
        if stats.removed > 0 {
            println!(
                "  {} {} stale entries removed",
                "→".dimmed(),
                stats.removed
            );
        }
        println!("  {} Index saved to: {}", "→".dimmed(), db_path.display());
    }

    Ok(())
}

/// Show index status
fn show_status(config: &Config, db_path: &Path, json: bool) -> Result<()> {
    if !db_path.exists() {
        if json {
            println!(
                "{}",
                serde_json::json!({
                    "exists": false,
                    "error": "Index not found"
                })
            );
        } else {
            println!(
                "{} Index not found. Run {} first.",
                "!".yellow().bold(),
                "resource-finder index".cyan()
            );
        }
        return Ok(());
    }

    let stats = VectorIndex::from_config(&config.index).stats()?;
    let file_size = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    if json {
        println!(
            "{}",
            serde_json::json!({
                "exists": true,
                "document_count": stats.document_count,
                "dimension": stats.dimension,
                "last_indexed": stats.last_indexed,
                "file_size_bytes": file_size,
            })
        );
    } else {
        println!("{}", "Index Status".bold());
        println!();
        println!(
            "  {} {} resources indexed",
            "→".dimmed(),
            stats.document_count.to_string().cyan()
        );
        if let Some(dim) = stats.dimension {
            println!("  {} {} dimensions", "→".dimmed(), dim);
        }
        println!(
            "  {} Size: {:.2} KB",
            "→".dimmed(),
            file_size as f64 / 1024.0
        );
        if let Some(ts) = stats.last_indexed {
            let dt = chrono::DateTime::from_timestamp(ts, 0)
                .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            println!("  {} Last indexed: {}", "→".dimmed(), dt);
        }
    }

    Ok(())
}
