//! Tags command - extract keyword tags from text

use anyhow::Result;
use colored::*;

use resource_finder::core::config::Config;
use resource_finder::tags::Tagger;

use super::load_tagger;

pub fn run(
    config: &Config,
    name: &str,
    description: Option<&str>,
    limit: Option<usize>,
    frequency_only: bool,
    json: bool,
) -> Result<()> {
    let tagger = if frequency_only {
        Tagger::new()
    } else {
        load_tagger(config)
    };
    let limit = limit.unwrap_or(config.tagger.top_k);

    let tags = tagger.extract_tags(Some(name), description, limit);

    if json {
        println!(
            "{}",
            serde_json::json!({
                "tags": tags,
                "model": tagger.has_model(),
            })
        );
        return Ok(());
    }

    let strategy = if tagger.has_model() {
        "Model2Vec keywords"
    } else {
        "word frequency"
    };
    println!("{} ({})", "Extracted Tags".bold(), strategy.dimmed());
    println!();

    if tags.is_empty() {
        println!("  {}", "No tags found".dimmed());
    } else {
        for (i, tag) in tags.iter().enumerate() {
            println!("  {}. {}", i + 1, tag.cyan());
        }
    }

    Ok(())
}
