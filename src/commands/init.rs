//! Config file generation

use anyhow::Result;
use colored::*;

use resource_finder::core::config::Config;
use resource_finder::core::paths::get_config_path;
use std::path::Path;

pub fn run(path: Option<&Path>, force: bool) -> Result<()> {
    let config_path = path.map_or_else(get_config_path, Path::to_path_buf);

    if config_path.exists() && !force {
        println!(
            "{} {} already exists. Use {} to overwrite.",
            "!".yellow().bold(),
            config_path.display(),
            "--force".cyan()
        );
        return Ok(());
    }

    Config::default().save(&config_path)?;
    println!("{} Created {}", "✓".green(), config_path.display());
    println!();
    println!("Set {} before running {}.", "DATABASE_URL".yellow(), "serve".cyan());

    Ok(())
}
