mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use resource_finder::core::config::Config;
use resource_finder::core::paths::CONFIG_PATH_ENV;
use resource_finder::search::SearchQuery;

#[derive(Parser)]
#[command(name = "resource-finder")]
#[command(about = "Community resource directory with keyword and semantic search", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(long, global = true, env = CONFIG_PATH_ENV, help = "Config file (default: resource-finder.json)")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API (default)
    Serve,

    /// Write a default config file
    Init {
        #[arg(long, help = "Overwrite an existing config file")]
        force: bool,
    },

    /// Load and normalize a workbook or JSON file
    Ingest {
        path: PathBuf,
        #[arg(long, help = "Replace tags with extracted keywords")]
        tag: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },

    /// Build the vector index
    Index {
        #[arg(long, help = "Data file (default: configured source or seed data)")]
        source: Option<PathBuf>,
        #[arg(long, help = "Show index status only")]
        status: bool,
        #[arg(long, help = "Force rebuild index")]
        rebuild: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },

    /// Search resources
    Search {
        keyword: Option<String>,
        #[arg(long)]
        age: Option<i64>,
        #[arg(long)]
        county: Option<String>,
        #[arg(long)]
        insurance: Option<String>,
        #[arg(long, help = "System (repeatable)")]
        system: Vec<String>,
        #[arg(long, help = "Tag (repeatable)")]
        tag: Vec<String>,
        #[arg(long, help = "Data file (default: configured source or seed data)")]
        source: Option<PathBuf>,
        #[arg(long, help = "Skip semantic re-ranking")]
        fallback: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },

    /// Extract tags from a name and description
    Tags {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long, help = "Number of tags")]
        limit: Option<usize>,
        #[arg(long, help = "Word frequency only (no model)")]
        frequency: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("resource_finder=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    (!values.is_empty()).then_some(values)
}

fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let mut config = Config::load_file_or_default(path);
            config.apply_env(|key| std::env::var(key).ok());
            config
        }
        None => Config::load(),
    };

    match cli.command {
        None | Some(Commands::Serve) => run_server(config),

        Some(Commands::Init { force }) => commands::init::run(cli.config.as_deref(), force),
        Some(Commands::Ingest { path, tag, json }) => {
            commands::ingest::run(&config, &path, tag, json)
        }
        Some(Commands::Index {
            source,
            status,
            rebuild,
            json,
        }) => commands::index::run(&config, source.as_deref(), status, rebuild, json),
        Some(Commands::Search {
            keyword,
            age,
            county,
            insurance,
            system,
            tag,
            source,
            fallback,
            json,
        }) => {
            let query = SearchQuery {
                keyword,
                tags: non_empty(tag),
                age,
                county,
                insurance,
                system: non_empty(system),
            };
            commands::search::run(&config, source.as_deref(), query, fallback, json)
        }
        Some(Commands::Tags {
            name,
            description,
            limit,
            frequency,
            json,
        }) => commands::tags::run(
            &config,
            &name,
            description.as_deref(),
            limit,
            frequency,
            json,
        ),
    }
}

#[cfg(feature = "server")]
fn run_server(config: Config) -> anyhow::Result<()> {
    commands::serve::run(config)
}

#[cfg(not(feature = "server"))]
fn run_server(_config: Config) -> anyhow::Result<()> {
    eprintln!("Server feature not enabled. Build with --features server");
    std::process::exit(1);
}
