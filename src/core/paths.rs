//! Path and environment resolution
//!
//! Handles config file discovery and vector index location.

use std::path::{Path, PathBuf};

/// Environment variable for the config file path
pub const CONFIG_PATH_ENV: &str = "RESOURCE_FINDER_CONFIG";
/// Environment variable overriding the vector store directory
pub const INDEX_DIR_ENV: &str = "RESOURCE_INDEX_DIR";
/// Environment variable holding the relational database connection string
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
/// Environment variable overriding the listen port
pub const PORT_ENV: &str = "RESOURCE_FINDER_PORT";

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "resource-finder.json";
/// Default vector store directory
pub const DEFAULT_INDEX_DIR: &str = "./vector_index";
/// SQLite file inside the vector store directory
pub const INDEX_DB_FILE: &str = "index.db";

/// Resolved locations of the vector store
#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub dir: PathBuf,
    pub db: PathBuf,
}

impl IndexPaths {
    pub fn from_dir(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            db: dir.join(INDEX_DB_FILE),
        }
    }
}

/// Get config file path.
/// Priority: RESOURCE_FINDER_CONFIG env var > ./resource-finder.json
pub fn get_config_path() -> PathBuf {
    match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => PathBuf::from(CONFIG_FILE),
    }
}
