//! Service configuration
//!
//! Loading priority:
//! 1. Built-in defaults
//! 2. JSON config file (`resource-finder.json` or `$RESOURCE_FINDER_CONFIG`)
//! 3. Environment overrides (`RESOURCE_INDEX_DIR`, `DATABASE_URL`, `RESOURCE_FINDER_PORT`)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::error::Error;
use super::paths::{
    get_config_path, IndexPaths, DATABASE_URL_ENV, DEFAULT_INDEX_DIR, INDEX_DIR_ENV, PORT_ENV,
};

pub const CONFIG_VERSION: u32 = 1;

/// Default Model2Vec model ID (English, 256d)
pub const DEFAULT_MODEL2VEC_MODEL: &str = "minishlab/potion-base-8M";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub tagger: TaggerConfig,

    #[serde(default)]
    pub data: DataConfig,

    /// Relational database connection string. Required by `serve`.
    #[serde(default)]
    pub database_url: Option<String>,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins. Empty means any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_body_size() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            max_body_size: default_max_body_size(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Which embedding model backs the vector index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Model2Vec static embeddings (requires model download)
    #[default]
    Model2vec,
    /// Built-in hashed bag-of-words, no model file
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_dir")]
    pub dir: PathBuf,

    #[serde(default)]
    pub embedder: EmbedderKind,

    #[serde(default = "default_model_id", rename = "modelId")]
    pub model_id: String,

    /// Local model directory; takes precedence over `model_id`
    #[serde(default, rename = "modelPath")]
    pub model_path: Option<String>,

    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Number of neighbours returned by a semantic query, at most 5
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Seconds to wait before retrying a failed model load
    #[serde(default = "default_init_retry_secs")]
    pub init_retry_secs: u64,
}

fn default_index_dir() -> PathBuf {
    PathBuf::from(DEFAULT_INDEX_DIR)
}

fn default_model_id() -> String {
    DEFAULT_MODEL2VEC_MODEL.to_string()
}

fn default_query_timeout_ms() -> u64 {
    2000
}

fn default_top_n() -> usize {
    5
}

fn default_init_retry_secs() -> u64 {
    30
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: default_index_dir(),
            embedder: EmbedderKind::default(),
            model_id: default_model_id(),
            model_path: None,
            query_timeout_ms: default_query_timeout_ms(),
            top_n: default_top_n(),
            init_retry_secs: default_init_retry_secs(),
        }
    }
}

impl IndexConfig {
    pub fn paths(&self) -> IndexPaths {
        IndexPaths::from_dir(&self.dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggerConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Model2Vec directory with `tokenizer.json` and `model.safetensors`
    #[serde(default, rename = "modelPath")]
    pub model_path: Option<String>,

    /// Replace ingested tags with extracted keywords
    #[serde(default)]
    pub auto_tag: bool,
}

fn default_top_k() -> usize {
    5
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            model_path: None,
            auto_tag: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataConfig {
    /// Workbook or JSON file to load at startup. Seed data when unset.
    #[serde(default)]
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: ServerConfig::default(),
            index: IndexConfig::default(),
            tagger: TaggerConfig::default(),
            data: DataConfig::default(),
            database_url: None,
        }
    }
}

impl Config {
    /// Load config from the default location and apply environment overrides
    pub fn load() -> Self {
        let mut config = Self::load_file_or_default(&get_config_path());
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Load config from `path`, falling back to defaults if missing or invalid
    pub fn load_file_or_default(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }

        match Self::load_from_file(path) {
            Ok(config) => {
                if config.version > CONFIG_VERSION {
                    warn!(
                        "Config version {} is newer than supported version {}.",
                        config.version, CONFIG_VERSION
                    );
                }
                config
            }
            Err(e) => {
                warn!(
                    "Failed to load {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = non_blank(INDEX_DIR_ENV) {
            self.index.dir = PathBuf::from(dir);
        }
        if let Some(url) = non_blank(DATABASE_URL_ENV) {
            self.database_url = Some(url);
        }
        if let Some(port) = non_blank(PORT_ENV) {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("Ignoring invalid {}={}", PORT_ENV, port),
            }
        }
    }

    /// The database URL, which must be present before the server starts
    pub fn require_database_url(&self) -> Result<&str, Error> {
        self.database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(Error::ConfigurationMissing(DATABASE_URL_ENV))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, 1);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.index.dir, PathBuf::from("./vector_index"));
        assert_eq!(config.index.embedder, EmbedderKind::Model2vec);
        assert_eq!(config.index.top_n, 5);
        assert_eq!(config.tagger.top_k, 5);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_parse_partial_config() {
        let json = r#"{"index": {"embedder": "hash", "query_timeout_ms": 250}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.index.embedder, EmbedderKind::Hash);
        assert_eq!(config.index.query_timeout_ms, 250);
        assert_eq!(config.index.model_id, DEFAULT_MODEL2VEC_MODEL);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(env(&[
            (INDEX_DIR_ENV, "/data/index"),
            (DATABASE_URL_ENV, "postgres://localhost/resources"),
            (PORT_ENV, "9090"),
        ]));

        assert_eq!(config.index.dir, PathBuf::from("/data/index"));
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/resources")
        );
        assert_eq!(config.server.port, 9090);
    }

    #[test]
    fn test_invalid_port_is_ignored() {
        let mut config = Config::default();
        config.apply_env(env(&[(PORT_ENV, "not-a-port")]));
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_missing_database_url_is_fatal() {
        let config = Config::default();
        let err = config.require_database_url().unwrap_err();
        assert!(matches!(err, Error::ConfigurationMissing("DATABASE_URL")));

        let mut config = Config::default();
        config.apply_env(env(&[(DATABASE_URL_ENV, "   ")]));
        assert!(config.require_database_url().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resource-finder.json");

        let mut config = Config::default();
        config.server.port = 8123;
        config.tagger.auto_tag = true;
        config.save(&path).unwrap();

        let loaded = Config::load_file_or_default(&path);
        assert_eq!(loaded.server.port, 8123);
        assert!(loaded.tagger.auto_tag);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let config = Config::load_file_or_default(&path);
        assert_eq!(config.server.port, 8000);
    }
}
