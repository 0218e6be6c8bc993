//! Domain error taxonomy
//!
//! Only `NotFound` and `ConfigurationMissing` ever reach a caller.
//! `AdapterUnavailable` is recovered inside the search engine and
//! malformed spreadsheet cells never become errors at all.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Resource not found: {0}")]
    NotFound(i64),

    #[error("vector index unavailable: {0}")]
    AdapterUnavailable(String),

    #[error("missing required configuration: {0}")]
    ConfigurationMissing(&'static str),

    #[error("ingestion failed for {path}: {message}")]
    Ingest { path: String, message: String },

    #[error("embedding failed: {0}")]
    Embedding(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn ingest(path: impl AsRef<std::path::Path>, message: impl ToString) -> Self {
        Self::Ingest {
            path: path.as_ref().display().to_string(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = Error::NotFound(999);
        assert_eq!(err.to_string(), "Resource not found: 999");
    }

    #[test]
    fn test_ingest_error_carries_path() {
        let err = Error::ingest("/tmp/data.xlsx", "bad zip");
        assert!(err.to_string().contains("/tmp/data.xlsx"));
        assert!(err.to_string().contains("bad zip"));
    }
}
