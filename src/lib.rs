//! Community resource directory search
//!
//! # Components
//!
//! - `core`: records, store, configuration, errors
//! - `ingest`: spreadsheet and JSON ingestion
//! - `tags`: keyword tagging
//! - `search`: attribute filtering, vector index, semantic re-ranking
//! - `server`: HTTP API

pub mod core;
pub mod ingest;
pub mod search;
#[cfg(feature = "server")]
pub mod server;
pub mod tags;
