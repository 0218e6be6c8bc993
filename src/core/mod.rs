//! Core types shared by every component: records, configuration, errors

pub mod config;
pub mod error;
pub mod paths;
pub mod resource;

pub use config::{Config, EmbedderKind};
pub use error::{Error, Result};
pub use resource::{seed_resources, Resource, ResourceRow, ResourceStore};
