//! Keyword tagging for resources
//!
//! # Components
//!
//! - `keyword`: Model2Vec token-embedding keyword extractor (primary)
//! - `frequency`: stop-word filtered word counts (fallback)
//! - `tagger`: strategy selection and record tagging

pub mod frequency;
pub mod keyword;
pub mod tagger;

pub use frequency::extract_by_frequency;
pub use keyword::{Keyword, KeywordExtractor};
pub use tagger::{KeywordSource, Taggable, Tagger, DEFAULT_TOP_K};
