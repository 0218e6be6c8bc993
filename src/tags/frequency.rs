//! Frequency-based keyword extraction
//!
//! Deterministic fallback used when no keyword model is available.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(r"[a-zA-Z0-9']+").unwrap();

    /// Basic English stop words
    pub static ref STOP_WORDS: HashSet<&'static str> = [
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is",
        "it", "its", "of", "on", "that", "the", "to", "was", "were", "will", "with",
    ]
    .into_iter()
    .collect();
}

/// Tokens of length <= this are never keywords
pub const MIN_TOKEN_LEN: usize = 2;

pub fn is_candidate(token: &str) -> bool {
    token.chars().count() > MIN_TOKEN_LEN && !STOP_WORDS.contains(token)
}

/// Top `top_k` tokens by descending frequency, ties broken by first occurrence
pub fn extract_by_frequency(text: &str, top_k: usize) -> Vec<String> {
    let lowered = text.to_lowercase();

    // token -> (count, first position)
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, m) in TOKEN_RE.find_iter(&lowered).enumerate() {
        let token = m.as_str();
        if !is_candidate(token) {
            continue;
        }
        counts.entry(token).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(token, (count, first))| (token, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(top_k)
        .map(|(token, _, _)| token.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_then_first_occurrence() {
        assert_eq!(
            extract_by_frequency("test test test unique", 2),
            vec!["test", "unique"]
        );
        assert_eq!(
            extract_by_frequency("alpha beta gamma beta", 3),
            vec!["beta", "alpha", "gamma"]
        );
    }

    #[test]
    fn test_drops_stop_words_and_short_tokens() {
        let tags = extract_by_frequency("The food is at an ok pantry for the kids", 10);
        assert_eq!(tags, vec!["food", "pantry", "kids"]);
    }

    #[test]
    fn test_keeps_apostrophes_and_digits() {
        let tags = extract_by_frequency("Children's services 2024 children's", 5);
        assert_eq!(tags, vec!["children's", "services", "2024"]);
    }

    #[test]
    fn test_empty_text() {
        assert!(extract_by_frequency("", 5).is_empty());
        assert!(extract_by_frequency("a an the", 5).is_empty());
    }
}
