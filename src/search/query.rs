//! Structured search query

use serde::{Deserialize, Serialize};

/// Search request accepted by the engine and by `POST /search`.
///
/// Empty strings and empty lists count as unset, matching what web forms
/// send for untouched filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default, alias = "filters")]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default)]
    pub insurance: Option<String>,
    #[serde(default)]
    pub system: Option<Vec<String>>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn non_empty(values: &Option<Vec<String>>) -> Option<&[String]> {
    values.as_deref().filter(|v| !v.is_empty())
}

impl SearchQuery {
    pub fn keyword(&self) -> Option<&str> {
        self.keyword.as_deref().filter(|k| !k.is_empty())
    }

    pub fn tags(&self) -> Option<&[String]> {
        non_empty(&self.tags)
    }

    pub fn county(&self) -> Option<&str> {
        non_blank(&self.county)
    }

    pub fn insurance(&self) -> Option<&str> {
        non_blank(&self.insurance)
    }

    pub fn system(&self) -> Option<&[String]> {
        non_empty(&self.system)
    }

    /// True when no filter is active
    pub fn is_empty(&self) -> bool {
        self.keyword().is_none()
            && self.tags().is_none()
            && self.age.is_none()
            && self.county().is_none()
            && self.insurance().is_none()
            && self.system().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_fields_are_unset() {
        let query: SearchQuery = serde_json::from_str(
            r#"{"keyword": "", "county": "  ", "insurance": "", "system": [], "tags": []}"#,
        )
        .unwrap();
        assert!(query.is_empty());
    }

    #[test]
    fn test_filters_alias_for_tags() {
        let query: SearchQuery = serde_json::from_str(r#"{"filters": ["demo"]}"#).unwrap();
        assert_eq!(query.tags(), Some(&["demo".to_string()][..]));
    }

    #[test]
    fn test_full_request() {
        let query: SearchQuery = serde_json::from_str(
            r#"{"keyword": "residential", "age": 20, "county": "Alameda",
                "insurance": "Medicaid", "system": ["Housing"], "tags": ["teens"]}"#,
        )
        .unwrap();
        assert_eq!(query.keyword(), Some("residential"));
        assert_eq!(query.age, Some(20));
        assert_eq!(query.county(), Some("Alameda"));
        assert!(!query.is_empty());
    }
}
