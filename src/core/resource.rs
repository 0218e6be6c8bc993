//! Resource records and the in-memory store

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::{Error, Result};

/// A single directory entry describing a service or program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub eligibility: Option<String>,
    #[serde(default)]
    pub service_type: Option<String>,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub min_age: Option<i64>,
    #[serde(default)]
    pub max_age: Option<i64>,
    #[serde(default)]
    pub counties: Option<Vec<String>>,
    #[serde(default)]
    pub insurance_types: Option<Vec<String>>,
    #[serde(default)]
    pub partners: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl Resource {
    /// Text used for embedding: name, description and eligibility,
    /// blank parts omitted, joined by newlines.
    pub fn document_text(&self) -> String {
        [
            Some(self.name.as_str()),
            self.description.as_deref(),
            self.eligibility.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
    }

    pub fn from_row(id: i64, row: ResourceRow) -> Option<Self> {
        let name = row.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())?;
        Some(Self {
            id,
            name,
            url: row.url,
            description: row.description,
            eligibility: row.eligibility,
            service_type: row.service_type,
            system: row.system,
            min_age: row.min_age,
            max_age: row.max_age,
            counties: row.counties,
            insurance_types: row.insurance_types,
            partners: row.partners,
            tags: row.tags,
        })
    }
}

/// A normalized ingestion row, before the store assigns an id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRow {
    pub name: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub eligibility: Option<String>,
    pub service_type: Option<String>,
    pub system: Option<String>,
    pub min_age: Option<i64>,
    pub max_age: Option<i64>,
    pub counties: Option<Vec<String>>,
    pub insurance_types: Option<Vec<String>>,
    pub partners: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

/// Read-only collection of resources held for the process lifetime
#[derive(Debug, Clone, Default)]
pub struct ResourceStore {
    resources: Vec<Resource>,
}

impl ResourceStore {
    pub fn new(resources: Vec<Resource>) -> Self {
        Self { resources }
    }

    /// Build a store from ingested rows, assigning ids `1..` in row order.
    /// Rows without a name are dropped.
    pub fn from_rows(rows: Vec<ResourceRow>) -> Self {
        let mut resources = Vec::with_capacity(rows.len());
        let mut next_id = 1;

        for (index, row) in rows.into_iter().enumerate() {
            match Resource::from_row(next_id, row) {
                Some(resource) => {
                    resources.push(resource);
                    next_id += 1;
                }
                None => warn!(row = index, "Skipping row without a name"),
            }
        }

        Self { resources }
    }

    /// Store preloaded with the built-in demo records
    pub fn seeded() -> Self {
        Self::new(seed_resources())
    }

    pub fn all(&self) -> &[Resource] {
        &self.resources
    }

    pub fn get(&self, id: i64) -> Result<&Resource> {
        self.resources
            .iter()
            .find(|r| r.id == id)
            .ok_or(Error::NotFound(id))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

fn strings(items: &[&str]) -> Option<Vec<String>> {
    Some(items.iter().map(|s| s.to_string()).collect())
}

/// Demo dataset served by `/demo` when no data source is configured
pub fn seed_resources() -> Vec<Resource> {
    vec![
        Resource {
            id: 1,
            name: "Resource One".to_string(),
            url: Some("https://example.com/1".to_string()),
            description: Some("First example resource".to_string()),
            eligibility: Some("Teens aged 13 to 18 and their families".to_string()),
            service_type: Some("outpatient".to_string()),
            system: Some("Healthcare".to_string()),
            min_age: Some(13),
            max_age: Some(18),
            counties: strings(&["Alameda"]),
            insurance_types: strings(&["Medicaid", "Private"]),
            partners: strings(&["County Behavioral Health"]),
            tags: strings(&["example", "demo"]),
        },
        Resource {
            id: 2,
            name: "Resource Two".to_string(),
            url: Some("https://example.com/2".to_string()),
            description: Some("Second example resource".to_string()),
            eligibility: Some("Children under 6".to_string()),
            service_type: Some("early intervention".to_string()),
            system: Some("Education".to_string()),
            min_age: Some(0),
            max_age: Some(5),
            counties: strings(&["Contra Costa"]),
            insurance_types: strings(&["Medicaid"]),
            partners: None,
            tags: strings(&["sample"]),
        },
        Resource {
            id: 3,
            name: "Resource Three".to_string(),
            url: Some("https://example.com/3".to_string()),
            description: Some("Third example resource".to_string()),
            eligibility: Some("Transition-age youth up to 25".to_string()),
            service_type: Some("residential".to_string()),
            system: Some("Housing".to_string()),
            min_age: None,
            max_age: Some(25),
            counties: strings(&["Alameda", "Contra Costa"]),
            insurance_types: strings(&["None", "Medicaid"]),
            partners: strings(&["Youth Housing Alliance"]),
            tags: strings(&["demo"]),
        },
        Resource {
            id: 4,
            name: "Resource Four".to_string(),
            url: Some("https://example.com/4".to_string()),
            description: Some("Fourth example resource".to_string()),
            eligibility: Some("Adults 18 to 64".to_string()),
            service_type: Some("outpatient".to_string()),
            system: Some("Healthcare".to_string()),
            min_age: Some(18),
            max_age: Some(64),
            counties: strings(&["San Francisco"]),
            insurance_types: strings(&["Private"]),
            partners: None,
            tags: strings(&["demo", "test"]),
        },
        Resource {
            id: 5,
            name: "Resource Five".to_string(),
            url: Some("https://example.com/5".to_string()),
            description: Some("Fifth example resource".to_string()),
            eligibility: None,
            service_type: Some("drop-in".to_string()),
            system: Some("Housing".to_string()),
            min_age: None,
            max_age: None,
            counties: strings(&["Alameda"]),
            insurance_types: None,
            partners: strings(&["Family Resource Network"]),
            tags: strings(&["example"]),
        },
    ]
}
