//! Tabular ingestion
//!
//! Reads spreadsheet workbooks (or JSON record files) and normalizes every
//! row into a [`ResourceRow`]. Column headers are normalized, unknown
//! columns are dropped and each recognized cell goes through a typed
//! coercion in [`cell`].

pub mod cell;

use std::collections::HashMap;
use std::path::Path;

use calamine::{open_workbook_auto, Reader};
use serde_json::Value;
use tracing::{debug, info};

use crate::core::error::{Error, Result};
use crate::core::resource::ResourceRow;
use cell::{as_int, as_list, as_text, Cell};

/// Sheets beyond this count are ignored
pub const MAX_SHEETS: usize = 10;

/// Recognized column names after header normalization
pub const FIELDS: [&str; 12] = [
    "name",
    "description",
    "eligibility",
    "system",
    "service_type",
    "min_age",
    "max_age",
    "counties",
    "insurance_types",
    "partners",
    "tags",
    "url",
];

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// A raw row keyed by normalized header
pub type RawRow = HashMap<String, Cell>;

/// Trim, lowercase, and replace each space with an underscore
pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// Extract the recognized fields from a raw row
pub fn normalize_row(row: &RawRow) -> ResourceRow {
    let get = |field: &str| row.get(field).unwrap_or(&Cell::Empty);

    ResourceRow {
        name: as_text(get("name")),
        url: as_text(get("url")),
        description: as_text(get("description")),
        eligibility: as_text(get("eligibility")),
        service_type: as_text(get("service_type")),
        system: as_text(get("system")),
        min_age: as_int(get("min_age")),
        max_age: as_int(get("max_age")),
        counties: as_list(get("counties")),
        insurance_types: as_list(get("insurance_types")),
        partners: as_list(get("partners")),
        tags: as_list(get("tags")),
    }
}

/// Load and normalize resources from a workbook or a JSON array of objects
pub fn load(path: &Path) -> Result<Vec<ResourceRow>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let rows = if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
        load_workbook(path)?
    } else if extension == "json" {
        load_json(path)?
    } else {
        return Err(Error::ingest(
            path,
            format!("unsupported file type '{}'", extension),
        ));
    };

    info!(path = %path.display(), rows = rows.len(), "Loaded resource rows");
    Ok(rows)
}

fn load_workbook(path: &Path) -> Result<Vec<ResourceRow>> {
    let mut workbook = open_workbook_auto(path).map_err(|e| Error::ingest(path, e))?;
    let sheet_names = workbook.sheet_names();

    if sheet_names.len() > MAX_SHEETS {
        debug!(
            total = sheet_names.len(),
            "Ignoring sheets beyond the first {}", MAX_SHEETS
        );
    }

    let mut rows = Vec::new();
    for sheet in sheet_names.iter().take(MAX_SHEETS) {
        let range = workbook
            .worksheet_range(sheet)
            .map_err(|e| Error::ingest(path, format!("sheet '{}': {}", sheet, e)))?;

        let mut sheet_rows = range.rows();
        let Some(header) = sheet_rows.next() else {
            continue;
        };
        let headers: Vec<String> = header
            .iter()
            .map(|data| normalize_header(&Cell::from(data).to_text()))
            .collect();

        let before = rows.len();
        for data_row in sheet_rows {
            let cells: Vec<Cell> = data_row.iter().map(Cell::from).collect();
            if cells.iter().all(Cell::is_blank) {
                continue;
            }
            rows.push(normalize_row(&zip_row(&headers, cells)));
        }
        debug!(sheet = %sheet, rows = rows.len() - before, "Parsed sheet");
    }

    Ok(rows)
}

fn zip_row(headers: &[String], cells: Vec<Cell>) -> RawRow {
    let mut row = RawRow::new();
    for (header, cell) in headers.iter().zip(cells) {
        // first column wins when headers collide
        row.entry(header.clone()).or_insert(cell);
    }
    row
}

fn load_json(path: &Path) -> Result<Vec<ResourceRow>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::ingest(path, e))?;
    let value: Value = serde_json::from_str(&content).map_err(|e| Error::ingest(path, e))?;

    let Value::Array(records) = value else {
        return Err(Error::ingest(path, "expected a JSON array of objects"));
    };

    let rows = records
        .iter()
        .filter_map(Value::as_object)
        .map(|object| {
            let row: RawRow = object
                .iter()
                .map(|(key, value)| (normalize_header(key), Cell::from(value)))
                .collect();
            normalize_row(&row)
        })
        .collect();

    Ok(rows)
}
