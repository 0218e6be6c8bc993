//! Typed spreadsheet cells and per-field coercion
//!
//! Every coercion returns `None` for "unset" instead of failing, so a bad
//! cell never drops its row.

use calamine::Data;
use serde_json::Value;

/// A raw cell value from a workbook or JSON record
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<Cell>),
}

impl Cell {
    /// Missing, NaN or whitespace-only
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Float(f) => f.is_nan(),
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Render as plain text the way a spreadsheet user would read it
    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => format_float(*f),
            Cell::Bool(b) => b.to_string(),
            Cell::List(items) => items
                .iter()
                .map(Cell::to_text)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Int(i) => Cell::Int(*i),
            Data::Float(f) => Cell::Float(*f),
            Data::Bool(b) => Cell::Bool(*b),
            other => Cell::Text(other.to_string()),
        }
    }
}

impl From<&Value> for Cell {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Empty,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Int(i),
                None => n.as_f64().map(Cell::Float).unwrap_or(Cell::Empty),
            },
            Value::String(s) => Cell::Text(s.clone()),
            Value::Array(items) => Cell::List(items.iter().map(Cell::from).collect()),
            Value::Object(_) => Cell::Text(value.to_string()),
        }
    }
}

/// List-valued field: a list cell is trimmed element-wise, anything else
/// is split on commas. Empty pieces are dropped.
pub fn as_list(cell: &Cell) -> Option<Vec<String>> {
    if cell.is_blank() {
        return None;
    }
    match cell {
        Cell::List(items) => Some(
            items
                .iter()
                .map(|item| item.to_text().trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
        ),
        other => Some(
            other
                .to_text()
                .split(',')
                .map(str::trim)
                .filter(|piece| !piece.is_empty())
                .map(String::from)
                .collect(),
        ),
    }
}

/// Integer field: numeric coercion, anything unparseable is unset
pub fn as_int(cell: &Cell) -> Option<i64> {
    if cell.is_blank() {
        return None;
    }
    match cell {
        Cell::Int(i) => Some(*i),
        Cell::Float(f) if f.is_finite() => Some(f.trunc() as i64),
        Cell::Bool(b) => Some(i64::from(*b)),
        Cell::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Text field
pub fn as_text(cell: &Cell) -> Option<String> {
    if cell.is_blank() {
        return None;
    }
    Some(cell.to_text())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn test_list_splits_on_commas() {
        assert_eq!(
            as_list(&text("Alameda, Contra Costa ,, Marin")),
            Some(vec![
                "Alameda".to_string(),
                "Contra Costa".to_string(),
                "Marin".to_string()
            ])
        );
    }

    #[test]
    fn test_list_blank_is_unset_not_empty() {
        assert_eq!(as_list(&Cell::Empty), None);
        assert_eq!(as_list(&Cell::Float(f64::NAN)), None);
        assert_eq!(as_list(&text("   ")), None);
        assert_eq!(as_list(&text(" , ")), Some(vec![]));
    }

    #[test]
    fn test_list_cell_passthrough() {
        let cell = Cell::List(vec![text(" teens "), text(""), Cell::Int(42)]);
        assert_eq!(
            as_list(&cell),
            Some(vec!["teens".to_string(), "42".to_string()])
        );
    }

    #[test]
    fn test_int_coercion() {
        assert_eq!(as_int(&Cell::Int(13)), Some(13));
        assert_eq!(as_int(&Cell::Float(18.0)), Some(18));
        assert_eq!(as_int(&Cell::Float(18.7)), Some(18));
        assert_eq!(as_int(&text(" 21 ")), Some(21));
        assert_eq!(as_int(&text("N/A")), None);
        assert_eq!(as_int(&Cell::Float(f64::NAN)), None);
        assert_eq!(as_int(&Cell::Float(f64::INFINITY)), None);
        assert_eq!(as_int(&Cell::Empty), None);
    }

    #[test]
    fn test_text_coercion() {
        assert_eq!(as_text(&text("Healthcare")), Some("Healthcare".to_string()));
        assert_eq!(as_text(&Cell::Float(3.0)), Some("3".to_string()));
        assert_eq!(as_text(&Cell::Float(2.5)), Some("2.5".to_string()));
        assert_eq!(as_text(&text("")), None);
        assert_eq!(as_text(&Cell::Float(f64::NAN)), None);
    }

    #[test]
    fn test_from_json_value() {
        let value: Value = serde_json::json!(["a", 1, null]);
        assert_eq!(
            Cell::from(&value),
            Cell::List(vec![text("a"), Cell::Int(1), Cell::Empty])
        );
        assert_eq!(Cell::from(&serde_json::json!(2.5)), Cell::Float(2.5));
    }

    #[test]
    fn test_from_calamine_data() {
        assert_eq!(Cell::from(&Data::Empty), Cell::Empty);
        assert_eq!(Cell::from(&Data::Float(7.0)), Cell::Float(7.0));
        assert_eq!(Cell::from(&Data::String("x".into())), text("x"));
    }
}
