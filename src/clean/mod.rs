// src/clean/mod.rs

use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::trace;

use crate::table::RawTable;

/// Numbers written with `,` as the thousands separator, e.g. `12,345.60`.
static THOUSANDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?\d{1,3}(,\d{3})+(\.\d*)?$").expect("thousands regex should compile")
});

/// A cell value: text or number. Serialized as a bare JSON string or number.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub const ZERO: Value = Value::Int(0);

    /// NaN, infinities, their text spellings and empty text.
    fn is_unrepresentable(&self) -> bool {
        match self {
            Value::Int(_) => false,
            Value::Float(f) => !f.is_finite(),
            Value::Text(s) => s.is_empty() || s == "nan" || s == "NaN",
        }
    }
}

/// One output record. Keys keep the table's column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanedRow {
    fields: Vec<(String, Value)>,
}

impl CleanedRow {
    /// Set `key`. A key seen before keeps its position and takes the new value.
    pub fn insert(&mut self, key: String, value: Value) {
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, v)| v)
    }
}

impl Serialize for CleanedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Turn a raw table into JSON-safe records.
pub fn clean_table(table: RawTable) -> Vec<CleanedRow> {
    let columns = trim_columns(&table.columns);

    let sanitized: Vec<Vec<Value>> = table
        .rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|raw| sanitize(coerce(raw)))
                .collect()
        })
        .collect();

    let rows = materialize(&columns, sanitized);
    trace!(rows = rows.len(), columns = columns.len(), "cleaned table");
    rows
}

pub fn trim_columns(columns: &[String]) -> Vec<String> {
    columns.iter().map(|c| c.trim().to_string()).collect()
}

/// Numeric text becomes a number, anything else stays text. `None` stays missing.
pub fn coerce(raw: Option<String>) -> Option<Value> {
    raw.map(|text| match parse_number(&text) {
        Some(v) => v,
        None => Value::Text(text),
    })
}

/// Integer when it fits `i64`, float otherwise. Accepts `nan`/`inf` spellings
/// and `,` thousands separators.
pub fn parse_number(text: &str) -> Option<Value> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }

    let owned;
    let s = if THOUSANDS.is_match(s) {
        owned = s.replace(',', "");
        owned.as_str()
    } else {
        s
    };

    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::Int(i));
    }
    s.parse::<f64>().ok().map(Value::Float)
}

/// Missing cells and unrepresentable values become zero.
pub fn sanitize(value: Option<Value>) -> Value {
    match value {
        Some(v) if !v.is_unrepresentable() => v,
        _ => Value::ZERO,
    }
}

fn materialize(columns: &[String], rows: Vec<Vec<Value>>) -> Vec<CleanedRow> {
    rows.into_iter()
        .map(|row| {
            let mut record = CleanedRow::default();
            let mut cells = row.into_iter();
            for column in columns {
                record.insert(column.clone(), finalize(cells.next()));
            }
            record
        })
        .collect()
}

/// Last check before serialization.
fn finalize(value: Option<Value>) -> Value {
    match value {
        None => Value::ZERO,
        Some(Value::Float(f)) if f.is_nan() || f.is_infinite() => Value::ZERO,
        Some(v) => v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(columns: &[&str], rows: &[&[Option<&str>]]) -> RawTable {
        RawTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.map(str::to_string)).collect())
                .collect(),
        }
    }

    #[test]
    fn nan_empty_and_numeric_text() {
        let table = raw(
            &["Price"],
            &[&[Some("NaN")], &[Some("")], &[Some("12.5")]],
        );
        let rows = clean_table(table);
        let prices: Vec<&Value> = rows.iter().map(|r| r.get("Price").unwrap()).collect();
        assert_eq!(
            prices,
            vec![&Value::Int(0), &Value::Int(0), &Value::Float(12.5)]
        );
    }

    #[test]
    fn column_names_are_trimmed() {
        let table = raw(
            &["  Ticker ", "\tVolume\n"],
            &[&[Some("SCOM"), Some("100")]],
        );
        let rows = clean_table(table);
        assert_eq!(rows[0].keys().collect::<Vec<_>>(), vec!["Ticker", "Volume"]);
    }

    #[test]
    fn mixed_columns_keep_text_cells() {
        let table = raw(
            &["Change"],
            &[&[Some("+0.25")], &[Some("-")], &[Some("1.5%")]],
        );
        let rows = clean_table(table);
        assert_eq!(rows[0].get("Change"), Some(&Value::Float(0.25)));
        assert_eq!(rows[1].get("Change"), Some(&Value::Text("-".into())));
        assert_eq!(rows[2].get("Change"), Some(&Value::Text("1.5%".into())));
    }

    #[test]
    fn infinities_and_missing_cells_become_zero() {
        let table = raw(
            &["A", "B", "C"],
            &[&[Some("inf"), Some("-Infinity"), None]],
        );
        let rows = clean_table(table);
        assert!(rows[0].values().all(|v| *v == Value::ZERO));
    }

    #[test]
    fn no_unrepresentable_values_survive() {
        let table = raw(
            &["a", "b", "c", "d", "e"],
            &[
                &[Some("nan"), Some("NaN"), Some(""), Some("inf"), None],
                &[Some("1"), Some("x"), Some(" "), Some("2.0"), Some("-inf")],
            ],
        );
        for row in clean_table(table) {
            for v in row.values() {
                match v {
                    Value::Float(f) => assert!(f.is_finite()),
                    Value::Text(s) => assert!(!s.is_empty() && s != "nan" && s != "NaN"),
                    Value::Int(_) => {}
                }
            }
        }
    }

    #[test]
    fn parse_number_variants() {
        assert_eq!(parse_number("42"), Some(Value::Int(42)));
        assert_eq!(parse_number(" 7 "), Some(Value::Int(7)));
        assert_eq!(parse_number("1,234"), Some(Value::Int(1234)));
        assert_eq!(parse_number("12,345.60"), Some(Value::Float(12345.6)));
        assert_eq!(parse_number("1e3"), Some(Value::Float(1000.0)));
        assert_eq!(parse_number("Safaricom"), None);
        assert_eq!(parse_number("1,23"), None);
        assert!(matches!(parse_number("NaN"), Some(Value::Float(f)) if f.is_nan()));
    }

    #[test]
    fn keys_equal_after_trim_keep_first_slot_and_last_value() {
        let table = raw(&["Vol", "Name", "Vol "], &[&[Some("1"), Some("x"), Some("2")]]);
        let rows = clean_table(table);
        assert_eq!(rows[0].keys().collect::<Vec<_>>(), vec!["Vol", "Name"]);
        assert_eq!(rows[0].get("Vol"), Some(&Value::Int(2)));
    }

    #[test]
    fn rows_serialize_in_column_order() {
        let table = raw(
            &["Ticker", "Price", "Name"],
            &[&[Some("KCB"), Some("38.5"), Some("KCB Group")]],
        );
        let rows = clean_table(table);
        let json = serde_json::to_string(&rows).unwrap();
        assert_eq!(
            json,
            r#"[{"Ticker":"KCB","Price":38.5,"Name":"KCB Group"}]"#
        );
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, json!([{"Ticker": "KCB", "Price": 38.5, "Name": "KCB Group"}]));
    }

    #[test]
    fn zero_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Value::ZERO).unwrap(), "0");
    }
}
