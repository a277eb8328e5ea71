//! JSON reader.
//!
//! Accepted layouts, tried in order:
//! 1. an array of records: `[{"a": 1}, {"a": 2}]`
//! 2. an object of columns: `{"a": [1, 2]}` or `{"a": {"0": 1, "1": 2}}`
//! 3. newline-delimited records
//!
//! Column order is first-seen key order. Numbers keep their literal text,
//! other scalars are rendered as text, `null` and missing keys as `""`,
//! nested values as compact JSON.

use bytes::Bytes;
use serde_json::{Map, Value};
use snafu::prelude::*;

use super::{FileFormat, FormatReader};
use crate::error::{AssembleSnafu, JsonLayoutSnafu, JsonSnafu, ReaderError};
use crate::table::TabularDataset;

/// Reads JSON documents in records, columns or NDJSON layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReader;

impl FormatReader for JsonReader {
    fn read(&self, data: Bytes) -> Result<TabularDataset, ReaderError> {
        if data.trim_ascii().is_empty() {
            return assemble(Vec::new(), Vec::new());
        }

        match serde_json::from_slice::<Value>(&data) {
            Ok(Value::Array(items)) => from_records(items),
            Ok(Value::Object(map)) if is_columnar(&map) => from_columns(map),
            Ok(Value::Object(map)) => from_records(vec![Value::Object(map)]),
            Ok(other) => JsonLayoutSnafu {
                message: format!("top-level {} is not tabular", type_name(&other)),
            }
            .fail(),
            Err(_) => from_ndjson(&data),
        }
    }
}

fn from_records(items: Vec<Value>) -> Result<TabularDataset, ReaderError> {
    let mut records = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        match item {
            Value::Object(map) => records.push(map),
            other => {
                return JsonLayoutSnafu {
                    message: format!("record {idx} is a {}, expected an object", type_name(&other)),
                }
                .fail();
            }
        }
    }

    let mut names: Vec<String> = Vec::new();
    for record in &records {
        for key in record.keys() {
            if !names.contains(key) {
                names.push(key.clone());
            }
        }
    }

    let columns = names
        .iter()
        .map(|name| records.iter().map(|record| render(record.get(name))).collect())
        .collect();
    assemble(names, columns)
}

/// Every value an array, or every value an object.
fn is_columnar(map: &Map<String, Value>) -> bool {
    !map.is_empty()
        && (map.values().all(Value::is_array) || map.values().all(Value::is_object))
}

fn from_columns(map: Map<String, Value>) -> Result<TabularDataset, ReaderError> {
    let names: Vec<String> = map.keys().cloned().collect();

    if map.values().all(Value::is_array) {
        let columns: Vec<Vec<String>> = map
            .values()
            .filter_map(Value::as_array)
            .map(|cells| cells.iter().map(|cell| render(Some(cell))).collect())
            .collect();
        let lengths: Vec<usize> = columns.iter().map(Vec::len).collect();
        ensure!(
            lengths.windows(2).all(|w| w[0] == w[1]),
            JsonLayoutSnafu {
                message: format!("column arrays differ in length: {lengths:?}"),
            }
        );
        return assemble(names, columns);
    }

    // Column orientation: the row index is the union of inner keys.
    let mut index: Vec<&String> = Vec::new();
    for inner in map.values().filter_map(Value::as_object) {
        for key in inner.keys() {
            if !index.contains(&key) {
                index.push(key);
            }
        }
    }

    let columns = map
        .values()
        .filter_map(Value::as_object)
        .map(|inner| index.iter().map(|row| render(inner.get(*row))).collect())
        .collect();
    assemble(names, columns)
}

fn from_ndjson(data: &[u8]) -> Result<TabularDataset, ReaderError> {
    let items = serde_json::Deserializer::from_slice(data)
        .into_iter::<Value>()
        .collect::<Result<Vec<_>, _>>()
        .context(JsonSnafu)?;
    from_records(items)
}

fn render(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(nested) => nested.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn assemble(names: Vec<String>, columns: Vec<Vec<String>>) -> Result<TabularDataset, ReaderError> {
    TabularDataset::from_string_columns(names, columns).context(AssembleSnafu {
        format: FileFormat::Json,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, AsArray};

    fn read(text: &str) -> Result<TabularDataset, ReaderError> {
        JsonReader.read(Bytes::copy_from_slice(text.as_bytes()))
    }

    fn column(table: &TabularDataset, idx: usize) -> Vec<String> {
        let array = table.batch().column(idx).as_string::<i32>();
        (0..array.len()).map(|i| array.value(i).to_string()).collect()
    }

    #[test]
    fn test_records_layout() {
        let table = read(
            r#"[
                {"id": 1, "name": "a", "active": true},
                {"id": 2.5, "extra": null, "name": null},
                {"tags": ["x", "y"], "meta": {"k": 1}}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            table.column_names(),
            vec!["id", "name", "active", "extra", "tags", "meta"]
        );
        assert_eq!(table.num_rows(), 3);
        assert_eq!(column(&table, 0), vec!["1", "2.5", ""]);
        assert_eq!(column(&table, 1), vec!["a", "", ""]);
        assert_eq!(column(&table, 2), vec!["true", "", ""]);
        assert_eq!(column(&table, 4), vec!["", "", r#"["x","y"]"#]);
        assert_eq!(column(&table, 5), vec!["", "", r#"{"k":1}"#]);
    }

    #[test]
    fn test_numbers_keep_literal_text() {
        let table = read(
            r#"[{"a": 1.50, "b": 123456789012345678901234, "c": 1e3, "d": 0.1000000000000000055511, "e": -0}]"#,
        )
        .unwrap();

        let cells: Vec<String> = (0..table.num_columns())
            .map(|idx| column(&table, idx).remove(0))
            .collect();
        assert_eq!(
            cells,
            vec!["1.50", "123456789012345678901234", "1e3", "0.1000000000000000055511", "-0"]
        );
    }

    #[test]
    fn test_object_of_arrays() {
        let table = read(r#"{"b": [1, 2], "a": ["x", null]}"#).unwrap();
        assert_eq!(table.column_names(), vec!["b", "a"]);
        assert_eq!(column(&table, 0), vec!["1", "2"]);
        assert_eq!(column(&table, 1), vec!["x", ""]);
    }

    #[test]
    fn test_object_of_arrays_length_mismatch() {
        let err = read(r#"{"a": [1, 2], "b": [1]}"#).unwrap_err();
        assert!(matches!(err, ReaderError::JsonLayout { .. }));
    }

    #[test]
    fn test_column_orientation() {
        let table = read(r#"{"a": {"0": "x", "1": "y"}, "b": {"1": 5}}"#).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(column(&table, 0), vec!["x", "y"]);
        assert_eq!(column(&table, 1), vec!["", "5"]);
    }

    #[test]
    fn test_ndjson() {
        let table = read("{\"a\": 1}\n{\"a\": 2, \"b\": \"z\"}\n\n").unwrap();
        assert_eq!(table.column_names(), vec!["a", "b"]);
        assert_eq!(column(&table, 1), vec!["", "z"]);
    }

    #[test]
    fn test_single_record_object() {
        let table = read(r#"{"a": 1, "b": "x"}"#).unwrap();
        assert_eq!(table.num_rows(), 1);
        assert_eq!(column(&table, 1), vec!["x"]);
    }

    #[test]
    fn test_non_tabular_layouts() {
        assert!(matches!(
            read("[1, 2, 3]").unwrap_err(),
            ReaderError::JsonLayout { .. }
        ));
        assert!(matches!(
            read("\"text\"").unwrap_err(),
            ReaderError::JsonLayout { .. }
        ));
    }

    #[test]
    fn test_malformed_json() {
        let err = read("{\"a\": 1,").unwrap_err();
        assert!(matches!(err, ReaderError::Json { .. }));
    }

    #[test]
    fn test_empty_input_and_empty_array() {
        assert_eq!(read("").unwrap().num_columns(), 0);
        assert_eq!(read("  \n").unwrap().num_rows(), 0);
        assert_eq!(read("[]").unwrap().num_columns(), 0);
    }
}
