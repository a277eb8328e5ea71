//! Schema normalization.
//!
//! Every dataset written to the Silver zone has the same shape of schema:
//! only Utf8 columns, no nulls, no pandas `Unnamed: n` placeholder columns,
//! at least one column and one row.

use arrow::array::{Array, ArrayRef, AsArray, RecordBatch, StringArray};
use arrow::compute::{can_cast_types, cast};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use regex::Regex;
use snafu::prelude::*;
use std::sync::{Arc, LazyLock};

use crate::error::{CastSnafu, EmptyDatasetSnafu, RebuildSnafu, SchemaError};
use crate::table::TabularDataset;

static PLACEHOLDER_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Unnamed: \d+").expect("placeholder pattern is valid"));

/// Whether a column name is a placeholder for a blank header cell.
pub fn is_placeholder_column(name: &str) -> bool {
    PLACEHOLDER_COLUMN.is_match(name)
}

/// Coerces datasets to the all-string Silver schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaNormalizer;

impl SchemaNormalizer {
    /// Drop placeholder columns, cast the rest to non-null Utf8, and reject
    /// datasets left without columns or rows.
    pub fn normalize(&self, table: TabularDataset) -> Result<TabularDataset, SchemaError> {
        let batch = table.into_batch();
        let schema = batch.schema();

        let mut fields = Vec::new();
        let mut columns = Vec::new();
        for (field, column) in schema.fields().iter().zip(batch.columns()) {
            if is_placeholder_column(field.name()) {
                continue;
            }
            let column = to_utf8(column).context(CastSnafu {
                column: field.name(),
            })?;
            fields.push(Field::new(field.name(), DataType::Utf8, false));
            columns.push(column);
        }

        ensure!(
            !columns.is_empty() && batch.num_rows() > 0,
            EmptyDatasetSnafu {
                columns: columns.len(),
                rows: batch.num_rows(),
            }
        );

        let batch =
            RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).context(RebuildSnafu)?;
        Ok(TabularDataset::new(batch))
    }
}

/// Cast a column to Utf8 with nulls replaced by `""`.
fn to_utf8(column: &ArrayRef) -> Result<ArrayRef, arrow::error::ArrowError> {
    let strings = match column.data_type() {
        DataType::Utf8 => column.clone(),
        from if can_cast_types(from, &DataType::Utf8) => cast(column, &DataType::Utf8)?,
        _ => {
            // Nested types have no cast kernel; use their display form.
            let formatter = ArrayFormatter::try_new(column.as_ref(), &FormatOptions::default())?;
            let values: Vec<String> = (0..column.len())
                .map(|idx| {
                    if column.is_null(idx) {
                        String::new()
                    } else {
                        formatter.value(idx).to_string()
                    }
                })
                .collect();
            Arc::new(StringArray::from(values)) as ArrayRef
        }
    };

    if strings.null_count() == 0 {
        return Ok(strings);
    }

    let filled: StringArray = strings
        .as_string::<i32>()
        .iter()
        .map(|value| Some(value.unwrap_or_default()))
        .collect();
    Ok(Arc::new(filled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{BooleanArray, Float64Array, Int32Array, Int64Array, ListArray};
    use arrow::datatypes::Int32Type;
    use proptest::prelude::*;

    fn dataset(columns: Vec<(&str, ArrayRef)>) -> TabularDataset {
        TabularDataset::new(RecordBatch::try_from_iter(columns).unwrap())
    }

    fn strings(table: &TabularDataset, idx: usize) -> Vec<String> {
        let array = table.batch().column(idx).as_string::<i32>();
        (0..array.len()).map(|i| array.value(i).to_string()).collect()
    }

    #[test]
    fn test_drops_placeholder_columns() {
        let table = dataset(vec![
            ("Unnamed: 0", Arc::new(Int32Array::from(vec![0, 1])) as ArrayRef),
            ("id", Arc::new(StringArray::from(vec!["a", "b"])) as ArrayRef),
            ("Unnamed: 12", Arc::new(StringArray::from(vec!["", ""])) as ArrayRef),
            ("Unnamed", Arc::new(StringArray::from(vec!["x", "y"])) as ArrayRef),
        ]);

        let normalized = SchemaNormalizer.normalize(table).unwrap();

        assert_eq!(normalized.column_names(), vec!["id", "Unnamed"]);
    }

    #[test]
    fn test_casts_everything_to_utf8() {
        let table = dataset(vec![
            ("n", Arc::new(Int32Array::from(vec![Some(7), None])) as ArrayRef),
            ("f", Arc::new(Float64Array::from(vec![1.5, 2.0])) as ArrayRef),
            ("b", Arc::new(BooleanArray::from(vec![true, false])) as ArrayRef),
            (
                "s",
                Arc::new(StringArray::from(vec![Some("x"), None])) as ArrayRef,
            ),
        ]);

        let normalized = SchemaNormalizer.normalize(table).unwrap();

        for field in normalized.batch().schema().fields() {
            assert_eq!(field.data_type(), &DataType::Utf8);
            assert!(!field.is_nullable());
        }
        assert_eq!(strings(&normalized, 0), vec!["7", ""]);
        assert_eq!(strings(&normalized, 1), vec!["1.5", "2.0"]);
        assert_eq!(strings(&normalized, 2), vec!["true", "false"]);
        assert_eq!(strings(&normalized, 3), vec!["x", ""]);
    }

    #[test]
    fn test_nested_columns_rendered() {
        let list = ListArray::from_iter_primitive::<Int32Type, _, _>(vec![
            Some(vec![Some(1), Some(2)]),
            None,
        ]);
        let table = dataset(vec![("l", Arc::new(list) as ArrayRef)]);

        let normalized = SchemaNormalizer.normalize(table).unwrap();

        assert_eq!(strings(&normalized, 0), vec!["[1, 2]", ""]);
    }

    #[test]
    fn test_idempotent() {
        let table = dataset(vec![
            ("Unnamed: 3", Arc::new(Int32Array::from(vec![1, 2])) as ArrayRef),
            ("v", Arc::new(Int32Array::from(vec![Some(1), None])) as ArrayRef),
        ]);

        let once = SchemaNormalizer.normalize(table).unwrap();
        let twice = SchemaNormalizer.normalize(once.clone()).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_rejects_only_placeholder_columns() {
        let table = dataset(vec![(
            "Unnamed: 0",
            Arc::new(StringArray::from(vec!["a"])) as ArrayRef,
        )]);

        let err = SchemaNormalizer.normalize(table).unwrap_err();
        assert!(matches!(err, SchemaError::EmptyDataset { columns: 0, rows: 1 }));
    }

    #[test]
    fn test_rejects_zero_rows() {
        let table = TabularDataset::from_string_rows(vec!["a".into()], &[]).unwrap();

        let err = SchemaNormalizer.normalize(table).unwrap_err();
        assert!(matches!(err, SchemaError::EmptyDataset { columns: 1, rows: 0 }));
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(
            rows in prop::collection::vec(
                (any::<Option<i64>>(), prop::option::of("[a-zA-Z0-9 ,]{0,8}")),
                1..20,
            ),
            placeholder in 0usize..100,
        ) {
            let (numbers, texts): (Vec<Option<i64>>, Vec<Option<String>>) =
                rows.into_iter().unzip();
            let index: Vec<i64> = (0..numbers.len() as i64).collect();
            let placeholder = format!("Unnamed: {placeholder}");
            let table = dataset(vec![
                (placeholder.as_str(), Arc::new(Int64Array::from(index)) as ArrayRef),
                ("n", Arc::new(Int64Array::from(numbers)) as ArrayRef),
                ("s", Arc::new(StringArray::from(texts)) as ArrayRef),
            ]);

            let once = SchemaNormalizer.normalize(table).unwrap();
            let twice = SchemaNormalizer.normalize(once.clone()).unwrap();

            prop_assert_eq!(once.column_names(), vec!["n", "s"]);
            for field in once.batch().schema().fields() {
                prop_assert_eq!(field.data_type(), &DataType::Utf8);
                prop_assert!(!field.is_nullable());
            }
            prop_assert_eq!(once.batch().column(0).null_count(), 0);
            prop_assert_eq!(once.batch().column(1).null_count(), 0);
            prop_assert_eq!(&once, &twice);
        }
    }
}
