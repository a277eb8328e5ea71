//! In-memory tabular dataset.

use arrow::array::{ArrayRef, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatchOptions;
use std::collections::HashSet;
use std::sync::Arc;

/// Prefix given to columns with an empty header cell.
pub const UNNAMED_PREFIX: &str = "Unnamed: ";

/// Ordered named columns backed by a single Arrow [`RecordBatch`].
#[derive(Debug, Clone, PartialEq)]
pub struct TabularDataset {
    batch: RecordBatch,
}

impl TabularDataset {
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    /// Build an all-Utf8 dataset from row-major string cells.
    ///
    /// Rows shorter than the header are padded with `""`; callers reject
    /// longer rows before getting here.
    pub fn from_string_rows(names: Vec<String>, rows: &[Vec<String>]) -> Result<Self, ArrowError> {
        let columns = (0..names.len())
            .map(|idx| {
                rows.iter()
                    .map(|row| row.get(idx).map(String::as_str).unwrap_or_default())
                    .collect::<Vec<_>>()
            })
            .collect();
        Self::from_string_columns(names, columns)
    }

    /// Build an all-Utf8 dataset from column-major string cells.
    pub fn from_string_columns<S: AsRef<str>>(
        names: Vec<String>,
        columns: Vec<Vec<S>>,
    ) -> Result<Self, ArrowError> {
        if names.len() != columns.len() {
            return Err(ArrowError::InvalidArgumentError(format!(
                "{} column names for {} columns",
                names.len(),
                columns.len()
            )));
        }

        let fields: Vec<Field> = names
            .iter()
            .map(|name| Field::new(name, DataType::Utf8, false))
            .collect();
        let arrays: Vec<ArrayRef> = columns
            .iter()
            .map(|cells| {
                Arc::new(StringArray::from_iter_values(cells.iter().map(AsRef::as_ref)))
                    as ArrayRef
            })
            .collect();

        let row_count = columns.first().map(Vec::len).unwrap_or_default();
        let options = RecordBatchOptions::new().with_row_count(Some(row_count));
        let batch =
            RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)?;
        Ok(Self { batch })
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.batch
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect()
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }
}

/// Turn a raw header row into unique, non-empty column names.
///
/// Blank cells become `Unnamed: <index>`; repeated names get `.1`, `.2`, ...
/// appended in order of appearance, skipping suffixes already in use.
pub fn header_names<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let raw: Vec<String> = raw
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let name = name.as_ref();
            if name.trim().is_empty() {
                format!("{UNNAMED_PREFIX}{idx}")
            } else {
                name.to_string()
            }
        })
        .collect();

    let mut taken: HashSet<String> = raw.iter().cloned().collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut names = Vec::with_capacity(raw.len());

    for name in &raw {
        if seen.insert(name.as_str()) {
            names.push(name.clone());
            continue;
        }
        let mut suffix = 1;
        let unique = loop {
            let candidate = format!("{name}.{suffix}");
            if !taken.contains(&candidate) {
                break candidate;
            }
            suffix += 1;
        };
        taken.insert(unique.clone());
        names.push(unique);
    }

    names
}
