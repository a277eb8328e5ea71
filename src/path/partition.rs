//! Partition value extraction from object keys.
//!
//! Extracts `key=value` segments from Hive-style keys such as
//! `bronze/client=acme/source=sftp/filename=advisor/client_code=07/file.csv`
//! and derives the correlation prefix used to tag every log line of an
//! invocation.

use std::collections::HashMap;
use std::fmt;

/// Extracts partition values from object keys.
///
/// Supports two modes:
/// - **Specific columns**: Extract only values for configured partition columns
/// - **All columns**: Extract all `key=value` segments found in the key
///
/// # Examples
///
/// ```
/// use silverize::path::PartitionExtractor;
///
/// let extractor = PartitionExtractor::all();
/// let values = extractor.extract("bronze/client=acme/year=2025/file.csv");
/// assert_eq!(values.get("client"), Some(&"acme".to_string()));
/// assert_eq!(values.get("year"), Some(&"2025".to_string()));
///
/// let extractor = PartitionExtractor::new(vec!["client".into()]);
/// let values = extractor.extract("bronze/client=acme/year=2025/file.csv");
/// assert_eq!(values.get("year"), None);
/// ```
#[derive(Debug, Clone)]
pub struct PartitionExtractor {
    /// The partition names to extract. None means extract all.
    columns: Option<Vec<String>>,
}

impl PartitionExtractor {
    /// Create an extractor for specific partition names.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns: Some(columns),
        }
    }

    /// Create an extractor that keeps every `key=value` segment.
    pub fn all() -> Self {
        Self { columns: None }
    }

    /// Extract partition values from a key.
    ///
    /// Only directory segments are considered; the final segment is the
    /// object's file name and never a partition.
    pub fn extract(&self, key: &str) -> HashMap<String, String> {
        let mut values = HashMap::new();
        let mut segments: Vec<&str> = key.split('/').collect();
        segments.pop();

        for segment in segments {
            let Some((name, value)) = segment.split_once('=') else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            let wanted = match &self.columns {
                Some(cols) => cols.iter().any(|c| c == name),
                None => true,
            };
            // First occurrence wins for repeated names.
            if wanted && !values.contains_key(name) {
                values.insert(name.to_string(), value.to_string());
            }
        }

        values
    }
}

/// Correlation context parsed from a source key.
///
/// Displays as the stream prefix attached to every log line of an
/// invocation, e.g. `Conversion_To_Parquet sftp acme_07 advisor 2025-01-10`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyContext {
    pub source: Option<String>,
    pub client: Option<String>,
    pub client_code: Option<String>,
    pub dataset: Option<String>,
    pub date: Option<String>,
    pub file_name: String,
}

const CONTEXT_PARTITIONS: &[&str] = &[
    "source",
    "client",
    "client_code",
    "filename",
    "date",
    "year",
    "month",
    "day",
];

impl KeyContext {
    /// Build the context from a (URL-decoded) source key.
    pub fn from_key(key: &str) -> Self {
        let mut values = PartitionExtractor::new(
            CONTEXT_PARTITIONS.iter().map(|s| s.to_string()).collect(),
        )
        .extract(key);

        let date = values.remove("date").or_else(|| {
            match (values.remove("year"), values.remove("month"), values.remove("day")) {
                (Some(y), Some(m), Some(d)) => Some(format!("{y}-{m}-{d}")),
                (Some(y), Some(m), None) => Some(format!("{y}-{m}")),
                (Some(y), None, None) => Some(y),
                _ => None,
            }
        });

        Self {
            source: values.remove("source"),
            client: values.remove("client"),
            client_code: values.remove("client_code"),
            dataset: values.remove("filename"),
            date,
            file_name: key.rsplit('/').next().unwrap_or(key).to_string(),
        }
    }

    /// Whether any partition context was found in the key.
    pub fn has_partitions(&self) -> bool {
        self.source.is_some()
            || self.client.is_some()
            || self.client_code.is_some()
            || self.dataset.is_some()
            || self.date.is_some()
    }
}

impl fmt::Display for KeyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Conversion_To_Parquet")?;

        if !self.has_partitions() {
            return write!(f, " {}", self.file_name);
        }

        if let Some(source) = &self.source {
            write!(f, " {source}")?;
        }
        match (&self.client, &self.client_code) {
            (Some(client), Some(code)) => write!(f, " {client}_{code}")?,
            (Some(client), None) => write!(f, " {client}")?,
            (None, Some(code)) => write!(f, " {code}")?,
            (None, None) => {}
        }
        if let Some(dataset) = &self.dataset {
            write!(f, " {dataset}")?;
        }
        if let Some(date) = &self.date {
            write!(f, " {date}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_all_multiple_partitions() {
        let extractor = PartitionExtractor::all();
        let values = extractor.extract("bronze/date=2024-01-28/hour=14/file.csv");

        assert_eq!(values.get("date"), Some(&"2024-01-28".to_string()));
        assert_eq!(values.get("hour"), Some(&"14".to_string()));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_extract_ignores_file_name() {
        let extractor = PartitionExtractor::all();
        let values = extractor.extract("bronze/id=7/name=report.csv");

        assert_eq!(values.get("id"), Some(&"7".to_string()));
        assert_eq!(values.get("name"), None);
    }

    #[test]
    fn test_extract_no_partitions() {
        let extractor = PartitionExtractor::all();
        assert!(extractor.extract("bronze/file.csv").is_empty());
        assert!(extractor.extract("file.csv").is_empty());
    }

    #[test]
    fn test_extract_specific_filters_columns() {
        let extractor = PartitionExtractor::new(vec!["client".into()]);
        let values = extractor.extract("bronze/client=acme/source=sftp/file.csv");

        assert_eq!(values.len(), 1);
        assert_eq!(values.get("client"), Some(&"acme".to_string()));
    }

    #[test]
    fn test_extract_first_occurrence_wins() {
        let extractor = PartitionExtractor::all();
        let values = extractor.extract("bronze/client=a/client=b/file.csv");
        assert_eq!(values.get("client"), Some(&"a".to_string()));
    }

    #[test]
    fn test_context_full_prefix() {
        let ctx = KeyContext::from_key(
            "bronze/client=acme/source=sftp/filename=advisor/client_code=07/year=2025/month=01/day=10/a.csv",
        );

        assert_eq!(
            ctx.to_string(),
            "Conversion_To_Parquet sftp acme_07 advisor 2025-01-10"
        );
    }

    #[test]
    fn test_context_without_client_code() {
        let ctx = KeyContext::from_key("bronze/client=acme/source=sftp/date=2025-02-03/a.csv");
        assert_eq!(ctx.to_string(), "Conversion_To_Parquet sftp acme 2025-02-03");
    }

    #[test]
    fn test_context_with_only_client_code() {
        let ctx = KeyContext::from_key("bronze/client_code=07/a.csv");

        assert!(ctx.has_partitions());
        assert_eq!(ctx.to_string(), "Conversion_To_Parquet 07");
    }

    #[test]
    fn test_context_falls_back_to_file_name() {
        let ctx = KeyContext::from_key("bronze/201_Expense_2025-01-10.json");

        assert!(!ctx.has_partitions());
        assert_eq!(
            ctx.to_string(),
            "Conversion_To_Parquet 201_Expense_2025-01-10.json"
        );
    }
}
