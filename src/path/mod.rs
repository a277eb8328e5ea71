//! Bronze to Silver key mapping.
//!
//! Maps a source object key to its Silver-zone target:
//!
//! ```text
//! bronze/201_Expense_2025-01-10_2025-01-10_22_01.json
//!   -> silver/year=2025/month=01/day=10/201_Expense_2025-01-10_2025-01-10_22_01.parquet
//! ```
//!
//! The date partition comes from the first `YYYY-MM-DD` token among the
//! `_`-separated segments of the file name, or from the processing date.
//! Keys without a usable file name or extension fall back to swapping the
//! zone prefix and the extension in place.

mod partition;

pub use partition::{KeyContext, PartitionExtractor};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Token substituted for `#`, which object stores reject in keys.
pub const HASH_REPLACEMENT: &str = "Generic";

/// Extension of every target key.
pub const TARGET_EXTENSION: &str = "parquet";

/// How the date partition of a target key is chosen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DatePolicy {
    /// Use a `YYYY-MM-DD` token from the file name, else the processing date.
    #[default]
    Filename,
    /// Always use the processing date.
    ProcessingDate,
}

/// Where the date partition of a mapped key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    /// Extracted from the file name.
    Filename,
    /// The processing date.
    ProcessingDate,
    /// No date partition: the key was mapped by the fallback rule.
    Fallback,
}

/// Result of mapping a source key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedPath {
    pub key: String,
    pub date_source: DateSource,
}

impl MappedPath {
    pub fn is_fallback(&self) -> bool {
        self.date_source == DateSource::Fallback
    }
}

/// Pure mapping from Bronze keys to Silver keys.
#[derive(Debug, Clone)]
pub struct PathMapper {
    source_zone: String,
    destination_zone: String,
    date_policy: DatePolicy,
}

impl Default for PathMapper {
    fn default() -> Self {
        Self::new("bronze", "silver", DatePolicy::default())
    }
}

impl PathMapper {
    pub fn new(
        source_zone: impl Into<String>,
        destination_zone: impl Into<String>,
        date_policy: DatePolicy,
    ) -> Self {
        Self {
            source_zone: source_zone.into(),
            destination_zone: destination_zone.into(),
            date_policy,
        }
    }

    /// Zone name expected as the first segment of source keys.
    pub fn source_zone(&self) -> &str {
        &self.source_zone
    }

    /// Whether the key's first segment is the source zone (case-insensitive).
    pub fn in_source_zone(&self, key: &str) -> bool {
        key.split('/')
            .next()
            .is_some_and(|first| first.eq_ignore_ascii_case(&self.source_zone))
    }

    /// Map a source key to its target key, using `today` when the key
    /// carries no date.
    pub fn map(&self, source_key: &str, today: NaiveDate) -> MappedPath {
        let key = source_key.replace('#', HASH_REPLACEMENT);

        self.map_partitioned(&key, today)
            .unwrap_or_else(|| MappedPath {
                key: self.map_fallback(&key),
                date_source: DateSource::Fallback,
            })
    }

    fn map_partitioned(&self, key: &str, today: NaiveDate) -> Option<MappedPath> {
        let file_name = key.rsplit('/').next().filter(|name| !name.is_empty())?;
        let (base, extension) = file_name.rsplit_once('.')?;
        if base.is_empty() || extension.is_empty() {
            return None;
        }

        let (date, date_source) = match self.date_policy {
            DatePolicy::Filename => match find_date_token(base) {
                Some(date) => (date, DateSource::Filename),
                None => (today, DateSource::ProcessingDate),
            },
            DatePolicy::ProcessingDate => (today, DateSource::ProcessingDate),
        };

        let key = format!(
            "{}/year={:04}/month={:02}/day={:02}/{}.{}",
            self.destination_zone,
            date.year(),
            date.month(),
            date.day(),
            base,
            TARGET_EXTENSION
        );

        Some(MappedPath { key, date_source })
    }

    /// Swap the zone prefix and the extension, keeping the rest of the path.
    fn map_fallback(&self, key: &str) -> String {
        let mut parts: Vec<&str> = key.split('/').collect();

        if parts
            .first()
            .is_some_and(|first| first.eq_ignore_ascii_case(&self.source_zone))
        {
            parts[0] = &self.destination_zone;
        }

        let file_name = parts.pop().unwrap_or_default();
        let base = file_name
            .rsplit_once('.')
            .map(|(base, _)| base)
            .unwrap_or(file_name);
        let target_name = format!("{base}.{TARGET_EXTENSION}");

        if parts.is_empty() {
            target_name
        } else {
            format!("{}/{}", parts.join("/"), target_name)
        }
    }
}

/// Find the first `_`-separated segment shaped exactly like `YYYY-MM-DD`
/// that is also a valid calendar date.
pub fn find_date_token(base_name: &str) -> Option<NaiveDate> {
    base_name
        .split('_')
        .filter(|segment| is_date_shaped(segment))
        .find_map(|segment| NaiveDate::parse_from_str(segment, "%Y-%m-%d").ok())
}

fn is_date_shaped(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}
