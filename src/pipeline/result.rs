//! Conversion outcomes.

use serde::Serialize;
use std::fmt;

/// Why a conversion failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The source object could not be fetched.
    FetchError,
    /// The file extension is not a supported format.
    UnsupportedFormat,
    /// The bytes could not be parsed as the format.
    FormatReadError,
    /// No usable columns or no rows remained after normalization.
    EmptyDataset,
    /// Encoding or storing the Parquet object failed.
    WriteError,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::FetchError => "fetch_error",
            FailureKind::UnsupportedFormat => "unsupported_format",
            FailureKind::FormatReadError => "format_read_error",
            FailureKind::EmptyDataset => "empty_dataset",
            FailureKind::WriteError => "write_error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionResult {
    /// The Parquet object was written.
    Success {
        target_key: String,
        rows: usize,
        columns: usize,
    },
    /// Nothing to do for this key.
    Skipped { reason: String },
    Failed { kind: FailureKind, message: String },
}

impl ConversionResult {
    /// Success and skip both count as success.
    pub fn is_success(&self) -> bool {
        !matches!(self, ConversionResult::Failed { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ConversionResult::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
