//! Error types for silverize using snafu.
//!
//! Each concern (storage, configuration, reading, schema normalization,
//! Parquet encoding, trigger events) has its own enum with context
//! selectors. The conversion pipeline wraps them in [`ConversionError`],
//! which knows the [`FailureKind`] reported to callers.

use snafu::prelude::*;

use crate::pipeline::FailureKind;
use crate::source::FileFormat;

// ============ Storage Errors ============

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Invalid storage URL format.
    #[snafu(display("Invalid storage URL: {url}"))]
    InvalidUrl { url: String },

    /// Object store operation failed.
    #[snafu(display("Storage operation failed: {source}"))]
    ObjectStore { source: object_store::Error },

    /// IO error during storage operations.
    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },

    /// S3 configuration error.
    #[snafu(display("S3 configuration error: {source}"))]
    S3Config { source: object_store::Error },

    /// GCS configuration error.
    #[snafu(display("GCS configuration error: {source}"))]
    GcsConfig { source: object_store::Error },

    /// Azure configuration error.
    #[snafu(display("Azure configuration error: {source}"))]
    AzureConfig { source: object_store::Error },
}

/// Coarse classification of a failed storage call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    NotFound,
    AccessDenied,
    Io,
}

impl StorageError {
    /// Check if this error represents a "not found" condition (404, NoSuchKey, etc.)
    pub fn is_not_found(&self) -> bool {
        self.kind() == StorageErrorKind::NotFound
    }

    /// Classify the error as not-found, access-denied or generic IO.
    pub fn kind(&self) -> StorageErrorKind {
        match self {
            StorageError::ObjectStore { source } => match source {
                object_store::Error::NotFound { .. } => StorageErrorKind::NotFound,
                object_store::Error::PermissionDenied { .. }
                | object_store::Error::Unauthenticated { .. } => StorageErrorKind::AccessDenied,
                _ => StorageErrorKind::Io,
            },
            _ => StorageErrorKind::Io,
        }
    }
}

// ============ Config Errors ============

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// A zone name is empty.
    #[snafu(display("{zone} zone name cannot be empty"))]
    EmptyZone { zone: &'static str },

    /// A zone name contains a path separator.
    #[snafu(display("{zone} zone name '{name}' must be a single path segment"))]
    NestedZone { zone: &'static str, name: String },

    /// Storage URL template has no bucket placeholder.
    #[snafu(display("Storage url_template '{template}' must contain '{{bucket}}'"))]
    MissingBucketPlaceholder { template: String },

    /// Webhook notifier configured without a URL.
    #[snafu(display("Webhook notifier requires a url"))]
    MissingWebhookUrl,

    /// Row group size must be positive.
    #[snafu(display("output.max_row_group_size must be greater than zero"))]
    ZeroRowGroupSize,

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML: {source}"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file: {source}"))]
    ReadFile { source: std::io::Error },
}

// ============ Reader Errors ============

/// Errors that can occur while turning raw bytes into a dataset.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ReaderError {
    /// Extension is not one of the supported formats.
    #[snafu(display("Unsupported file format: {extension}"))]
    UnsupportedFormat { extension: String },

    /// CSV parsing failed.
    #[snafu(display("Failed to parse CSV: {source}"))]
    Csv { source: csv::Error },

    /// A CSV data row has more cells than the header.
    #[snafu(display("CSV record {record} has {found} fields, header has {expected}"))]
    RaggedRow {
        record: usize,
        expected: usize,
        found: usize,
    },

    /// Workbook could not be opened or a sheet could not be read.
    #[snafu(display("Failed to read workbook: {source}"))]
    Excel { source: calamine::Error },

    /// Workbook has no worksheet.
    #[snafu(display("Workbook contains no worksheets"))]
    NoWorksheet,

    /// JSON parsing failed.
    #[snafu(display("Failed to parse JSON: {source}"))]
    Json { source: serde_json::Error },

    /// JSON document is valid but not a tabular shape.
    #[snafu(display("Unsupported JSON layout: {message}"))]
    JsonLayout { message: String },

    /// Parquet decoding failed.
    #[snafu(display("Failed to decode Parquet: {source}"))]
    ParquetDecode {
        source: parquet::errors::ParquetError,
    },

    /// Arrow error while assembling batches.
    #[snafu(display("Failed to assemble {format} batch: {source}"))]
    Assemble {
        format: FileFormat,
        source: arrow::error::ArrowError,
    },
}

impl ReaderError {
    /// Whether this error means the format itself is not supported.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, ReaderError::UnsupportedFormat { .. })
    }
}

// ============ Schema Errors ============

/// Errors raised by the schema normalizer.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SchemaError {
    /// Dataset has no usable columns or no rows.
    #[snafu(display("Empty dataset: {columns} columns, {rows} rows"))]
    EmptyDataset { columns: usize, rows: usize },

    /// A column could not be cast to Utf8.
    #[snafu(display("Failed to cast column '{column}' to string: {source}"))]
    Cast {
        column: String,
        source: arrow::error::ArrowError,
    },

    /// Rebuilding the record batch failed.
    #[snafu(display("Failed to rebuild normalized batch: {source}"))]
    Rebuild { source: arrow::error::ArrowError },
}

// ============ Parquet Errors ============

/// Errors that can occur during Parquet writing.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ParquetError {
    /// Failed to create Parquet writer.
    #[snafu(display("Failed to create Parquet writer: {source}"))]
    WriterCreate {
        source: parquet::errors::ParquetError,
    },

    /// Failed to write to Parquet.
    #[snafu(display("Failed to write to Parquet: {source}"))]
    ParquetWrite {
        source: parquet::errors::ParquetError,
    },
}

// ============ Event Errors ============

/// Errors raised while decoding a trigger event.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum EventError {
    /// Event payload is not valid JSON for the expected shape.
    #[snafu(display("Failed to parse trigger event: {source}"))]
    EventParse { source: serde_json::Error },

    /// Event has no records.
    #[snafu(display("Trigger event contains no records"))]
    NoRecords,

    /// Decoded object key is empty.
    #[snafu(display("Trigger event has an empty object key"))]
    EmptyKey,
}

// ============ Conversion Error (pipeline boundary) ============

/// Failure of a single conversion, tagged by the stage that failed.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConversionError {
    /// Fetching the source object failed.
    #[snafu(display("Failed to fetch {key} from bucket {bucket}: {source}"))]
    Fetch {
        bucket: String,
        key: String,
        source: StorageError,
    },

    /// Reading the source bytes failed.
    #[snafu(display("Failed to read {key}: {source}"))]
    Read { key: String, source: ReaderError },

    /// Normalizing the dataset failed.
    #[snafu(display("Failed to normalize {key}: {source}"))]
    Normalize { key: String, source: SchemaError },

    /// Encoding the dataset as Parquet failed.
    #[snafu(display("Failed to encode {target}: {source}"))]
    Encode {
        target: String,
        source: ParquetError,
    },

    /// Writing the Parquet object failed.
    #[snafu(display("Failed to write {target} to bucket {bucket}: {source}"))]
    Put {
        bucket: String,
        target: String,
        source: StorageError,
    },

    /// A blocking task panicked or was cancelled.
    #[snafu(display("{stage:?} task did not complete: {source}"))]
    TaskJoin {
        stage: FailureKind,
        source: tokio::task::JoinError,
    },
}

impl ConversionError {
    /// The failure taxonomy entry reported for this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            ConversionError::Fetch { .. } => FailureKind::FetchError,
            ConversionError::Read { source, .. } if source.is_unsupported() => {
                FailureKind::UnsupportedFormat
            }
            ConversionError::Read { .. } => FailureKind::FormatReadError,
            ConversionError::Normalize { source, .. } => match source {
                SchemaError::EmptyDataset { .. } => FailureKind::EmptyDataset,
                _ => FailureKind::FormatReadError,
            },
            ConversionError::Encode { .. } | ConversionError::Put { .. } => {
                FailureKind::WriteError
            }
            ConversionError::TaskJoin { stage, .. } => *stage,
        }
    }
}

// ============ CLI Errors ============

/// Errors surfaced by the command-line driver.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CliError {
    /// Configuration error.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// Failed to read the event file.
    #[snafu(display("Failed to read event file: {source}"))]
    ReadEvent { source: std::io::Error },

    /// Event decoding failed.
    #[snafu(display("Invalid trigger event: {source}"))]
    Event { source: EventError },

    /// Neither an event file nor a bucket/key pair was supplied.
    #[snafu(display("Either --event or both --bucket and --key must be given"))]
    MissingTarget,

    /// Notifier construction failed.
    #[snafu(display("Failed to build notifier: {source}"))]
    Notifier { source: reqwest::Error },

    /// Failed to serialize the conversion result.
    #[snafu(display("Failed to serialize result: {source}"))]
    ResultSerialize { source: serde_json::Error },

    /// The conversion finished with a failure result.
    #[snafu(display("Conversion failed ({kind:?}): {message}"))]
    ConversionFailed { kind: FailureKind, message: String },
}
