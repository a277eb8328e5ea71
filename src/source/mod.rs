//! Format readers.
//!
//! Raw object bytes are turned into a [`TabularDataset`] by the reader for
//! the object's [`FileFormat`]. The format is chosen once from the file
//! extension; every supported format has exactly one reader.

mod csv;
mod excel;
mod json;
mod parquet;

pub use self::csv::CsvReader;
pub use self::excel::ExcelReader;
pub use self::json::JsonReader;
pub use self::parquet::ParquetReader;

use bytes::Bytes;
use serde::Serialize;
use snafu::prelude::*;
use std::fmt;

use crate::error::{ReaderError, UnsupportedFormatSnafu};
use crate::table::TabularDataset;

/// Turns the raw bytes of one object into a dataset.
pub trait FormatReader: Send + Sync {
    fn read(&self, data: Bytes) -> Result<TabularDataset, ReaderError>;
}

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Excel,
    Json,
    Parquet,
}

impl FileFormat {
    /// Look up a format by extension (case-insensitive, leading dot optional).
    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.strip_prefix('.').unwrap_or(extension);
        match extension.to_ascii_lowercase().as_str() {
            "csv" => Some(FileFormat::Csv),
            "xlsx" | "xls" => Some(FileFormat::Excel),
            "json" => Some(FileFormat::Json),
            "parquet" => Some(FileFormat::Parquet),
            _ => None,
        }
    }

    /// Determine the format of an object key from its file name.
    pub fn from_key(key: &str) -> Result<Self, ReaderError> {
        let extension = extension_of(key);
        Self::from_extension(extension).context(UnsupportedFormatSnafu { extension })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Excel => "excel",
            FileFormat::Json => "json",
            FileFormat::Parquet => "parquet",
        }
    }

    /// Read `data` with this format's reader.
    pub fn read(self, data: Bytes) -> Result<TabularDataset, ReaderError> {
        match self {
            FileFormat::Csv => CsvReader.read(data),
            FileFormat::Excel => ExcelReader.read(data),
            FileFormat::Json => JsonReader.read(data),
            FileFormat::Parquet => ParquetReader.read(data),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extension of the key's file name: the text after its last `.`, or `""`.
pub fn extension_of(key: &str) -> &str {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension)
        .unwrap_or_default()
}

/// Read `data` as the format named by `extension`.
pub fn read(data: Bytes, extension: &str) -> Result<TabularDataset, ReaderError> {
    FileFormat::from_extension(extension)
        .context(UnsupportedFormatSnafu { extension })?
        .read(data)
}
