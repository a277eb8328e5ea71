//! Configuration loading.
//!
//! A YAML document with `${VAR}` interpolation. Every section has defaults,
//! so an empty file is a valid configuration that converts `bronze/` keys to
//! `silver/` in the triggering S3 bucket.

mod vars;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{
    ConfigError, EmptyZoneSnafu, EnvInterpolationSnafu, MissingBucketPlaceholderSnafu,
    MissingWebhookUrlSnafu, NestedZoneSnafu, ReadFileSnafu, YamlParseSnafu,
    ZeroRowGroupSizeSnafu,
};
use crate::path::{DatePolicy, PathMapper};
use crate::sink::WriterConfig;

/// Placeholder replaced by the bucket name in `storage.url_template`.
pub const BUCKET_PLACEHOLDER: &str = "{bucket}";

/// Default maximum rows per Parquet row group.
pub const DEFAULT_MAX_ROW_GROUP_SIZE: usize = 1024 * 1024;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub zones: ZonesConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

/// Zone names used as the first key segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZonesConfig {
    /// Zone that triggers conversions (default: "bronze").
    #[serde(default = "default_source_zone")]
    pub source: String,
    /// Zone that receives Parquet output (default: "silver").
    #[serde(default = "default_destination_zone")]
    pub destination: String,
}

impl Default for ZonesConfig {
    fn default() -> Self {
        Self {
            source: default_source_zone(),
            destination: default_destination_zone(),
        }
    }
}

fn default_source_zone() -> String {
    "bronze".to_string()
}

fn default_destination_zone() -> String {
    "silver".to_string()
}

/// Target key derivation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default)]
    pub date_policy: DatePolicy,
}

/// How buckets are reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// URL for a bucket; `{bucket}` is replaced by the bucket name.
    /// Examples: "s3://{bucket}", "gs://{bucket}", "file:///data/{bucket}"
    #[serde(default = "default_url_template")]
    pub url_template: String,

    /// Backend options (credentials, region, endpoint, etc.)
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url_template: default_url_template(),
            options: HashMap::new(),
        }
    }
}

fn default_url_template() -> String {
    format!("s3://{BUCKET_PLACEHOLDER}")
}

impl StorageConfig {
    /// Render the storage URL for a bucket.
    pub fn url_for(&self, bucket: &str) -> String {
        self.url_template.replace(BUCKET_PLACEHOLDER, bucket)
    }
}

/// Parquet output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Bucket receiving the Parquet objects. Defaults to the event's bucket.
    #[serde(default)]
    pub bucket: Option<String>,

    /// Parquet compression codec.
    #[serde(default)]
    pub compression: ParquetCompression,

    /// Maximum rows per row group (default: 1Mi).
    #[serde(default = "default_max_row_group_size")]
    pub max_row_group_size: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            compression: ParquetCompression::default(),
            max_row_group_size: default_max_row_group_size(),
        }
    }
}

fn default_max_row_group_size() -> usize {
    DEFAULT_MAX_ROW_GROUP_SIZE
}

/// Parquet compression codec.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParquetCompression {
    Uncompressed,
    #[default]
    Snappy,
    Gzip,
    Zstd,
    Lz4,
}

/// Where failure notifications go.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    /// Drop notifications.
    None,
    /// Log notifications at error level.
    #[default]
    Log,
    /// POST notifications as JSON to `url`.
    Webhook,
}

/// Failure notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub kind: NotifierKind,

    /// Webhook endpoint, required for `kind: webhook`.
    #[serde(default)]
    pub url: Option<String>,

    /// Subject used for failure notifications.
    #[serde(default = "default_subject")]
    pub subject: String,

    /// Webhook request timeout in seconds (default: 10).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            kind: NotifierKind::default(),
            url: None,
            subject: default_subject(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_subject() -> String {
    "Data Processing Error(Bronze-Silver)".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_file_with_options(path, true)
    }

    /// Load configuration from a YAML file with optional environment variable interpolation.
    pub fn from_file_with_options(
        path: impl AsRef<Path>,
        interpolate_env: bool,
    ) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).context(ReadFileSnafu)?;
        Self::from_yaml_str(&content, interpolate_env)
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml_str(content: &str, interpolate_env: bool) -> Result<Self, ConfigError> {
        let content = if interpolate_env {
            let result = vars::interpolate(content);
            if !result.is_ok() {
                let message = result.errors.join("\n");
                return EnvInterpolationSnafu { message }.fail();
            }
            result.text
        } else {
            content.to_string()
        };

        // serde_yaml reads an empty document as unit, not as an empty map.
        let config: Config = if content.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(&content).context(YamlParseSnafu)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (zone, name) in [
            ("source", &self.zones.source),
            ("destination", &self.zones.destination),
        ] {
            ensure!(!name.is_empty(), EmptyZoneSnafu { zone });
            ensure!(!name.contains('/'), NestedZoneSnafu { zone, name });
        }
        ensure!(
            self.storage.url_template.contains(BUCKET_PLACEHOLDER),
            MissingBucketPlaceholderSnafu {
                template: &self.storage.url_template
            }
        );
        ensure!(self.output.max_row_group_size > 0, ZeroRowGroupSizeSnafu);
        if self.notifier.kind == NotifierKind::Webhook {
            ensure!(
                self.notifier.url.as_deref().is_some_and(|u| !u.is_empty()),
                MissingWebhookUrlSnafu
            );
        }
        Ok(())
    }

    /// Path mapper for the configured zones and date policy.
    pub fn path_mapper(&self) -> PathMapper {
        PathMapper::new(
            &self.zones.source,
            &self.zones.destination,
            self.paths.date_policy,
        )
    }

    /// Parquet writer settings.
    pub fn writer_config(&self) -> WriterConfig {
        WriterConfig {
            compression: self.output.compression,
            max_row_group_size: self.output.max_row_group_size,
        }
    }
}
