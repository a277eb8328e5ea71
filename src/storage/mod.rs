//! Multi-cloud object storage.
//!
//! [`StorageProvider`] wraps one `object_store` backend (S3, GCS, Azure Blob
//! Storage, local filesystem or in-memory) resolved from a URL.
//! [`StoragePool`] maps bucket names to providers and implements the
//! [`ObjectStorage`] fetch/put interface the conversion pipeline uses.

mod azure;
mod gcs;
mod local;
mod memory;
mod pool;
mod s3;

pub use azure::AzureConfig;
pub use gcs::GcsConfig;
pub use local::LocalConfig;
pub use memory::MemoryConfig;
pub use pool::StoragePool;
pub use s3::S3Config;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::path::Path;
use object_store::{
    Attribute, Attributes, ObjectStore, PutOptions, PutPayload, RetryConfig,
};
use regex::Regex;
use snafu::prelude::*;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use std::time::Instant;

use crate::emit;
use crate::error::{InvalidUrlSnafu, ObjectStoreSnafu, StorageError};
use crate::metrics::events::{
    RequestStatus, StorageOperation, StorageRequest, StorageRequestDuration,
};

/// Content type set on Parquet objects.
pub const PARQUET_CONTENT_TYPE: &str = "application/vnd.apache.parquet";

/// Fetch/put access to objects addressed by bucket and key.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Read a whole object.
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError>;

    /// Write a Parquet object, replacing any existing one.
    async fn put(&self, bucket: &str, key: &str, bytes: Bytes) -> Result<(), StorageError>;
}

/// A reference-counted storage provider.
pub type StorageProviderRef = Arc<StorageProvider>;

/// One backend store plus its optional key prefix.
#[derive(Clone)]
pub struct StorageProvider {
    pub(crate) config: BackendConfig,
    pub(crate) object_store: Arc<dyn ObjectStore>,
    pub(crate) canonical_url: String,
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StorageProvider<{}>", self.canonical_url)
    }
}

// URL patterns for different storage backends
const S3_PATH: &str =
    r"^https://s3\.(?P<region>[\w\-]+)\.amazonaws\.com/(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+))?$";
const S3_VIRTUAL: &str =
    r"^https://(?P<bucket>[a-z0-9\-\.]+)\.s3\.(?P<region>[\w\-]+)\.amazonaws\.com(/(?P<key>.+))?$";
const S3_URL: &str = r"^[sS]3[aA]?://(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+))?$";
const S3_ENDPOINT_URL: &str = r"^[sS]3[aA]?::(?<protocol>https?)://(?P<endpoint>[^:/]+):(?<port>\d+)/(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+))?$";

const GCS_VIRTUAL: &str =
    r"^https://(?P<bucket>[a-z0-9\-_\.]+)\.storage\.googleapis\.com(/(?P<key>.+))?$";
const GCS_PATH: &str =
    r"^https://storage\.googleapis\.com/(?P<bucket>[a-z0-9\-_\.]+)(/(?P<key>.+))?$";
const GCS_URL: &str = r"^[gG][sS]://(?P<bucket>[a-z0-9\-\._]+)(/(?P<key>.+))?$";

const ABFS_URL: &str = r"^abfss?://(?P<container>[a-z0-9\-]+)@(?P<account>[a-z0-9]+)\.dfs\.core\.windows\.net(/(?P<key>.+))?$";
const AZURE_HTTPS: &str = r"^https://(?P<account>[a-z0-9]+)\.(blob|dfs)\.core\.windows\.net/(?P<container>[a-z0-9\-]+)(/(?P<key>.+))?$";

const FILE_URI: &str = r"^file://(?P<path>.*)$";
const FILE_URL: &str = r"^file:(?P<path>.*)$";
const FILE_PATH: &str = r"^/(?P<path>.*)$";

const MEMORY_URL: &str = r"^memory://(?P<name>[^/]*)(/(?P<key>.+))?$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    S3,
    Gcs,
    Azure,
    Local,
    Memory,
}

static MATCHERS: LazyLock<Vec<(Backend, Regex)>> = LazyLock::new(|| {
    [
        (Backend::S3, S3_PATH),
        (Backend::S3, S3_VIRTUAL),
        (Backend::S3, S3_ENDPOINT_URL),
        (Backend::S3, S3_URL),
        (Backend::Gcs, GCS_PATH),
        (Backend::Gcs, GCS_VIRTUAL),
        (Backend::Gcs, GCS_URL),
        (Backend::Azure, ABFS_URL),
        (Backend::Azure, AZURE_HTTPS),
        (Backend::Memory, MEMORY_URL),
        (Backend::Local, FILE_URI),
        (Backend::Local, FILE_URL),
        (Backend::Local, FILE_PATH),
    ]
    .into_iter()
    .map(|(backend, pattern)| (backend, Regex::new(pattern).expect("storage URL pattern is valid")))
    .collect()
});

/// Retry policy for cloud backends: a single attempt, failures surface immediately.
pub(crate) fn single_attempt() -> RetryConfig {
    RetryConfig {
        max_retries: 0,
        ..RetryConfig::default()
    }
}

/// Backend configuration enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    S3(S3Config),
    Gcs(GcsConfig),
    Azure(AzureConfig),
    Local(LocalConfig),
    Memory(MemoryConfig),
}

impl BackendConfig {
    /// Parse a URL into a backend configuration.
    pub fn parse_url(url: &str) -> Result<Self, StorageError> {
        let Some((backend, captures)) = MATCHERS
            .iter()
            .find_map(|(backend, regex)| regex.captures(url).map(|caps| (*backend, caps)))
        else {
            return InvalidUrlSnafu { url }.fail();
        };

        let group = |name: &str| captures.name(name).map(|m| m.as_str());
        let key = group("key").map(Path::from);

        let config = match backend {
            Backend::S3 => {
                let region = std::env::var("AWS_DEFAULT_REGION")
                    .ok()
                    .or_else(|| group("region").map(str::to_string));
                let endpoint = std::env::var("AWS_ENDPOINT").ok().or_else(|| {
                    group("endpoint").map(|endpoint| {
                        let protocol = group("protocol").unwrap_or("https");
                        let port = group("port")
                            .and_then(|p| p.parse::<u16>().ok())
                            .unwrap_or(443);
                        format!("{protocol}://{endpoint}:{port}")
                    })
                });
                BackendConfig::S3(S3Config {
                    endpoint,
                    region,
                    bucket: group("bucket").unwrap_or_default().to_string(),
                    key,
                })
            }
            Backend::Gcs => BackendConfig::Gcs(GcsConfig {
                bucket: group("bucket").unwrap_or_default().to_string(),
                key,
            }),
            Backend::Azure => BackendConfig::Azure(AzureConfig {
                account: group("account").unwrap_or_default().to_string(),
                container: group("container").unwrap_or_default().to_string(),
                key,
            }),
            Backend::Local => {
                let path = group("path").unwrap_or_default();
                let path = if path.starts_with('/') {
                    path.to_string()
                } else {
                    format!("/{path}")
                };
                BackendConfig::Local(LocalConfig { path })
            }
            Backend::Memory => BackendConfig::Memory(MemoryConfig {
                name: group("name").unwrap_or_default().to_string(),
                key,
            }),
        };

        Ok(config)
    }

    pub(crate) fn key(&self) -> Option<&Path> {
        match self {
            BackendConfig::S3(s3) => s3.key.as_ref(),
            BackendConfig::Gcs(gcs) => gcs.key.as_ref(),
            BackendConfig::Azure(azure) => azure.key.as_ref(),
            BackendConfig::Memory(memory) => memory.key.as_ref(),
            BackendConfig::Local(_) => None,
        }
    }

    /// Whether the backend stores object attributes such as content type.
    fn supports_attributes(&self) -> bool {
        !matches!(self, BackendConfig::Local(_))
    }
}

/// Convert an object key to a store path without re-encoding it.
///
/// Keys that `Path::parse` rejects (empty or relative segments) fall back to
/// the encoding constructor.
pub fn object_path(key: &str) -> Path {
    Path::parse(key).unwrap_or_else(|_| Path::from(key))
}

impl StorageProvider {
    /// Create a storage provider for the given URL with storage options.
    pub async fn for_url_with_options(
        url: &str,
        options: HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        match BackendConfig::parse_url(url)? {
            BackendConfig::S3(config) => Self::construct_s3(config, options).await,
            BackendConfig::Gcs(config) => Self::construct_gcs(config, options).await,
            BackendConfig::Azure(config) => Self::construct_azure(config, options).await,
            BackendConfig::Local(config) => Self::construct_local(config).await,
            BackendConfig::Memory(config) => Ok(Self::construct_memory(config)),
        }
    }

    /// URL identifying this provider in logs.
    pub fn canonical_url(&self) -> &str {
        &self.canonical_url
    }

    /// Get the backend configuration.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Qualify a path with the configured key prefix.
    pub fn qualify_path<'a>(&self, path: &'a Path) -> Cow<'a, Path> {
        match self.config.key() {
            Some(prefix) => Cow::Owned(prefix.parts().chain(path.parts()).collect()),
            None => Cow::Borrowed(path),
        }
    }

    /// Get the contents of an object.
    pub async fn get(&self, path: &Path) -> Result<Bytes, StorageError> {
        let start = Instant::now();
        let result = match self.object_store.get(&self.qualify_path(path)).await {
            Ok(response) => response.bytes().await,
            Err(err) => Err(err),
        };
        record_request(StorageOperation::Get, result.is_ok(), start);

        result.context(ObjectStoreSnafu)
    }

    /// Put bytes to a path with no attributes.
    pub async fn put(&self, path: &Path, bytes: Bytes) -> Result<(), StorageError> {
        self.put_opts(path, bytes, PutOptions::default()).await
    }

    /// Put a Parquet object, tagging its content type where the backend allows it.
    pub async fn put_parquet(&self, path: &Path, bytes: Bytes) -> Result<(), StorageError> {
        let mut opts = PutOptions::default();
        if self.config.supports_attributes() {
            let mut attributes = Attributes::new();
            attributes.insert(Attribute::ContentType, PARQUET_CONTENT_TYPE.into());
            opts.attributes = attributes;
        }
        self.put_opts(path, bytes, opts).await
    }

    async fn put_opts(
        &self,
        path: &Path,
        bytes: Bytes,
        opts: PutOptions,
    ) -> Result<(), StorageError> {
        let path = self.qualify_path(path);
        let start = Instant::now();
        let result = self
            .object_store
            .put_opts(&path, PutPayload::from(bytes), opts)
            .await;
        record_request(StorageOperation::Put, result.is_ok(), start);

        result.context(ObjectStoreSnafu)?;
        Ok(())
    }
}

fn record_request(operation: StorageOperation, ok: bool, start: Instant) {
    emit!(StorageRequest {
        operation,
        status: RequestStatus::from_ok(ok),
    });
    emit!(StorageRequestDuration {
        operation,
        duration: start.elapsed(),
    });
}
