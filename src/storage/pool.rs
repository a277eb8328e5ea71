//! Per-bucket provider cache.
//!
//! Resolves a bucket name to a [`StorageProvider`] by rendering the storage
//! URL template, and keeps one provider per bucket for the life of the
//! process.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{ObjectStorage, StorageProvider, StorageProviderRef, object_path};
use crate::config::StorageConfig;
use crate::error::StorageError;

/// Pool of storage providers keyed by bucket name.
pub struct StoragePool {
    config: StorageConfig,
    providers: RwLock<HashMap<String, StorageProviderRef>>,
}

impl std::fmt::Debug for StoragePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoragePool")
            .field("url_template", &self.config.url_template)
            .finish_non_exhaustive()
    }
}

impl StoragePool {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            providers: RwLock::new(HashMap::new()),
        }
    }

    /// Get or create the provider for a bucket.
    pub async fn provider(&self, bucket: &str) -> Result<StorageProviderRef, StorageError> {
        // Fast path: check if provider already exists
        {
            let providers = self.providers.read().await;
            if let Some(provider) = providers.get(bucket) {
                return Ok(provider.clone());
            }
        }

        let mut providers = self.providers.write().await;
        // Another task may have created it while we waited for the lock.
        if let Some(provider) = providers.get(bucket) {
            return Ok(provider.clone());
        }

        let url = self.config.url_for(bucket);
        let provider =
            Arc::new(StorageProvider::for_url_with_options(&url, self.config.options.clone()).await?);
        debug!(bucket, url = provider.canonical_url(), "Created storage provider");

        providers.insert(bucket.to_string(), provider.clone());
        Ok(provider)
    }

    /// Number of cached providers.
    pub async fn provider_count(&self) -> usize {
        self.providers.read().await.len()
    }
}

#[async_trait]
impl ObjectStorage for StoragePool {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError> {
        let provider = self.provider(bucket).await?;
        provider.get(&object_path(key)).await
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Bytes) -> Result<(), StorageError> {
        let provider = self.provider(bucket).await?;
        provider.put_parquet(&object_path(key), bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageErrorKind;

    fn memory_pool() -> StoragePool {
        StoragePool::new(StorageConfig {
            url_template: "memory://{bucket}".to_string(),
            options: HashMap::new(),
        })
    }

    #[tokio::test]
    async fn test_provider_cached_per_bucket() {
        let pool = memory_pool();

        let a = pool.provider("lake-dev-raw").await.unwrap();
        let again = pool.provider("lake-dev-raw").await.unwrap();
        let b = pool.provider("lake-dev-curated").await.unwrap();

        assert!(Arc::ptr_eq(&a, &again));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(pool.provider_count().await, 2);
    }

    #[tokio::test]
    async fn test_fetch_put_through_pool() {
        let pool = memory_pool();

        pool.put("b", "silver/x.parquet", Bytes::from_static(b"PAR1"))
            .await
            .unwrap();

        assert_eq!(
            pool.fetch("b", "silver/x.parquet").await.unwrap(),
            Bytes::from_static(b"PAR1")
        );
        let err = pool.fetch("other", "silver/x.parquet").await.unwrap_err();
        assert_eq!(err.kind(), StorageErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_invalid_template_surfaces_on_use() {
        let pool = StoragePool::new(StorageConfig {
            url_template: "ftp://{bucket}".to_string(),
            options: HashMap::new(),
        });

        let err = pool.fetch("b", "bronze/a.csv").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidUrl { .. }));
        assert_eq!(err.kind(), StorageErrorKind::Io);
    }

    #[tokio::test]
    async fn test_local_pool_uses_bucket_directories() {
        let dir = tempfile::tempdir().unwrap();
        let pool = StoragePool::new(StorageConfig {
            url_template: format!("file://{}/{{bucket}}", dir.path().display()),
            options: HashMap::new(),
        });

        pool.put("lake", "silver/a.parquet", Bytes::from_static(b"PAR1"))
            .await
            .unwrap();

        assert!(dir.path().join("lake/silver/a.parquet").exists());
    }
}
