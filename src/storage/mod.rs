use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{StorageBackend, StorageConfig};

pub mod local;
pub mod s3;

pub use local::LocalObjectStore;
pub use s3::S3ObjectStore;

/// Bucket holding raw uploads until the job worker picks them up.
pub const UPLOADS_BUCKET: &str = "uploads";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Backend(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInfo {
    pub size: u64,
    pub content_type: Option<String>,
}

/// Bucket/key object storage, modelled on the S3 API.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn make_bucket(&self, bucket: &str) -> StorageResult<()>;

    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool>;

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()>;

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>>;

    async fn stat_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectInfo>;

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StorageResult<()>;

    async fn remove_object(&self, bucket: &str, key: &str) -> StorageResult<()>;

    async fn ping(&self) -> StorageResult<()>;
}

/// Creates `bucket` unless it is already there.
pub async fn ensure_bucket(store: &dyn ObjectStore, bucket: &str) -> StorageResult<()> {
    if !store.bucket_exists(bucket).await? {
        store.make_bucket(bucket).await?;
        tracing::info!(bucket = %bucket, "Created bucket");
    }
    Ok(())
}

pub async fn create_store(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    match config.backend {
        StorageBackend::Local => {
            let store = LocalObjectStore::new(&config.local_path)?;
            Ok(Arc::new(store))
        }
        StorageBackend::S3 => {
            let store = S3ObjectStore::new(
                &config.endpoint,
                &config.access_key,
                &config.secret_key,
                &config.region,
            );
            Ok(Arc::new(store))
        }
    }
}
