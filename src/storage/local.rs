use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::storage::{ObjectInfo, ObjectStore, StorageError, StorageResult};

/// Filesystem-backed store laid out as `<base>/<bucket>/<key>`.
pub struct LocalObjectStore {
    base_path: PathBuf,
}

impl LocalObjectStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> StorageResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();

        std::fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::Backend(format!("Failed to create storage directory: {}", e))
        })?;

        Ok(Self { base_path })
    }

    fn bucket_path(&self, bucket: &str) -> StorageResult<PathBuf> {
        check_segment(bucket)?;
        Ok(self.base_path.join(bucket))
    }

    fn get_full_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        check_segment(key)?;
        Ok(self.bucket_path(bucket)?.join(key))
    }

    async fn require_bucket(&self, bucket: &str) -> StorageResult<PathBuf> {
        let path = self.bucket_path(bucket)?;
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::Backend(format!(
                "The specified bucket does not exist: {}",
                bucket
            )));
        }
        Ok(path)
    }
}

/// Bucket names and keys must be a single plain path component.
fn check_segment(segment: &str) -> StorageResult<()> {
    let mut components = Path::new(segment).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(StorageError::Backend(format!(
            "Invalid object name: {}",
            segment
        ))),
    }
}

fn map_io(bucket: &str, key: &str, e: std::io::Error) -> StorageError {
    if e.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(format!("{}/{}", bucket, key))
    } else {
        StorageError::Backend(e.to_string())
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn make_bucket(&self, bucket: &str) -> StorageResult<()> {
        let path = self.bucket_path(bucket)?;
        fs::create_dir_all(&path)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to create bucket: {}", e)))
    }

    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        let path = self.bucket_path(bucket)?;
        Ok(fs::metadata(&path).await.map(|m| m.is_dir()).unwrap_or(false))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<()> {
        self.require_bucket(bucket).await?;
        let full_path = self.get_full_path(bucket, key)?;

        fs::write(&full_path, data)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to write object: {}", e)))
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        let full_path = self.get_full_path(bucket, key)?;
        fs::read(&full_path).await.map_err(|e| map_io(bucket, key, e))
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectInfo> {
        let full_path = self.get_full_path(bucket, key)?;
        let metadata = fs::metadata(&full_path)
            .await
            .map_err(|e| map_io(bucket, key, e))?;

        if !metadata.is_file() {
            return Err(StorageError::NotFound(format!("{}/{}", bucket, key)));
        }

        Ok(ObjectInfo {
            size: metadata.len(),
            content_type: mime_guess::from_path(key).first().map(|m| m.to_string()),
        })
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StorageResult<()> {
        let src = self.get_full_path(src_bucket, src_key)?;
        self.require_bucket(dst_bucket).await?;
        let dst = self.get_full_path(dst_bucket, dst_key)?;

        fs::copy(&src, &dst)
            .await
            .map(|_| ())
            .map_err(|e| map_io(src_bucket, src_key, e))
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let full_path = self.get_full_path(bucket, key)?;

        // Removing a missing object succeeds, as it does on S3.
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Backend(format!("Failed to delete object: {}", e))),
        }
    }

    async fn ping(&self) -> StorageResult<()> {
        fs::metadata(&self.base_path)
            .await
            .map(|_| ())
            .map_err(|e| StorageError::Backend(e.to_string()))
    }
}
