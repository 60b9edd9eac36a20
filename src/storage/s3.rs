use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_bucket::HeadBucketError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;

use crate::storage::{ObjectInfo, ObjectStore, StorageError, StorageResult};

/// S3-compatible store, normally pointed at MinIO.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    region: String,
}

impl S3ObjectStore {
    pub fn new(endpoint: &str, access_key: &str, secret_key: &str, region: &str) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "static");

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .retry_config(RetryConfig::standard().with_max_attempts(3))
            // MinIO only understands path-style addressing.
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            region: region.to_string(),
        }
    }
}

fn backend<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// Error codes meaning the object is not there, including a missing bucket.
fn is_missing_code(code: Option<&str>) -> bool {
    matches!(code, Some("NoSuchKey" | "NoSuchBucket" | "NotFound"))
}

fn get_object_missing(err: &GetObjectError) -> bool {
    matches!(err, GetObjectError::NoSuchKey(_)) || is_missing_code(err.code())
}

fn head_object_missing(err: &HeadObjectError) -> bool {
    matches!(err, HeadObjectError::NotFound(_)) || is_missing_code(err.code())
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn make_bucket(&self, bucket: &str) -> StorageResult<()> {
        let mut request = self.client.create_bucket().bucket(bucket);

        if self.region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        request.send().await.map_err(|e| {
            tracing::error!(error = %e, bucket = %bucket, "S3 create bucket failed");
            backend(e)
        })?;

        Ok(())
    }

    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => match &e {
                SdkError::ServiceError(service_err) => match service_err.err() {
                    HeadBucketError::NotFound(_) => Ok(false),
                    _ => Err(backend(e)),
                },
                _ => Err(backend(e)),
            },
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        let size = data.len();
        let start = std::time::Instant::now();

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    size_bytes = size,
                    "S3 upload failed"
                );
                backend(e)
            })?;

        tracing::debug!(
            bucket = %bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match &e {
                SdkError::ServiceError(service_err) if get_object_missing(service_err.err()) => {
                    StorageError::NotFound(format!("{}/{}", bucket, key))
                }
                _ => {
                    tracing::error!(error = %e, bucket = %bucket, key = %key, "S3 download failed");
                    backend(e)
                }
            })?;

        let data = response.body.collect().await.map_err(backend)?;
        Ok(data.into_bytes().to_vec())
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectInfo> {
        let response = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match &e {
                SdkError::ServiceError(service_err) if head_object_missing(service_err.err()) => {
                    StorageError::NotFound(format!("{}/{}", bucket, key))
                }
                _ => backend(e),
            })?;

        Ok(ObjectInfo {
            size: response.content_length().unwrap_or(0).max(0) as u64,
            content_type: response.content_type().map(str::to_string),
        })
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StorageResult<()> {
        let copy_source = format!("{}/{}", src_bucket, urlencoding::encode(src_key));

        self.client
            .copy_object()
            .bucket(dst_bucket)
            .key(dst_key)
            .copy_source(&copy_source)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    source = %copy_source,
                    bucket = %dst_bucket,
                    key = %dst_key,
                    "S3 copy failed"
                );
                backend(e)
            })?;

        Ok(())
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, bucket = %bucket, key = %key, "S3 delete failed");
                backend(e)
            })?;

        Ok(())
    }

    async fn ping(&self) -> StorageResult<()> {
        self.client.list_buckets().send().await.map_err(backend)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::error::ErrorMetadata;
    use aws_sdk_s3::types::error::{NoSuchKey, NotFound};

    fn coded(code: &str) -> ErrorMetadata {
        ErrorMetadata::builder().code(code).message("test").build()
    }

    #[test]
    fn test_missing_key_or_bucket_is_not_found() {
        assert!(get_object_missing(&GetObjectError::NoSuchKey(
            NoSuchKey::builder().build()
        )));
        assert!(get_object_missing(&GetObjectError::generic(coded("NoSuchBucket"))));
        assert!(!get_object_missing(&GetObjectError::generic(coded("AccessDenied"))));

        assert!(head_object_missing(&HeadObjectError::NotFound(
            NotFound::builder().build()
        )));
        assert!(head_object_missing(&HeadObjectError::generic(coded("NoSuchBucket"))));
        assert!(!head_object_missing(&HeadObjectError::generic(coded("SlowDown"))));
    }

    #[test]
    fn test_missing_codes() {
        assert!(is_missing_code(Some("NoSuchKey")));
        assert!(is_missing_code(Some("NoSuchBucket")));
        assert!(!is_missing_code(Some("InternalError")));
        assert!(!is_missing_code(None));
    }
}
