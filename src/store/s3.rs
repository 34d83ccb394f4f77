// src/store/s3.rs
//! Date-partitioned upload of the artifact to object storage.

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use chrono::NaiveDate;

use super::StoreError;

/// Partitioned object key: `raw/dt=<YYYY-MM-DD>/<file_name>`. Downstream
/// readers scan by the `dt=` partition.
pub fn object_key(partition: NaiveDate, file_name: &str) -> String {
    format!("raw/dt={}/{}", partition.format("%Y-%m-%d"), file_name)
}

/// Upload seam so the orchestrator can run without AWS in tests.
#[async_trait]
pub trait ObjectUploader: Send + Sync {
    /// Uploads the local file and returns the object key it was stored
    /// under.
    async fn upload(&self, file: &Path, partition: NaiveDate) -> Result<String, StoreError>;
}

/// Uploads to a fixed bucket with the AWS SDK. Credentials and region come
/// from the default provider chain.
pub struct S3Uploader {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Uploader {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Builds the client from ambient AWS configuration.
    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(aws_sdk_s3::Client::new(&config), bucket)
    }
}

#[async_trait]
impl ObjectUploader for S3Uploader {
    async fn upload(&self, file: &Path, partition: NaiveDate) -> Result<String, StoreError> {
        let file_name = file.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
            StoreError::Upload(format!("artifact path {} has no file name", file.display()))
        })?;
        let key = object_key(partition, file_name);
        let body = ByteStream::from_path(file)
            .await
            .map_err(|e| StoreError::Upload(e.to_string()))?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(body)
            .send()
            .await
            .map_err(|e| StoreError::Upload(DisplayErrorContext(&e).to_string()))?;
        Ok(key)
    }
}
