//! Binary object store capability: presigned uploads and metadata reads.
//!
//! The production implementation talks to any S3-compatible store through
//! `aws-sdk-s3`. Upload grants are SigV4 query-signed PUT URLs; the client
//! must send the signed `Content-Type` and `x-amz-meta-*` headers with the
//! upload.

use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    error::{DisplayErrorContext, SdkError},
    operation::head_object::HeadObjectError,
    presigning::PresigningConfig,
};
use chrono::Duration;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::debug;

/// User metadata attached to a stored object, keys lowercased.
pub type ObjectMetadata = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("invalid presign expiry: {0}")]
    InvalidExpiry(String),
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, key: String },
    #[error("object store unavailable: {0}")]
    Unavailable(String),
    #[error("object store request failed: {0}")]
    Sdk(String),
}

pub type ObjectStoreResult<T> = Result<T, ObjectStoreError>;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Produce a URL that lets an unauthenticated client PUT exactly `key`,
    /// with the given content type and metadata, until `ttl` elapses.
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        metadata: &ObjectMetadata,
        ttl: Duration,
    ) -> ObjectStoreResult<String>;

    async fn head_object(&self, bucket: &str, key: &str) -> ObjectStoreResult<ObjectMetadata>;
}

/// Client for an S3-compatible object store.
#[derive(Clone)]
pub struct S3CompatObjectStore {
    client: Client,
    /// Bucket presigned uploads are written to.
    upload_bucket: String,
}

impl S3CompatObjectStore {
    pub fn new(client: Client, upload_bucket: impl Into<String>) -> Self {
        Self {
            client,
            upload_bucket: upload_bucket.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3CompatObjectStore {
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        metadata: &ObjectMetadata,
        ttl: Duration,
    ) -> ObjectStoreResult<String> {
        let expires_in = ttl
            .to_std()
            .map_err(|err| ObjectStoreError::InvalidExpiry(err.to_string()))?;
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|err| ObjectStoreError::InvalidExpiry(err.to_string()))?;

        let request = self
            .client
            .put_object()
            .bucket(&self.upload_bucket)
            .key(key)
            .content_type(content_type)
            .set_metadata(Some(
                metadata
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect::<HashMap<_, _>>(),
            ))
            .presigned(presigning)
            .await
            .map_err(|err| ObjectStoreError::Sdk(DisplayErrorContext(&err).to_string()))?;

        debug!(key, expires_in = expires_in.as_secs(), "presigned upload url");
        Ok(request.uri().to_string())
    }

    async fn head_object(&self, bucket: &str, key: &str) -> ObjectStoreResult<ObjectMetadata> {
        let output = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| head_error(err, bucket, key))?;

        Ok(user_metadata(output.metadata()))
    }
}

fn head_error(err: SdkError<HeadObjectError>, bucket: &str, key: &str) -> ObjectStoreError {
    if err.as_service_error().is_some_and(HeadObjectError::is_not_found) {
        return ObjectStoreError::ObjectNotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        };
    }
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            ObjectStoreError::Unavailable(DisplayErrorContext(&err).to_string())
        }
        other => ObjectStoreError::Sdk(DisplayErrorContext(&other).to_string()),
    }
}

/// Normalise S3 user metadata into a sorted map with lowercased keys.
fn user_metadata(metadata: Option<&HashMap<String, String>>) -> ObjectMetadata {
    metadata
        .into_iter()
        .flatten()
        .map(|(field, value)| (field.to_ascii_lowercase(), value.clone()))
        .collect()
}
