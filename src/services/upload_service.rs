//! UploadGrantIssuer: hands out short-lived presigned PUT URLs.

use crate::{
    errors::{Dependency, FaceIndexError, FaceIndexResult},
    models::upload::{FULLNAME_METADATA_KEY, UploadGrant, UploadRequest},
    services::{
        bounded,
        object_store::{ObjectMetadata, ObjectStore},
    },
};
use chrono::{Duration, Utc};
use std::{sync::Arc, time::Duration as StdDuration};
use tracing::{debug, info};
use uuid::Uuid;

/// Lifetime of every upload grant.
pub const UPLOAD_GRANT_TTL_SECS: i64 = 60;

pub const MISSING_UPLOAD_PARAMS: &str =
    "Both content-type and file-extension need to passed as query param!";

pub struct UploadGrantIssuer {
    objects: Arc<dyn ObjectStore>,
    key_prefix: String,
    timeout: StdDuration,
}

impl UploadGrantIssuer {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        key_prefix: impl Into<String>,
        timeout: StdDuration,
    ) -> Self {
        Self {
            objects,
            key_prefix: key_prefix.into(),
            timeout,
        }
    }

    /// Issue a grant for one new object under the upload prefix.
    ///
    /// Nothing is written to storage here; the client creates the object
    /// itself using the returned URL.
    pub async fn issue(&self, request: &UploadRequest) -> FaceIndexResult<UploadGrant> {
        if request.content_type.is_empty() || request.file_extension.is_empty() {
            return Err(FaceIndexError::validation(MISSING_UPLOAD_PARAMS));
        }

        let file_name = format!("{}{}", Uuid::new_v4(), request.file_extension);
        let target_key = format!("{}{}", self.key_prefix, file_name);
        debug!(%target_key, person_name = %request.person_name, "issuing upload grant");

        let metadata = ObjectMetadata::from([(
            FULLNAME_METADATA_KEY.to_string(),
            request.person_name.clone(),
        )]);
        let ttl = Duration::seconds(UPLOAD_GRANT_TTL_SECS);
        let issued_at = Utc::now();

        let url = bounded(
            self.timeout,
            Dependency::ObjectStore,
            self.objects
                .presign_put(&target_key, &request.content_type, &metadata, ttl),
        )
        .await?;

        info!(%target_key, "upload grant issued");
        Ok(UploadGrant {
            url,
            expires_at: issued_at + ttl,
            target_key,
            file_name,
            content_type: request.content_type.clone(),
            metadata,
        })
    }
}
