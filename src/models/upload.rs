//! Upload grants handed to clients so they can write one image straight into storage.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Object metadata field carrying the person's name from upload to indexing.
pub const FULLNAME_METADATA_KEY: &str = "fullname";

/// Parameters a client supplies when asking for an upload grant.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub content_type: String,
    pub file_extension: String,
    pub person_name: String,
}

/// A short-lived, constrained write grant for one object.
#[derive(Serialize, Clone, Debug)]
pub struct UploadGrant {
    /// Presigned URL the client PUTs the image to.
    pub url: String,

    /// Instant after which the URL is rejected by the store.
    pub expires_at: DateTime<Utc>,

    /// Full object key the image will be written under.
    pub target_key: String,

    /// Randomly generated file name, the last segment of `target_key`.
    pub file_name: String,

    /// Content type the upload must declare.
    pub content_type: String,

    /// Metadata the store attaches to the object (`fullname`).
    pub metadata: BTreeMap<String, String>,
}
