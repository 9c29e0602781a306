//! Transient values exchanged with the face service.

use serde::{Deserialize, Serialize};

/// A face reported by the face service, either freshly indexed or matched.
///
/// `confidence` is on the service's 0–100 scale. For search results it is the
/// similarity between the probe image and the indexed face.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FaceMatch {
    pub face_id: String,
    pub confidence: f32,
}

impl FaceMatch {
    pub fn new(face_id: impl Into<String>, confidence: f32) -> Self {
        Self {
            face_id: face_id.into(),
            confidence,
        }
    }
}

/// Reference to an image already stored in object storage.
///
/// The face service reads the object itself; image bytes never pass through
/// this service during indexing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}
