//! Represents the durable binding between an indexed face and a person.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One enrolled face.
///
/// Keyed by the descriptor id the face service returned when the face was
/// indexed. Records are append-only: re-enrolling the same image produces a
/// new record under a fresh descriptor id.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct EnrollmentRecord {
    /// Opaque descriptor id, only meaningful inside the collection that produced it.
    pub face_id: String,

    /// Free-text person name. Not unique; may be empty.
    pub person_name: String,

    /// Location of the source image in object storage.
    pub image_key: String,

    /// When this record was persisted.
    pub created_at: DateTime<Utc>,
}

impl EnrollmentRecord {
    pub fn new(
        face_id: impl Into<String>,
        person_name: impl Into<String>,
        image_key: impl Into<String>,
    ) -> Self {
        Self {
            face_id: face_id.into(),
            person_name: person_name.into(),
            image_key: image_key.into(),
            created_at: Utc::now(),
        }
    }
}

/// Projection of an enrollment for display purposes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub image_url: String,
    pub full_name: String,
}
