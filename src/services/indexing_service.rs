//! FaceIndexer: enrolls the face found in a freshly stored image.

use crate::{
    errors::{Dependency, FaceIndexResult},
    models::{
        enrollment::EnrollmentRecord,
        face::ObjectRef,
        storage_event::StoredObject,
        upload::FULLNAME_METADATA_KEY,
    },
    services::{
        bounded, face_client::FaceService, mapping_store::MappingStore, object_store::ObjectStore,
    },
};
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

/// Terminal outcome of one indexing run.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IndexOutcome {
    Enrolled { record: EnrollmentRecord },
    /// The face service found nothing to index. Not an error; nothing is stored.
    NoFaceDetected { key: String },
}

pub struct FaceIndexer {
    faces: Arc<dyn FaceService>,
    objects: Arc<dyn ObjectStore>,
    mappings: Arc<dyn MappingStore>,
    collection_id: String,
    timeout: Duration,
}

impl FaceIndexer {
    pub fn new(
        faces: Arc<dyn FaceService>,
        objects: Arc<dyn ObjectStore>,
        mappings: Arc<dyn MappingStore>,
        collection_id: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            faces,
            objects,
            mappings,
            collection_id: collection_id.into(),
            timeout,
        }
    }

    /// Index the first face in `object` and persist its enrollment.
    ///
    /// Dependency failures propagate so the event source can retry. A repeat
    /// delivery of the same key enrolls again under a new descriptor id.
    pub async fn index(&self, object: &StoredObject) -> FaceIndexResult<IndexOutcome> {
        let object_ref = ObjectRef::new(&object.bucket, &object.key);

        let faces = bounded(
            self.timeout,
            Dependency::FaceService,
            self.faces.index_face(&self.collection_id, &object_ref),
        )
        .await
        .inspect_err(|err| {
            warn!(
                bucket = %object.bucket,
                key = %object.key,
                error = %err,
                "failed indexing uploaded image"
            )
        })?;

        let Some(face) = faces.into_iter().next() else {
            warn!(bucket = %object.bucket, key = %object.key, "no face detected in uploaded image");
            return Ok(IndexOutcome::NoFaceDetected {
                key: object.key.clone(),
            });
        };

        let metadata = bounded(
            self.timeout,
            Dependency::ObjectStore,
            self.objects.head_object(&object.bucket, &object.key),
        )
        .await?;
        let person_name = metadata
            .get(FULLNAME_METADATA_KEY)
            .cloned()
            .unwrap_or_default();

        let record = EnrollmentRecord::new(face.face_id, person_name, &object.key);
        bounded(
            self.timeout,
            Dependency::MappingStore,
            self.mappings.put(&record),
        )
        .await?;

        info!(
            face_id = %record.face_id,
            full_name = %record.person_name,
            key = %record.image_key,
            "face enrolled"
        );
        Ok(IndexOutcome::Enrolled { record })
    }
}
