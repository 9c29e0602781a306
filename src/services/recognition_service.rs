//! FaceRecognizer: resolves an unknown image to an enrolled person.
//!
//! Matching is fail-open: any dependency failure while searching or resolving
//! the match yields "no match" plus an error-level event, never an error to
//! the caller. Only invalid input is rejected.

use crate::{
    errors::{Dependency, FaceIndexError, FaceIndexResult},
    services::{bounded, face_client::FaceService, mapping_store::MappingStore},
};
use base64::{Engine as _, engine::general_purpose};
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, info, warn};

/// Default minimum similarity (0–100) for a candidate to count as a match.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 90.0;

/// Only the best candidate is ever considered.
const MAX_CANDIDATES: usize = 1;

pub const MISSING_IMAGE: &str =
    "No image found in body. Pass base 64 encode image in the request body";

#[derive(Debug, Clone, PartialEq)]
pub enum Recognition {
    Matched { person_name: String, confidence: f32 },
    NoMatch(NoMatchReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoMatchReason {
    /// No face above the threshold, or no detectable face at all.
    NoCandidate,
    /// The face service matched a descriptor the mapping store has never seen.
    UnknownDescriptor(String),
    /// A dependency failed or timed out; treated as no match.
    DependencyFailure,
}

/// Decode a base64 wire payload into image bytes.
///
/// Surrounding whitespace is ignored; an empty or undecodable payload is a
/// validation error.
pub fn decode_image_payload(payload: &[u8]) -> FaceIndexResult<Vec<u8>> {
    let trimmed = payload.trim_ascii();
    if trimmed.is_empty() {
        return Err(FaceIndexError::validation(MISSING_IMAGE));
    }
    general_purpose::STANDARD
        .decode(trimmed)
        .map_err(|err| FaceIndexError::validation(format!("Image is not valid base64: {}", err)))
}

pub struct FaceRecognizer {
    faces: Arc<dyn FaceService>,
    mappings: Arc<dyn MappingStore>,
    collection_id: String,
    threshold: f32,
    timeout: Duration,
}

impl FaceRecognizer {
    pub fn new(
        faces: Arc<dyn FaceService>,
        mappings: Arc<dyn MappingStore>,
        collection_id: impl Into<String>,
        threshold: f32,
        timeout: Duration,
    ) -> Self {
        Self {
            faces,
            mappings,
            collection_id: collection_id.into(),
            threshold,
            timeout,
        }
    }

    /// Identify the person in `image`.
    ///
    /// Returns `Err` only for an empty image; every other path resolves to a
    /// [`Recognition`].
    pub async fn recognize(&self, image: &[u8]) -> FaceIndexResult<Recognition> {
        if image.is_empty() {
            return Err(FaceIndexError::validation(MISSING_IMAGE));
        }

        let outcome = match self.search(image).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(error = %err, "face search failed, answering no match");
                Recognition::NoMatch(NoMatchReason::DependencyFailure)
            }
        };

        match &outcome {
            Recognition::Matched {
                person_name,
                confidence,
            } => info!(
                full_name = %person_name,
                confidence = *confidence,
                face_search_count = 1,
                "face recognized"
            ),
            Recognition::NoMatch(reason) => {
                info!(?reason, face_search_count = 0, "no match found")
            }
        }
        Ok(outcome)
    }

    async fn search(&self, image: &[u8]) -> FaceIndexResult<Recognition> {
        let candidates = bounded(
            self.timeout,
            Dependency::FaceService,
            self.faces.search_by_image(
                &self.collection_id,
                image,
                MAX_CANDIDATES,
                self.threshold,
            ),
        )
        .await?;

        // The service is asked for the threshold already; re-check so a lenient
        // backend cannot widen what counts as a match.
        let Some(best) = candidates
            .into_iter()
            .next()
            .filter(|m| m.confidence >= self.threshold)
        else {
            return Ok(Recognition::NoMatch(NoMatchReason::NoCandidate));
        };
        debug!(face_id = %best.face_id, confidence = best.confidence, "best candidate");

        let record = bounded(
            self.timeout,
            Dependency::MappingStore,
            self.mappings.get(&best.face_id),
        )
        .await?;

        match record {
            Some(record) => Ok(Recognition::Matched {
                person_name: record.person_name,
                confidence: best.confidence,
            }),
            None => {
                let inconsistency = FaceIndexError::DataInconsistency {
                    face_id: best.face_id.clone(),
                };
                warn!(
                    error = %inconsistency,
                    confidence = best.confidence,
                    "index and mapping diverged"
                );
                Ok(Recognition::NoMatch(NoMatchReason::UnknownDescriptor(
                    best.face_id,
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{enrollment::EnrollmentRecord, face::FaceMatch},
        services::testing::{Behavior, CapturedLogs, FakeFaceService, InMemoryMappingStore},
    };

    fn recognizer(
        faces: Arc<FakeFaceService>,
        mappings: Arc<InMemoryMappingStore>,
    ) -> FaceRecognizer {
        FaceRecognizer::new(
            faces,
            mappings,
            "faces",
            DEFAULT_MATCH_THRESHOLD,
            Duration::from_millis(200),
        )
    }

    fn ada() -> Arc<InMemoryMappingStore> {
        Arc::new(InMemoryMappingStore::with_records([EnrollmentRecord::new(
            "f1",
            "Ada",
            "index/static/ada.jpg",
        )]))
    }

    #[tokio::test]
    async fn empty_image_is_rejected_before_any_call() {
        let faces = Arc::new(FakeFaceService::default());
        let mappings = ada();
        let err = recognizer(faces.clone(), mappings.clone())
            .recognize(&[])
            .await
            .unwrap_err();

        assert!(matches!(err, FaceIndexError::Validation(ref msg) if msg == MISSING_IMAGE));
        assert_eq!(faces.call_count(), 0);
        assert_eq!(mappings.call_count(), 0);
    }

    #[tokio::test]
    async fn confident_match_resolves_person_name() {
        let faces = Arc::new(FakeFaceService::searching(vec![FaceMatch::new("f1", 95.0)]));
        let outcome = recognizer(faces, ada()).recognize(b"img").await.unwrap();

        assert_eq!(
            outcome,
            Recognition::Matched {
                person_name: "Ada".into(),
                confidence: 95.0
            }
        );
    }

    #[tokio::test]
    async fn candidate_below_threshold_is_no_match_even_if_enrolled() {
        let faces = Arc::new(FakeFaceService::searching(vec![FaceMatch::new("f1", 85.0)]));
        let mappings = ada();
        let outcome = recognizer(faces, mappings.clone())
            .recognize(b"img")
            .await
            .unwrap();

        assert_eq!(outcome, Recognition::NoMatch(NoMatchReason::NoCandidate));
        assert_eq!(mappings.call_count(), 0);
    }

    #[tokio::test]
    async fn unknown_descriptor_is_no_match_not_error() {
        let faces = Arc::new(FakeFaceService::searching(vec![FaceMatch::new("ghost", 97.0)]));
        let outcome = recognizer(faces, ada()).recognize(b"img").await.unwrap();

        assert_eq!(
            outcome,
            Recognition::NoMatch(NoMatchReason::UnknownDescriptor("ghost".into()))
        );
    }

    #[tokio::test]
    async fn face_service_failure_fails_open() {
        let faces = Arc::new(FakeFaceService::with_behavior(Behavior::Fail));
        let outcome = recognizer(faces, ada()).recognize(b"img").await.unwrap();
        assert_eq!(outcome, Recognition::NoMatch(NoMatchReason::DependencyFailure));
    }

    #[tokio::test]
    async fn unknown_descriptor_emits_inconsistency_warning() {
        let (logs, _guard) = CapturedLogs::install();
        let faces = Arc::new(FakeFaceService::searching(vec![FaceMatch::new("ghost", 97.0)]));
        recognizer(faces, ada()).recognize(b"img").await.unwrap();

        let output = logs.contents();
        let line = output
            .lines()
            .find(|line| line.contains("index and mapping diverged"))
            .expect("inconsistency warning");
        assert!(line.contains("WARN"));
        assert!(line.contains("face `ghost` is indexed but has no enrollment record"));
    }

    #[tokio::test]
    async fn fail_open_emits_error_event() {
        let (logs, _guard) = CapturedLogs::install();
        let faces = Arc::new(FakeFaceService::with_behavior(Behavior::Fail));
        recognizer(faces, ada()).recognize(b"img").await.unwrap();

        let output = logs.contents();
        let line = output
            .lines()
            .find(|line| line.contains("face search failed, answering no match"))
            .expect("fail-open error event");
        assert!(line.contains("ERROR"));
        assert!(line.contains("face service call failed"));
    }

    #[tokio::test]
    async fn face_service_timeout_fails_open() {
        let faces = Arc::new(FakeFaceService::with_behavior(Behavior::Hang));
        let outcome = recognizer(faces, ada()).recognize(b"img").await.unwrap();
        assert_eq!(outcome, Recognition::NoMatch(NoMatchReason::DependencyFailure));
    }

    #[tokio::test]
    async fn mapping_store_failure_fails_open() {
        let faces = Arc::new(FakeFaceService::searching(vec![FaceMatch::new("f1", 99.0)]));
        let mappings = Arc::new(InMemoryMappingStore::with_behavior(Behavior::Fail));
        let outcome = recognizer(faces, mappings).recognize(b"img").await.unwrap();
        assert_eq!(outcome, Recognition::NoMatch(NoMatchReason::DependencyFailure));
    }

    #[test]
    fn payload_decoding() {
        assert_eq!(decode_image_payload(b" aW1n\n").unwrap(), b"img");
        assert!(matches!(
            decode_image_payload(b"   "),
            Err(FaceIndexError::Validation(msg)) if msg == MISSING_IMAGE
        ));
        assert!(matches!(
            decode_image_payload(b"not base64!"),
            Err(FaceIndexError::Validation(_))
        ));
    }
}
