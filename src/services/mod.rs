//! Orchestration services and the capability adapters they depend on.
//!
//! Each orchestration service holds `Arc<dyn Trait>` handles injected at
//! construction and keeps no mutable state between invocations.

use crate::errors::{Dependency, FaceIndexError, FaceIndexResult};
use std::{fmt::Display, future::Future, time::Duration};

pub mod callback_client;
pub mod collection_service;
pub mod face_client;
pub mod indexing_service;
pub mod mapping_store;
pub mod object_store;
pub mod recognition_service;
pub mod roster_service;
pub mod upload_service;

#[cfg(test)]
pub(crate) mod testing;

/// Run one external call under a fixed deadline, folding both the call's own
/// error and an elapsed deadline into a dependency error.
pub(crate) async fn bounded<T, E, F>(
    limit: Duration,
    dependency: Dependency,
    call: F,
) -> FaceIndexResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(FaceIndexError::dependency(dependency, err)),
        Err(_) => Err(FaceIndexError::dependency(
            dependency,
            format!("timed out after {}ms", limit.as_millis()),
        )),
    }
}
