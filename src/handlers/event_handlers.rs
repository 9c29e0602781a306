//! Inbound events from the storage layer and the provisioning orchestrator.
//!
//! - `POST /events/storage`     : object-created notification, triggers indexing
//! - `POST /events/provisioning`: collection create/update/delete handshake

use crate::{
    errors::{AppError, FaceIndexError},
    models::{provisioning::ProvisioningEvent, storage_event::StorageEvent},
    services::indexing_service::IndexOutcome,
    state::AppState,
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

#[derive(Debug, Serialize)]
pub struct StorageEventResponse {
    pub results: Vec<IndexOutcome>,
}

/// Index every object announced by the event.
///
/// Any dependency failure aborts with 502 so the event source retries the
/// whole notification; records already written stay, and a retry enrolls
/// those objects again under new descriptor ids.
///
/// The work runs on its own task so a dropped connection cannot leave a
/// face indexed without its enrollment record.
pub async fn storage_event(
    State(state): State<AppState>,
    Json(event): Json<StorageEvent>,
) -> Result<Json<StorageEventResponse>, AppError> {
    let objects = event.into_objects();
    if objects.is_empty() {
        return Err(AppError::bad_request("storage event carries no objects"));
    }

    let indexer = state.indexer.clone();
    let results = tokio::spawn(async move {
        let mut results = Vec::with_capacity(objects.len());
        for object in &objects {
            info!(bucket = %object.bucket, key = %object.key, "indexing stored object");
            results.push(indexer.index(object).await?);
        }
        Ok::<_, FaceIndexError>(results)
    })
    .await
    .map_err(|err| {
        error!(error = %err, "indexing task aborted");
        AppError::internal(format!("indexing task aborted: {}", err))
    })??;

    Ok(Json(StorageEventResponse { results }))
}

/// Run the provisioning handshake. The callback has been sent by the time
/// this returns 200.
///
/// The handshake is detached from the request so the callback still goes
/// out if the caller hangs up first.
pub async fn provisioning_event(
    State(state): State<AppState>,
    Json(event): Json<ProvisioningEvent>,
) -> Result<impl IntoResponse, AppError> {
    let collections = state.collections.clone();
    let request_id = event.request_id.clone();
    let outcome = tokio::spawn(async move { collections.handle(&event).await }).await;

    match outcome {
        Ok(Ok(status)) => Ok((StatusCode::OK, Json(json!({ "status": status })))),
        Ok(Err(err)) => {
            error!(request_id = %request_id, error = %err, "provisioning callback failed");
            Err(AppError::bad_gateway(err.to_string()))
        }
        Err(err) => {
            error!(request_id = %request_id, error = %err, "provisioning task aborted");
            Err(AppError::bad_gateway(format!("provisioning task aborted: {}", err)))
        }
    }
}
