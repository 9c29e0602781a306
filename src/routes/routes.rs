//! Defines routes for the face enrollment and recognition API.
//!
//! ## Structure
//! - **Client endpoints**
//!   - `GET  /upload-url`: presigned upload grant (`content-type`, `file-extension`, `person-name`)
//!   - `POST /recognise` : identify the person in a base64 image
//!   - `GET  /faces`     : list enrolled persons
//!
//! - **Event endpoints**
//!   - `POST /events/storage`     : object-created notifications, triggers indexing
//!   - `POST /events/provisioning`: collection lifecycle handshake

use crate::{
    handlers::{
        event_handlers::{provisioning_event, storage_event},
        face_handlers::{list_faces, recognise},
        health_handlers::{healthz, readyz},
        upload_handlers::upload_url,
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router for all routes.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // client endpoints
        .route("/upload-url", get(upload_url))
        .route("/recognise", post(recognise))
        .route("/faces", get(list_faces))
        // event endpoints
        .route("/events/storage", post(storage_event))
        .route("/events/provisioning", post(provisioning_event))
}
