//! Recognition and roster endpoints.
//!
//! - `POST /recognise`: body is a base64 image; answers a name or "no match"
//! - `GET  /faces`    : every enrolled person with a display URL

use crate::{
    errors::AppError,
    handlers::cors_headers,
    services::recognition_service::{Recognition, decode_image_payload},
    state::AppState,
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

pub const NO_MATCH_MESSAGE: &str = "No match found in the record";

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RecognizeResponse {
    Match { person_name: String },
    NoMatch { message: String },
}

impl From<Recognition> for RecognizeResponse {
    fn from(recognition: Recognition) -> Self {
        match recognition {
            Recognition::Matched { person_name, .. } => RecognizeResponse::Match { person_name },
            Recognition::NoMatch(_) => RecognizeResponse::NoMatch {
                message: NO_MATCH_MESSAGE.into(),
            },
        }
    }
}

/// `POST /recognise`
///
/// Only a missing or malformed payload is an error (400). Matching itself
/// fails open, so dependency trouble still answers 200 "no match".
pub async fn recognise(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let image = decode_image_payload(&body)?;
    debug!(bytes = image.len(), "recognising image");

    let recognition = state.recognizer.recognize(&image).await?;

    Ok((
        StatusCode::OK,
        cors_headers(),
        Json(RecognizeResponse::from(recognition)),
    )
        .into_response())
}

/// `GET /faces`
pub async fn list_faces(State(state): State<AppState>) -> Result<Response, AppError> {
    let entries = state.roster.list().await?;
    Ok((StatusCode::OK, cors_headers(), Json(entries)).into_response())
}
