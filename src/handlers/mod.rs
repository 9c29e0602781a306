//! HTTP handlers. Each request is an independent invocation over the shared,
//! immutable [`AppState`](crate::state::AppState).

use axum::http::{HeaderName, HeaderValue, header};

pub mod event_handlers;
pub mod face_handlers;
pub mod health_handlers;
pub mod upload_handlers;

/// CORS headers browsers need to call the client-facing routes directly.
pub(crate) fn cors_headers() -> [(HeaderName, HeaderValue); 2] {
    [
        (
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ),
        (
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST,GET"),
        ),
    ]
}
