use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// External collaborator an orchestration step talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    FaceService,
    MappingStore,
    ObjectStore,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dependency::FaceService => "face service",
            Dependency::MappingStore => "mapping store",
            Dependency::ObjectStore => "object store",
        };
        f.write_str(name)
    }
}

/// Failure taxonomy shared by the enrollment and recognition components.
#[derive(Debug, Error)]
pub enum FaceIndexError {
    /// Bad or missing required input. Returned before any external call.
    #[error("{0}")]
    Validation(String),
    #[error("{dependency} call failed: {message}")]
    Dependency {
        dependency: Dependency,
        message: String,
    },
    /// Descriptor known to the face service but absent from the mapping store.
    #[error("face `{face_id}` is indexed but has no enrollment record")]
    DataInconsistency { face_id: String },
    #[error("provisioning failed: {0}")]
    Provisioning(String),
}

impl FaceIndexError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn dependency(dependency: Dependency, err: impl fmt::Display) -> Self {
        Self::Dependency {
            dependency,
            message: err.to_string(),
        }
    }
}

pub type FaceIndexResult<T> = Result<T, FaceIndexError>;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// Shortcut for 502 Bad Gateway, used when a downstream dependency failed.
    pub fn bad_gateway(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "message": self.message }));

        (self.status, body).into_response()
    }
}

impl From<FaceIndexError> for AppError {
    fn from(err: FaceIndexError) -> Self {
        match err {
            FaceIndexError::Validation(msg) => AppError::bad_request(msg),
            err @ FaceIndexError::Dependency { .. } => AppError::bad_gateway(err.to_string()),
            other => AppError::internal(other.to_string()),
        }
    }
}
