//! `GET /upload-url`: issue a presigned upload grant.

use crate::{
    errors::AppError, handlers::cors_headers, models::upload::UploadRequest, state::AppState,
};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Query params accepted by the upload-url endpoint. Missing values are empty.
#[derive(Debug, Default, Deserialize)]
pub struct UploadUrlQuery {
    #[serde(rename = "content-type", default)]
    pub content_type: String,
    #[serde(rename = "file-extension", default)]
    pub file_extension: String,
    #[serde(rename = "person-name", default)]
    pub person_name: String,
}

#[derive(Debug, Serialize)]
pub struct UploadUrlResponse {
    #[serde(rename = "uploadURL")]
    pub upload_url: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
}

pub async fn upload_url(
    State(state): State<AppState>,
    Query(q): Query<UploadUrlQuery>,
) -> Result<Response, AppError> {
    let request = UploadRequest {
        content_type: q.content_type,
        file_extension: q.file_extension,
        person_name: q.person_name,
    };

    let grant = state.uploads.issue(&request).await?;
    debug!(
        target_key = %grant.target_key,
        expires_at = %grant.expires_at,
        content_type = %grant.content_type,
        metadata = ?grant.metadata,
        "returning upload grant"
    );

    Ok((
        StatusCode::OK,
        cors_headers(),
        Json(UploadUrlResponse {
            upload_url: grant.url,
            file_name: grant.file_name,
        }),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{Fakes, json_body};

    #[tokio::test]
    async fn returns_upload_url_and_file_name() {
        let fakes = Fakes::default();
        let response = upload_url(
            State(fakes.state()),
            Query(UploadUrlQuery {
                content_type: "image/jpeg".into(),
                file_extension: ".jpg".into(),
                person_name: "Ada".into(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );
        let body = json_body(response).await;
        let file_name = body["fileName"].as_str().unwrap();
        assert!(file_name.ends_with(".jpg"));
        assert!(body["uploadURL"].as_str().unwrap().contains(file_name));
    }

    #[tokio::test]
    async fn missing_params_answer_bad_request() {
        let fakes = Fakes::default();
        let err = upload_url(State(fakes.state()), Query(UploadUrlQuery::default()))
            .await
            .err()
            .expect("missing params rejected");

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["message"],
            "Both content-type and file-extension need to passed as query param!"
        );
        assert_eq!(fakes.objects.presign_count(), 0);
    }
}
