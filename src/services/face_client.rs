//! Face recognition capability.
//!
//! `FaceService` is the narrow surface the orchestration code needs. The
//! production implementation speaks a Rekognition-shaped JSON API over HTTP.

use crate::models::face::{FaceMatch, ObjectRef};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum FaceServiceError {
    #[error("face service base url `{0}` cannot carry path segments")]
    InvalidBaseUrl(String),
    #[error("face service responded with {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("face service unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type FaceServiceResult<T> = Result<T, FaceServiceError>;

#[async_trait]
pub trait FaceService: Send + Sync {
    async fn create_collection(&self, collection_id: &str) -> FaceServiceResult<()>;

    async fn delete_collection(&self, collection_id: &str) -> FaceServiceResult<()>;

    /// Detect faces in a stored object and add them to the collection.
    /// Returns one entry per indexed face, possibly none.
    async fn index_face(
        &self,
        collection_id: &str,
        object: &ObjectRef,
    ) -> FaceServiceResult<Vec<FaceMatch>>;

    /// Search the collection for faces similar to the largest face in `image`.
    async fn search_by_image(
        &self,
        collection_id: &str,
        image: &[u8],
        max_candidates: usize,
        min_confidence: f32,
    ) -> FaceServiceResult<Vec<FaceMatch>>;
}

/// HTTP client for the face recognition service.
#[derive(Clone)]
pub struct HttpFaceService {
    client: Client,
    base_url: Url,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateCollectionBody<'a> {
    collection_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct IndexFacesBody<'a> {
    image: ImageBody<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SearchFacesBody<'a> {
    image: ImageBody<'a>,
    max_faces: usize,
    face_match_threshold: f32,
}

#[derive(Serialize)]
enum ImageBody<'a> {
    #[serde(rename = "S3Object")]
    Stored {
        #[serde(rename = "Bucket")]
        bucket: &'a str,
        #[serde(rename = "Name")]
        name: &'a str,
    },
    #[serde(rename = "Bytes")]
    Inline(String),
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct IndexFacesReply {
    #[serde(default)]
    face_records: Vec<FaceRecordReply>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct FaceRecordReply {
    face: FaceReply,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct SearchFacesReply {
    #[serde(default)]
    face_matches: Vec<FaceMatchReply>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct FaceMatchReply {
    similarity: f32,
    face: FaceReply,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct FaceReply {
    face_id: String,
    confidence: f32,
}

impl HttpFaceService {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Append path segments to the base URL, escaping each one.
    fn endpoint(&self, segments: &[&str]) -> FaceServiceResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FaceServiceError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&(impl Serialize + Sync)>,
    ) -> FaceServiceResult<reqwest::Response> {
        debug!(%method, %url, "calling face service");
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(unavailable_or_http)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FaceServiceError::Status { status, body });
        }
        Ok(response)
    }

    async fn post_json<B, R>(&self, url: Url, body: &B) -> FaceServiceResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        Ok(self
            .send(Method::POST, url, Some(body))
            .await?
            .json::<R>()
            .await?)
    }
}

/// Connection and timeout failures mean the service is unreachable, as
/// opposed to a malformed exchange.
fn unavailable_or_http(err: reqwest::Error) -> FaceServiceError {
    if err.is_connect() || err.is_timeout() {
        FaceServiceError::Unavailable(err.to_string())
    } else {
        FaceServiceError::Http(err)
    }
}

#[async_trait]
impl FaceService for HttpFaceService {
    async fn create_collection(&self, collection_id: &str) -> FaceServiceResult<()> {
        let url = self.endpoint(&["collections"])?;
        self.send(
            Method::POST,
            url,
            Some(&CreateCollectionBody { collection_id }),
        )
        .await?;
        Ok(())
    }

    async fn delete_collection(&self, collection_id: &str) -> FaceServiceResult<()> {
        let url = self.endpoint(&["collections", collection_id])?;
        self.send(Method::DELETE, url, None::<&()>).await?;
        Ok(())
    }

    async fn index_face(
        &self,
        collection_id: &str,
        object: &ObjectRef,
    ) -> FaceServiceResult<Vec<FaceMatch>> {
        let url = self.endpoint(&["collections", collection_id, "faces", "index"])?;
        let body = IndexFacesBody {
            image: ImageBody::Stored {
                bucket: &object.bucket,
                name: &object.key,
            },
        };
        let reply: IndexFacesReply = self.post_json(url, &body).await?;
        Ok(reply
            .face_records
            .into_iter()
            .map(|record| FaceMatch::new(record.face.face_id, record.face.confidence))
            .collect())
    }

    async fn search_by_image(
        &self,
        collection_id: &str,
        image: &[u8],
        max_candidates: usize,
        min_confidence: f32,
    ) -> FaceServiceResult<Vec<FaceMatch>> {
        let url = self.endpoint(&["collections", collection_id, "faces", "search"])?;
        let body = SearchFacesBody {
            image: ImageBody::Inline(general_purpose::STANDARD.encode(image)),
            max_faces: max_candidates,
            face_match_threshold: min_confidence,
        };
        let reply: SearchFacesReply = self.post_json(url, &body).await?;
        debug!(
            candidates = reply.face_matches.len(),
            "face service search reply"
        );
        Ok(reply
            .face_matches
            .into_iter()
            .map(|m| {
                debug!(face_id = %m.face.face_id, detection = m.face.confidence, "candidate");
                FaceMatch::new(m.face.face_id, m.similarity)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(base: &str) -> HttpFaceService {
        HttpFaceService::new(Client::new(), Url::parse(base).unwrap())
    }

    #[test]
    fn endpoint_escapes_collection_segment() {
        let url = service("http://faces.local/api/")
            .endpoint(&["collections", "team faces", "faces", "index"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://faces.local/api/collections/team%20faces/faces/index"
        );
    }

    #[test]
    fn stored_image_serializes_as_s3_object() {
        let body = IndexFacesBody {
            image: ImageBody::Stored {
                bucket: "uploads",
                name: "index/static/a.jpg",
            },
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "Image": {"S3Object": {"Bucket": "uploads", "Name": "index/static/a.jpg"}}
            })
        );
    }

    #[test]
    fn search_body_carries_threshold_and_bytes() {
        let body = SearchFacesBody {
            image: ImageBody::Inline(general_purpose::STANDARD.encode(b"img")),
            max_faces: 1,
            face_match_threshold: 90.0,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "Image": {"Bytes": "aW1n"},
                "MaxFaces": 1,
                "FaceMatchThreshold": 90.0
            })
        );
    }

    #[test]
    fn search_reply_tolerates_missing_matches() {
        let reply: SearchFacesReply = serde_json::from_str("{}").unwrap();
        assert!(reply.face_matches.is_empty());
    }
}
