//! Delivery of provisioning completion callbacks.

use crate::models::provisioning::CallbackResponse;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("callback endpoint responded with {0}")]
    Status(StatusCode),
    #[error("callback delivery timed out")]
    Timeout,
    #[error("callback delivery failed: {0}")]
    Delivery(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait CallbackSender: Send + Sync {
    async fn send(&self, response_url: &str, body: &CallbackResponse) -> Result<(), CallbackError>;
}

/// PUTs the callback document to the orchestrator's presigned response URL.
#[derive(Clone)]
pub struct HttpCallbackSender {
    client: Client,
}

impl HttpCallbackSender {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CallbackSender for HttpCallbackSender {
    async fn send(&self, response_url: &str, body: &CallbackResponse) -> Result<(), CallbackError> {
        // The response URL is presigned for an empty content type.
        let payload = serde_json::to_vec(body)
            .map_err(|err| CallbackError::Delivery(err.to_string()))?;
        let response = self
            .client
            .put(response_url)
            .header(reqwest::header::CONTENT_TYPE, "")
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        info!(%status, "callback delivered");
        if !status.is_success() {
            return Err(CallbackError::Status(status));
        }
        Ok(())
    }
}
