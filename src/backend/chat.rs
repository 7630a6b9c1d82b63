use super::{check_response_error, endpoint, ApiError};
use crate::mode::{BackendResponse, FullResponse, ResponseMode};
use crate::streaming::HttpChunkStream;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

/// Header the backend uses to declare which response shape it returned
pub const RESPONSE_MODE_HEADER: &str = "x-response-mode";

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send the (possibly enriched) user message. The returned value is
    /// tagged with the response shape; failures are errors, never an empty
    /// response.
    async fn send(
        &self,
        message: &str,
        user_email: &str,
        is_assistant_enabled: bool,
    ) -> Result<BackendResponse, ApiError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest<'a> {
    user_message: &'a str,
    user_email: &'a str,
    is_assistant_enabled: bool,
}

pub struct HttpChatBackend {
    client: Client,
    base_url: String,
}

impl HttpChatBackend {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub fn with_client(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn send(
        &self,
        message: &str,
        user_email: &str,
        is_assistant_enabled: bool,
    ) -> Result<BackendResponse, ApiError> {
        let url = endpoint(&self.base_url, "/api/chat");
        debug!("Sending chat message to {}", url);

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest {
                user_message: message,
                user_email,
                is_assistant_enabled,
            })
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let response = check_response_error(response).await?;

        let requested = if is_assistant_enabled {
            ResponseMode::Assistant
        } else {
            ResponseMode::Stream
        };
        let mode = response
            .headers()
            .get(RESPONSE_MODE_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(ResponseMode::from_header)
            .unwrap_or(requested);

        match mode {
            ResponseMode::Stream => Ok(BackendResponse::Stream(Box::new(HttpChunkStream::new(
                response,
            )))),
            ResponseMode::Assistant => {
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string);
                let body = response.bytes().await?;
                Ok(BackendResponse::Full(FullResponse { content_type, body }))
            }
        }
    }
}
