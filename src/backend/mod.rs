//! Clients for the external collaborators of a chat turn
//!
//! Each collaborator is a trait so sessions can run against fakes; the
//! `Http*` implementations talk to the chat backend over plain JSON requests.

pub mod chat;
pub mod embedding;
pub mod speech;
pub mod vector_db;


pub use chat::{ChatBackend, HttpChatBackend};
pub use embedding::{EmbedItem, EmbedResponse, Embedding, EmbeddingService, HttpEmbeddingService};
pub use speech::{AudioClip, AudioQueue, HttpSpeechSynthesizer, SpeechSynthesizer};
pub use vector_db::{
    HttpVectorDatabase, MatchMetadata, QueryMatch, QueryMatches, QueryResponse, VectorDatabase,
};

use reqwest::{Response, StatusCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ApiError::Decode(error.to_string())
        } else {
            ApiError::Network(error.to_string())
        }
    }
}

/// Pass successful responses through, turn anything else into an error
/// carrying the status and response text
pub async fn check_response_error(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;

    Err(ApiError::Status { status, body })
}

/// Join a base URL and an absolute API path without doubling slashes
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
