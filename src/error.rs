use crate::backend::ApiError;
use thiserror::Error;

/// Errors that end processing of the current chat turn
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("No stream available for processing the AI response")]
    MissingStream,

    #[error("Expected {expected} response, received {received}")]
    ShapeMismatch {
        expected: &'static str,
        received: &'static str,
    },

    #[error("Backend error: {0}")]
    Backend(#[from] ApiError),

    #[error("Failed to decode response body: {0}")]
    Decode(String),

    #[error("RAG enrichment failed: {0}")]
    Rag(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ChatError>;
