//! Selection between the two response shapes a chat backend can return:
//! one complete assistant reply, or a live token stream.

use crate::error::{ChatError, Result};
use crate::streaming::{ChunkStream, StreamOutcome, StreamingResponseProcessor};
use crate::types::{MessageId, MessageUpdate, UpdateCallback};
use bytes::Bytes;
use std::fmt;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// One complete reply
    Assistant,
    /// Newline-delimited JSON token deltas
    Stream,
}

impl ResponseMode {
    pub fn from_header(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "assistant" => Some(Self::Assistant),
            "stream" => Some(Self::Stream),
            _ => None,
        }
    }
}

/// A complete response body with its declared content type
#[derive(Debug, Clone)]
pub struct FullResponse {
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FullResponse {
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json"))
    }

    /// Decode the body into message text. JSON strings yield their value,
    /// other JSON values their compact serialization, anything else is read
    /// as UTF-8 text.
    pub fn decode_text(&self) -> Result<String> {
        if self.is_json() {
            let value: serde_json::Value = serde_json::from_slice(&self.body)
                .map_err(|e| ChatError::Decode(e.to_string()))?;
            Ok(match value {
                serde_json::Value::String(text) => text,
                other => other.to_string(),
            })
        } else {
            Ok(String::from_utf8_lossy(&self.body).into_owned())
        }
    }
}

/// Backend response, tagged with its shape by the backend client
pub enum BackendResponse {
    Full(FullResponse),
    Stream(Box<dyn ChunkStream>),
}

impl BackendResponse {
    fn kind(&self) -> &'static str {
        match self {
            BackendResponse::Full(_) => "full",
            BackendResponse::Stream(_) => "stream",
        }
    }
}

impl fmt::Debug for BackendResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendResponse::Full(full) => f.debug_tuple("Full").field(full).finish(),
            BackendResponse::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// What a dispatched turn produced
#[derive(Debug, Clone, PartialEq)]
pub enum TurnResult {
    Full { text: String, spoken: bool },
    Streamed(StreamOutcome),
}

impl TurnResult {
    pub fn text(&self) -> &str {
        match self {
            TurnResult::Full { text, .. } => text,
            TurnResult::Streamed(outcome) => &outcome.text,
        }
    }
}

pub struct ResponseModeSelector<'a> {
    processor: &'a StreamingResponseProcessor,
}

impl<'a> ResponseModeSelector<'a> {
    pub fn new(processor: &'a StreamingResponseProcessor) -> Self {
        Self { processor }
    }

    pub async fn dispatch(
        &self,
        response: BackendResponse,
        is_assistant_enabled: bool,
        id: &MessageId,
        on_update: &UpdateCallback,
    ) -> Result<TurnResult> {
        match (is_assistant_enabled, response) {
            (true, BackendResponse::Full(full)) => self.handle_full(full, id, on_update).await,
            (false, BackendResponse::Stream(mut stream)) => {
                let outcome = self
                    .processor
                    .process(Some(stream.as_mut()), id, on_update)
                    .await?;
                Ok(TurnResult::Streamed(outcome))
            }
            (is_assistant_enabled, other) => {
                let expected = if is_assistant_enabled { "full" } else { "stream" };
                error!("Expected a {} response, received: {:?}", expected, other);
                Err(ChatError::ShapeMismatch {
                    expected,
                    received: other.kind(),
                })
            }
        }
    }

    async fn handle_full(
        &self,
        full: FullResponse,
        id: &MessageId,
        on_update: &UpdateCallback,
    ) -> Result<TurnResult> {
        let text = full.decode_text()?;
        debug!("Received full assistant reply ({} bytes)", text.len());
        on_update(&MessageUpdate {
            id: id.clone(),
            text: text.clone(),
        })?;

        let spoken = if self.processor.config().is_text_to_speech_enabled {
            self.processor.speak_text(&text).await
        } else {
            false
        };

        Ok(TurnResult::Full { text, spoken })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full(content_type: Option<&str>, body: &str) -> FullResponse {
        FullResponse {
            content_type: content_type.map(str::to_string),
            body: Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn test_json_string_body() {
        let response = full(Some("application/json; charset=utf-8"), "\"plain reply\"");
        assert_eq!(response.decode_text().unwrap(), "plain reply");
    }

    #[test]
    fn test_json_object_body() {
        let response = full(Some("application/json"), r#"{"answer": 42}"#);
        assert_eq!(response.decode_text().unwrap(), r#"{"answer":42}"#);
    }

    #[test]
    fn test_text_body() {
        let response = full(Some("text/plain"), "\"quoted\" text");
        assert_eq!(response.decode_text().unwrap(), "\"quoted\" text");
        assert_eq!(full(None, "raw").decode_text().unwrap(), "raw");
    }

    #[test]
    fn test_invalid_json_body() {
        let response = full(Some("application/json"), "not json");
        assert!(matches!(response.decode_text(), Err(ChatError::Decode(_))));
    }

    #[test]
    fn test_mode_header() {
        assert_eq!(ResponseMode::from_header("assistant"), Some(ResponseMode::Assistant));
        assert_eq!(ResponseMode::from_header(" Stream "), Some(ResponseMode::Stream));
        assert_eq!(ResponseMode::from_header("other"), None);
    }
}
