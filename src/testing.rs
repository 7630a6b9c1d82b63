//! Fakes shared by the unit tests

use crate::backend::{ApiError, ChatBackend, SpeechSynthesizer};
use crate::mode::{BackendResponse, FullResponse};
use crate::streaming::ChunkStream;
use crate::types::{MessageUpdate, UpdateCallback};
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Chunk stream over a fixed list of chunks. Can fail after the chunks run
/// out, or cancel a token once a given number of chunks was read.
pub struct VecChunkStream {
    chunks: VecDeque<Vec<u8>>,
    fail_at_end: bool,
    cancel_after: Option<(usize, CancellationToken)>,
    read: usize,
}

impl VecChunkStream {
    pub fn new<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        Self {
            chunks: chunks.into_iter().map(|c| c.as_ref().to_vec()).collect(),
            fail_at_end: false,
            cancel_after: None,
            read: 0,
        }
    }

    pub fn failing_at_end(mut self) -> Self {
        self.fail_at_end = true;
        self
    }

    pub fn cancelling_after(mut self, chunks: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((chunks, token));
        self
    }
}

#[async_trait]
impl ChunkStream for VecChunkStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let chunk = self.chunks.pop_front();
        if chunk.is_some() {
            self.read += 1;
            if let Some((after, token)) = &self.cancel_after {
                if self.read >= *after {
                    token.cancel();
                }
            }
        } else if self.fail_at_end {
            anyhow::bail!("connection reset");
        }
        Ok(chunk)
    }
}

/// Synthesizer that records every request and can be told to fail on
/// specific texts
#[derive(Default)]
pub struct FakeSynthesizer {
    pub calls: Mutex<Vec<String>>,
    pub fail_on: Vec<String>,
}

impl FakeSynthesizer {
    pub fn failing_on(texts: &[&str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_on: texts.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str, _model: &str, _voice: &str) -> Result<()> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.fail_on.iter().any(|t| t == text) {
            anyhow::bail!("synthesis unavailable");
        }
        Ok(())
    }
}

/// Collects update events
#[derive(Clone, Default)]
pub struct UpdateCollector {
    updates: Arc<Mutex<Vec<MessageUpdate>>>,
}

impl UpdateCollector {
    pub fn callback(&self) -> UpdateCallback {
        let updates = self.updates.clone();
        Box::new(move |update: &MessageUpdate| {
            updates.lock().unwrap().push(update.clone());
            Ok(())
        })
    }

    pub fn updates(&self) -> Vec<MessageUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.updates().into_iter().map(|u| u.text).collect()
    }
}

/// Encode text deltas as newline-delimited JSON lines
pub fn delta_lines(deltas: &[&str]) -> Vec<String> {
    deltas
        .iter()
        .map(|d| format!("{}\n", serde_json::json!({"choices": [{"delta": {"content": d}}]})))
        .collect()
}

pub enum Scripted {
    Stream(Vec<Vec<u8>>),
    Full(Option<&'static str>, &'static str),
    Error,
}

/// Chat backend answering each send with the next scripted response
#[derive(Default)]
pub struct FakeBackend {
    responses: Mutex<VecDeque<Scripted>>,
    pub sent: Mutex<Vec<(String, String, bool)>>,
}

impl FakeBackend {
    pub fn new(responses: Vec<Scripted>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            sent: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn send(
        &self,
        message: &str,
        user_email: &str,
        is_assistant_enabled: bool,
    ) -> std::result::Result<BackendResponse, ApiError> {
        self.sent.lock().unwrap().push((
            message.to_string(),
            user_email.to_string(),
            is_assistant_enabled,
        ));
        match self.responses.lock().unwrap().pop_front() {
            Some(Scripted::Stream(chunks)) => {
                Ok(BackendResponse::Stream(Box::new(VecChunkStream::new(chunks))))
            }
            Some(Scripted::Full(content_type, body)) => Ok(BackendResponse::Full(FullResponse {
                content_type: content_type.map(str::to_string),
                body: Bytes::from_static(body.as_bytes()),
            })),
            Some(Scripted::Error) | None => Err(ApiError::Network("backend unavailable".into())),
        }
    }
}
