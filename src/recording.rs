//! Recording of raw response streams and playback through the same
//! processing path.
//!
//! Chunks are stored base64 encoded since a chunk may end in the middle of a
//! multi-byte character.

use crate::backend::{ApiError, ChatBackend};
use crate::mode::BackendResponse;
use crate::streaming::{ChunkStream, PlaybackChunkStream};
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::warn;

/// One recorded response stream
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecordingSession {
    /// The message that was sent
    pub message: String,
    /// Timestamp of when the recording was started
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Raw chunks as received from the backend
    pub chunks: Vec<RecordedChunk>,
}

/// Single recorded chunk with timing info
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecordedChunk {
    /// Base64 encoded raw bytes
    pub data: String,
    /// Milliseconds since recording start
    pub timestamp_ms: u64,
}

impl RecordedChunk {
    pub fn new(bytes: &[u8], timestamp_ms: u64) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            timestamp_ms,
        }
    }
}

/// Recorder for response streams, appending sessions to a JSON array file
#[derive(Clone)]
pub struct StreamRecorder {
    file_path: PathBuf,
    current_session: Arc<Mutex<Option<(RecordingSession, Instant)>>>,
}

impl StreamRecorder {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            file_path: path.as_ref().to_path_buf(),
            current_session: Arc::new(Mutex::new(None)),
        }
    }

    pub fn start_recording(&self, message: &str) {
        *self.current_session.lock().unwrap() = Some((
            RecordingSession {
                message: message.to_string(),
                timestamp: chrono::Utc::now(),
                chunks: Vec::new(),
            },
            Instant::now(),
        ));
    }

    pub fn record_chunk(&self, bytes: &[u8]) {
        if let Some((session, start_time)) = self.current_session.lock().unwrap().as_mut() {
            let timestamp_ms = start_time.elapsed().as_millis() as u64;
            session.chunks.push(RecordedChunk::new(bytes, timestamp_ms));
        }
    }

    /// End the current session and append it to the recording file
    pub fn end_recording(&self) -> Result<()> {
        let Some((session, _)) = self.current_session.lock().unwrap().take() else {
            return Ok(());
        };

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.file_path)
            .context("Failed to open recording file")?;

        let json = serde_json::to_string_pretty(&session)?;
        let file_size = file.metadata()?.len();
        if file_size == 0 {
            writeln!(file, "[")?;
        } else {
            // Drop the closing bracket (and newline) written by the previous session
            let trimmed = std::fs::read_to_string(&self.file_path)?
                .trim_end()
                .trim_end_matches(']')
                .len() as u64;
            file.set_len(trimmed)?;
            file.seek(std::io::SeekFrom::End(0))?;
            writeln!(file, ",")?;
        }
        writeln!(file, "{}", json)?;
        writeln!(file, "]")?;

        tracing::info!(
            "Recorded {} chunks to {}",
            session.chunks.len(),
            self.file_path.display()
        );
        Ok(())
    }
}

/// Load all sessions from a recording file
pub fn load_recordings(path: &Path) -> Result<Vec<RecordingSession>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read recording {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse recording {}", path.display()))
}

/// Chunk stream that records every chunk it passes through. The session is
/// written when the stream ends, fails, or is dropped early.
pub struct RecordingChunkStream {
    inner: Box<dyn ChunkStream>,
    recorder: StreamRecorder,
}

impl RecordingChunkStream {
    pub fn new(inner: Box<dyn ChunkStream>, recorder: StreamRecorder) -> Self {
        Self { inner, recorder }
    }
}

#[async_trait]
impl ChunkStream for RecordingChunkStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let chunk = match self.inner.next_chunk().await {
            Ok(chunk) => chunk,
            Err(e) => {
                self.finish();
                return Err(e);
            }
        };
        match &chunk {
            Some(bytes) => self.recorder.record_chunk(bytes),
            None => self.recorder.end_recording()?,
        }
        Ok(chunk)
    }
}

impl RecordingChunkStream {
    fn finish(&self) {
        if let Err(e) = self.recorder.end_recording() {
            warn!("Failed to write recording: {:#}", e);
        }
    }
}

// Cancelled turns stop reading before the end of the stream
impl Drop for RecordingChunkStream {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Chat backend wrapper that records stream responses of the inner backend
pub struct RecordingBackend {
    inner: Arc<dyn ChatBackend>,
    recorder: StreamRecorder,
}

impl RecordingBackend {
    pub fn new(inner: Arc<dyn ChatBackend>, recorder: StreamRecorder) -> Self {
        Self { inner, recorder }
    }
}

#[async_trait]
impl ChatBackend for RecordingBackend {
    async fn send(
        &self,
        message: &str,
        user_email: &str,
        is_assistant_enabled: bool,
    ) -> std::result::Result<BackendResponse, ApiError> {
        match self.inner.send(message, user_email, is_assistant_enabled).await? {
            BackendResponse::Stream(stream) => {
                self.recorder.start_recording(message);
                Ok(BackendResponse::Stream(Box::new(RecordingChunkStream::new(
                    stream,
                    self.recorder.clone(),
                ))))
            }
            full => Ok(full),
        }
    }
}

/// Chat backend that answers each send with the next recorded session
pub struct PlaybackBackend {
    sessions: Mutex<VecDeque<RecordingSession>>,
    fast_mode: bool,
}

impl PlaybackBackend {
    pub fn new(sessions: Vec<RecordingSession>, fast_mode: bool) -> Self {
        Self {
            sessions: Mutex::new(sessions.into()),
            fast_mode,
        }
    }

    pub fn from_file(path: &Path, fast_mode: bool) -> Result<Self> {
        Ok(Self::new(load_recordings(path)?, fast_mode))
    }
}

#[async_trait]
impl ChatBackend for PlaybackBackend {
    async fn send(
        &self,
        _message: &str,
        _user_email: &str,
        _is_assistant_enabled: bool,
    ) -> std::result::Result<BackendResponse, ApiError> {
        let session = self
            .sessions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ApiError::Network("No more recorded sessions".to_string()))?;
        Ok(BackendResponse::Stream(Box::new(PlaybackChunkStream::new(
            session.chunks,
            self.fast_mode,
        ))))
    }
}
