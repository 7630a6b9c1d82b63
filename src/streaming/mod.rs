//! Streaming response handling
//!
//! This module turns a chunked response body of newline-delimited JSON token
//! deltas into incremental message updates and sentence-by-sentence speech.
//! Chunk sources are abstracted behind [`ChunkStream`] so live HTTP bodies
//! and recorded playback go through identical processing.

mod decoder;
mod delta;
mod line_buffer;
mod processor;


pub use decoder::StreamDecoder;
pub use delta::parse_delta_line;
pub use line_buffer::LineBuffer;
pub use processor::{StreamBuffer, StreamOutcome, StreamingResponseProcessor};

use crate::recording::RecordedChunk;
use anyhow::Result;
use async_trait::async_trait;
use base64::Engine;
use reqwest::Response;
use std::time::{Duration, Instant};

/// Source of raw response body chunks
#[async_trait]
pub trait ChunkStream: Send {
    /// Next chunk, or `None` once the stream has ended
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Real HTTP response chunk stream
pub struct HttpChunkStream {
    response: Response,
}

impl HttpChunkStream {
    pub fn new(response: Response) -> Self {
        Self { response }
    }
}

#[async_trait]
impl ChunkStream for HttpChunkStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        match self.response.chunk().await {
            Ok(Some(chunk)) => Ok(Some(chunk.to_vec())),
            Ok(None) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("HTTP chunk error: {}", e)),
        }
    }
}

/// Recorded chunk stream for playback
pub struct PlaybackChunkStream {
    chunks: Vec<RecordedChunk>,
    current_index: usize,
    start_time: Option<Instant>,
    fast_mode: bool,
}

impl PlaybackChunkStream {
    pub fn new(chunks: Vec<RecordedChunk>, fast_mode: bool) -> Self {
        Self {
            chunks,
            current_index: 0,
            start_time: None,
            fast_mode,
        }
    }
}

#[async_trait]
impl ChunkStream for PlaybackChunkStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(chunk) = self.chunks.get(self.current_index) else {
            return Ok(None);
        };
        let start_time = *self.start_time.get_or_insert_with(Instant::now);

        if !self.fast_mode {
            let elapsed = start_time.elapsed();
            let expected_time = Duration::from_millis(chunk.timestamp_ms);
            if elapsed < expected_time {
                tokio::time::sleep(expected_time - elapsed).await;
            }
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&chunk.data)
            .map_err(|e| anyhow::anyhow!("Corrupt recorded chunk {}: {}", self.current_index, e))?;
        self.current_index += 1;

        Ok(Some(bytes))
    }
}
