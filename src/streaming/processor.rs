use super::{parse_delta_line, ChunkStream, LineBuffer, StreamDecoder};
use crate::backend::SpeechSynthesizer;
use crate::config::ResponseConfig;
use crate::error::{ChatError, Result};
use crate::sentences;
use crate::types::{MessageId, MessageUpdate, UpdateCallback};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Transient state of one AI response
#[derive(Debug, Default)]
pub struct StreamBuffer {
    raw_buffer: LineBuffer,
    accumulated_text: String,
    sentences: Vec<String>,
    next_unspoken: usize,
    malformed_lines: usize,
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append decoded text. Returns true when a newline-bounded pass ran,
    /// i.e. when the accumulated text and sentences were recomputed.
    pub fn ingest(&mut self, text: &str) -> bool {
        self.raw_buffer.push(text);
        match self.raw_buffer.take_lines() {
            Some(lines) => {
                self.apply_lines(&lines);
                true
            }
            None => false,
        }
    }

    /// Treat the newline-less tail left at end of stream as a final line
    pub fn finish(&mut self) -> bool {
        match self.raw_buffer.take_remainder() {
            Some(tail) => {
                self.apply_lines(&[tail]);
                true
            }
            None => false,
        }
    }

    fn apply_lines(&mut self, lines: &[String]) {
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            match parse_delta_line(line) {
                Ok(Some(content)) => self.accumulated_text.push_str(&content),
                Ok(None) => {}
                Err(e) => {
                    self.malformed_lines += 1;
                    warn!("Failed to parse JSON line {:?}: {}", line, e);
                }
            }
        }
        self.sentences = sentences::segment(&self.accumulated_text);
    }

    /// Next sentence that has been closed by a successor and not spoken yet.
    /// The trailing sentence is never returned here.
    pub fn next_closed_sentence(&mut self) -> Option<String> {
        if self.sentences.len() > self.next_unspoken + 1 {
            let sentence = self.sentences[self.next_unspoken].clone();
            self.next_unspoken += 1;
            Some(sentence)
        } else {
            None
        }
    }

    pub fn trailing_sentence(&self) -> Option<&str> {
        self.sentences.last().map(String::as_str)
    }

    pub fn accumulated_text(&self) -> &str {
        &self.accumulated_text
    }

    pub fn sentences(&self) -> &[String] {
        &self.sentences
    }

    pub fn next_unspoken(&self) -> usize {
        self.next_unspoken
    }

    pub fn malformed_lines(&self) -> usize {
        self.malformed_lines
    }
}

/// Summary of a processed response stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamOutcome {
    pub text: String,
    pub sentences: Vec<String>,
    /// Sentences handed to speech synthesis successfully, in order
    pub spoken: Vec<String>,
    pub failed_syntheses: usize,
    pub malformed_lines: usize,
    pub cancelled: bool,
}

/// Turns a stream of newline-delimited JSON token deltas into message
/// updates and sentence-by-sentence speech.
pub struct StreamingResponseProcessor {
    config: ResponseConfig,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    cancel: CancellationToken,
}

impl StreamingResponseProcessor {
    pub fn new(config: ResponseConfig, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            config,
            synthesizer,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop reading and speaking once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &ResponseConfig {
        &self.config
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn process(
        &self,
        stream: Option<&mut dyn ChunkStream>,
        id: &MessageId,
        on_update: &UpdateCallback,
    ) -> Result<StreamOutcome> {
        let Some(stream) = stream else {
            error!("No reader available for processing the AI response stream");
            return Err(ChatError::MissingStream);
        };

        let mut decoder = StreamDecoder::new();
        let mut buffer = StreamBuffer::new();
        let mut outcome = StreamOutcome::default();

        loop {
            let chunk = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("Response stream cancelled before next read");
                    outcome.cancelled = true;
                    break;
                }
                chunk = stream.next_chunk() => chunk,
            };

            let chunk = chunk.map_err(|e| {
                error!("Failed to read response stream: {:#}", e);
                ChatError::Transport(format!("{:#}", e))
            })?;
            let Some(chunk) = chunk else {
                break;
            };

            let text = decoder.decode(&chunk);
            if buffer.ingest(&text) {
                Self::publish(&buffer, id, on_update)?;
                if self.config.is_text_to_speech_enabled {
                    self.speak_closed(&mut buffer, &mut outcome).await;
                }
            }
        }

        if !outcome.cancelled {
            let mut updated = buffer.ingest(&decoder.finish());
            updated |= buffer.finish();
            if updated {
                Self::publish(&buffer, id, on_update)?;
            }

            if self.config.is_text_to_speech_enabled {
                self.speak_closed(&mut buffer, &mut outcome).await;
                if let Some(last) = buffer.trailing_sentence().map(str::to_string) {
                    self.speak(&last, &mut outcome).await;
                }
            }
        }

        outcome.malformed_lines = buffer.malformed_lines();
        outcome.sentences = buffer.sentences().to_vec();
        outcome.text = buffer.accumulated_text;
        Ok(outcome)
    }

    fn publish(buffer: &StreamBuffer, id: &MessageId, on_update: &UpdateCallback) -> Result<()> {
        on_update(&MessageUpdate {
            id: id.clone(),
            text: buffer.accumulated_text().to_string(),
        })?;
        Ok(())
    }

    async fn speak_closed(&self, buffer: &mut StreamBuffer, outcome: &mut StreamOutcome) {
        while !outcome.cancelled {
            let Some(sentence) = buffer.next_closed_sentence() else {
                break;
            };
            self.speak(&sentence, outcome).await;
        }
    }

    async fn speak(&self, text: &str, outcome: &mut StreamOutcome) {
        if self.speak_text(text).await {
            outcome.spoken.push(text.to_string());
        } else if self.cancel.is_cancelled() {
            outcome.cancelled = true;
        } else {
            outcome.failed_syntheses += 1;
        }
    }

    /// Synthesize one utterance. Failures are logged and reported as `false`
    /// so a single failed sentence never ends the turn.
    pub async fn speak_text(&self, text: &str) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        match self
            .synthesizer
            .synthesize(text, &self.config.model, &self.config.voice)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!("Speech synthesis failed for {:?}: {:#}", text, e);
                false
            }
        }
    }
}
