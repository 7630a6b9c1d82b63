use super::{check_response_error, endpoint};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Serialize;
use tokio::sync::mpsc;

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` and queue the audio for playback
    async fn synthesize(&self, text: &str, model: &str, voice: &str) -> Result<()>;
}

/// Synthesized audio for one utterance
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub text: String,
    pub content_type: Option<String>,
    pub audio: Bytes,
}

pub type AudioQueue = mpsc::UnboundedReceiver<AudioClip>;

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model: &'a str,
    voice: &'a str,
}

/// Posts text to the backend's speech route and queues the returned audio
pub struct HttpSpeechSynthesizer {
    client: Client,
    base_url: String,
    queue: mpsc::UnboundedSender<AudioClip>,
}

impl HttpSpeechSynthesizer {
    /// Create the synthesizer together with the receiving end of its audio queue
    pub fn new(base_url: String) -> (Self, AudioQueue) {
        let (queue, rx) = mpsc::unbounded_channel();
        (
            Self {
                client: Client::new(),
                base_url,
                queue,
            },
            rx,
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechSynthesizer {
    async fn synthesize(&self, text: &str, model: &str, voice: &str) -> Result<()> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "/api/tts"))
            .json(&SpeechRequest { text, model, voice })
            .send()
            .await
            .context("Failed to reach speech service")?;
        let response = check_response_error(response).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let audio = response
            .bytes()
            .await
            .context("Failed to read synthesized audio")?;

        tracing::debug!("Queued {} bytes of audio for {:?}", audio.len(), text);
        self.queue
            .send(AudioClip {
                text: text.to_string(),
                content_type,
                audio,
            })
            .map_err(|_| anyhow::anyhow!("Audio queue closed"))
    }
}
