use chat_assistant::config::Settings;
use clap::Parser;
use std::path::PathBuf;

/// Define the application arguments
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Message to send; starts an interactive session when omitted
    pub message: Option<String>,

    /// Base URL of the chat backend (overrides settings)
    #[arg(long)]
    pub backend_url: Option<String>,

    /// Email identifying the user towards the backend
    #[arg(short = 'u', long)]
    pub user_email: Option<String>,

    /// Request one complete assistant reply instead of a token stream
    #[arg(short, long)]
    pub assistant: bool,

    /// Speak the reply sentence by sentence
    #[arg(long)]
    pub tts: bool,

    /// Enrich messages with matching document chunks
    #[arg(long)]
    pub rag: bool,

    /// Speech model name
    #[arg(long)]
    pub model: Option<String>,

    /// Speech voice name
    #[arg(long)]
    pub voice: Option<String>,

    /// Number of document chunks to retrieve with --rag
    #[arg(long)]
    pub top_k: Option<u32>,

    /// Directory to write synthesized audio clips to
    #[arg(long)]
    pub audio_dir: Option<PathBuf>,

    /// Enable verbose logging (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Record response streams to a file
    #[arg(long)]
    pub record: Option<PathBuf>,

    /// Play back recorded response streams from a file
    #[arg(long, conflicts_with = "record")]
    pub playback: Option<PathBuf>,

    /// Fast playback mode - ignore chunk timing when playing recordings
    #[arg(long)]
    pub fast_playback: bool,
}

impl Args {
    pub fn parse() -> Self {
        <Args as Parser>::parse()
    }

    /// Apply command line overrides on top of the loaded settings. Flags only
    /// ever switch features on; settings can enable them too.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(url) = &self.backend_url {
            settings.backend_url = url.clone();
        }
        if let Some(email) = &self.user_email {
            settings.user_email = email.clone();
        }
        if let Some(dir) = &self.audio_dir {
            settings.audio_dir = Some(dir.clone());
        }

        let response = &mut settings.response;
        response.is_assistant_enabled |= self.assistant;
        response.is_text_to_speech_enabled |= self.tts;
        response.is_rag_enabled |= self.rag;
        if let Some(model) = &self.model {
            response.model = model.clone();
        }
        if let Some(voice) = &self.voice {
            response.voice = voice.clone();
        }
        if let Some(top_k) = self.top_k {
            response.top_k = top_k;
        }
    }
}
