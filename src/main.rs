mod cli;
mod logging;

use anyhow::{Context, Result};
use chat_assistant::backend::{
    AudioClip, AudioQueue, ChatBackend, HttpChatBackend, HttpEmbeddingService,
    HttpSpeechSynthesizer, HttpVectorDatabase,
};
use chat_assistant::config::{ResponseConfig, Settings};
use chat_assistant::rag::RagEnricher;
use chat_assistant::recording::{PlaybackBackend, RecordingBackend, StreamRecorder};
use chat_assistant::session::{ChatSession, TurnOutcome};
use chat_assistant::types::{Message, MessageId, MessageUpdate, Sender};
use cli::Args;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

fn create_chat_backend(args: &Args, settings: &Settings) -> Result<Arc<dyn ChatBackend>> {
    // If playback is specified, answer from the recording instead of the backend
    if let Some(path) = &args.playback {
        let backend = PlaybackBackend::from_file(path, args.fast_playback)?;
        info!("Playing back recorded responses from {}", path.display());
        return Ok(Arc::new(backend));
    }

    let backend = HttpChatBackend::new(settings.backend_url.clone());
    match &args.record {
        Some(path) => {
            info!("Recording response streams to {}", path.display());
            Ok(Arc::new(RecordingBackend::new(
                Arc::new(backend),
                StreamRecorder::new(path),
            )))
        }
        None => Ok(Arc::new(backend)),
    }
}

/// Write queued audio clips to `audio_dir`, or discard them when no
/// directory is configured
async fn consume_audio(mut queue: AudioQueue, audio_dir: Option<PathBuf>) {
    let mut index = 0usize;
    while let Some(clip) = queue.recv().await {
        index += 1;
        let Some(dir) = &audio_dir else {
            debug!("Discarding {} bytes of audio for {:?}", clip.audio.len(), clip.text);
            continue;
        };
        if let Err(e) = write_clip(dir, index, &clip).await {
            warn!("Failed to store audio clip: {:#}", e);
        }
    }
}

async fn write_clip(dir: &Path, index: usize, clip: &AudioClip) -> Result<()> {
    let extension = match clip.content_type.as_deref() {
        Some(ct) if ct.contains("mpeg") => "mp3",
        Some(ct) if ct.contains("wav") => "wav",
        Some(ct) if ct.contains("ogg") => "ogg",
        _ => "bin",
    };
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{:04}.{}", index, extension));
    tokio::fs::write(&path, &clip.audio)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    debug!("Stored audio for {:?} at {}", clip.text, path.display());
    Ok(())
}

/// Close the audio queue and wait until every queued clip is stored
async fn finish_audio(session: ChatSession, audio_task: JoinHandle<()>) {
    // The session owns the synthesizer, the only sender of the queue
    drop(session);
    if let Err(e) = audio_task.await {
        warn!("Audio writer stopped unexpectedly: {}", e);
    }
}

/// Prints the growing AI reply, only the part not printed yet
#[derive(Default)]
struct TranscriptPrinter {
    current: Mutex<Option<(MessageId, usize)>>,
}

impl TranscriptPrinter {
    fn print(&self, update: &MessageUpdate) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        self.render(update, &mut stdout)?;
        stdout.flush()?;
        Ok(())
    }

    fn render(&self, update: &MessageUpdate, out: &mut impl Write) -> Result<()> {
        let mut current = self.current.lock().unwrap();
        match current.as_ref() {
            Some((id, printed)) if id == &update.id && update.text.is_char_boundary(*printed) => {
                write!(out, "{}", &update.text[*printed..])?;
            }
            _ => {
                let message = Message::ai(update.id.clone(), update.text.as_str());
                write!(out, "\n{}", message.display_text())?;
            }
        }
        *current = Some((update.id.clone(), update.text.len()));
        Ok(())
    }
}

/// Cancellation handle of the turn in progress, if any
type CurrentTurn = Arc<Mutex<Option<CancellationToken>>>;

async fn run_turn(
    session: &ChatSession,
    message: &str,
    config: &ResponseConfig,
    current_turn: &CurrentTurn,
) {
    let cancel = CancellationToken::new();
    *current_turn.lock().unwrap() = Some(cancel.clone());
    let outcome = session.send_user_message(message, config, cancel).await;
    current_turn.lock().unwrap().take();

    match outcome {
        TurnOutcome::Ignored => {}
        TurnOutcome::Completed { .. } => println!(),
        // Already logged by the session
        TurnOutcome::Failed { error, .. } => eprintln!("\nError: {}", error),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    logging::setup_logging(args.verbose);

    let mut settings = Settings::load()?;
    args.apply_to(&mut settings);
    if settings.user_email.is_empty() {
        warn!("No user email configured, requests are sent anonymously");
    }

    let backend = create_chat_backend(&args, &settings)?;
    let (synthesizer, audio_queue) = HttpSpeechSynthesizer::new(settings.backend_url.clone());
    let audio_task = tokio::spawn(consume_audio(audio_queue, settings.audio_dir.clone()));

    let printer = Arc::new(TranscriptPrinter::default());
    let mut session = ChatSession::new(backend, Arc::new(synthesizer), settings.user_email.clone())
        .with_observer(Arc::new(move |update: &MessageUpdate| printer.print(update)));
    if settings.response.is_rag_enabled {
        session = session.with_rag(RagEnricher::new(
            Arc::new(HttpEmbeddingService::new(settings.backend_url.clone())),
            Arc::new(HttpVectorDatabase::new(settings.backend_url.clone())),
        ));
    }

    // Ctrl+C cancels the turn in progress, or exits when idle
    let current_turn: CurrentTurn = Arc::new(Mutex::new(None));
    {
        let current_turn = current_turn.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                match current_turn.lock().unwrap().as_ref() {
                    Some(cancel) => {
                        info!("Cancelling current response");
                        cancel.cancel();
                    }
                    None => std::process::exit(130),
                }
            }
        });
    }

    if let Some(message) = &args.message {
        println!("{}", Message::user(message.as_str()).display_text());
        run_turn(&session, message, &settings.response, &current_turn).await;
        finish_audio(session, audio_task).await;
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}", Sender::User.prefix());
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if matches!(line.trim(), "/quit" | "/exit") {
            break;
        }
        run_turn(&session, &line, &settings.response, &current_turn).await;
    }

    debug!(
        "Session ended with {} messages",
        session.conversation().len()
    );
    finish_audio(session, audio_task).await;
    Ok(())
}
