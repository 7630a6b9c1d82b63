use crate::backend::{ChatBackend, SpeechSynthesizer};
use crate::config::ResponseConfig;
use crate::conversation::Conversation;
use crate::error::{ChatError, Result};
use crate::mode::{ResponseModeSelector, TurnResult};
use crate::rag::RagEnricher;
use crate::streaming::StreamingResponseProcessor;
use crate::types::{MessageId, MessageUpdate, UpdateCallback};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

pub type UpdateObserver = Arc<dyn Fn(&MessageUpdate) -> anyhow::Result<()> + Send + Sync>;

/// How a call to [`ChatSession::send_user_message`] ended
#[derive(Debug)]
pub enum TurnOutcome {
    /// Blank input, nothing was sent
    Ignored,
    Completed { id: MessageId, result: TurnResult },
    Failed { id: MessageId, error: ChatError },
}

/// One conversation with the chat backend
pub struct ChatSession {
    backend: Arc<dyn ChatBackend>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    rag: Option<RagEnricher>,
    conversation: Conversation,
    user_email: String,
    loading: Arc<AtomicBool>,
    observer: Option<UpdateObserver>,
}

/// Clears the loading flag however the turn ends
struct LoadingGuard(Arc<AtomicBool>);

impl LoadingGuard {
    fn new(flag: Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ChatSession {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        user_email: String,
    ) -> Self {
        Self {
            backend,
            synthesizer,
            rag: None,
            conversation: Conversation::new(),
            user_email,
            loading: Arc::new(AtomicBool::new(false)),
            observer: None,
        }
    }

    pub fn with_rag(mut self, rag: RagEnricher) -> Self {
        self.rag = Some(rag);
        self
    }

    /// Get notified of every AI message update, after the conversation
    /// has been updated
    pub fn with_observer(mut self, observer: UpdateObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Run one user turn. Errors are logged and returned in the outcome;
    /// messages already added to the conversation stay in place.
    pub async fn send_user_message(
        &self,
        message: &str,
        config: &ResponseConfig,
        cancel: CancellationToken,
    ) -> TurnOutcome {
        if message.trim().is_empty() {
            return TurnOutcome::Ignored;
        }

        let _loading = LoadingGuard::new(self.loading.clone());
        self.conversation.push_user(message);
        let ai_id = MessageId::new();

        match self.run_turn(message, config, &ai_id, cancel).await {
            Ok(result) => {
                debug!("Turn {} completed with {} chars", ai_id, result.text().len());
                TurnOutcome::Completed { id: ai_id, result }
            }
            Err(error) => {
                error!("Chat turn failed: {}", error);
                TurnOutcome::Failed { id: ai_id, error }
            }
        }
    }

    async fn run_turn(
        &self,
        message: &str,
        config: &ResponseConfig,
        ai_id: &MessageId,
        cancel: CancellationToken,
    ) -> Result<TurnResult> {
        let prompt = match (&self.rag, config.is_rag_enabled) {
            (Some(rag), true) => rag.enhance(message, &self.user_email, config.top_k).await?,
            (None, true) => {
                warn!("RAG is enabled but no retrieval services are configured");
                message.to_string()
            }
            (_, false) => message.to_string(),
        };

        let response = self
            .backend
            .send(&prompt, &self.user_email, config.is_assistant_enabled)
            .await?;

        let processor = StreamingResponseProcessor::new(config.clone(), self.synthesizer.clone())
            .with_cancellation(cancel);
        let on_update = self.update_callback();
        ResponseModeSelector::new(&processor)
            .dispatch(response, config.is_assistant_enabled, ai_id, &on_update)
            .await
    }

    fn update_callback(&self) -> UpdateCallback {
        let conversation = self.conversation.clone();
        let observer = self.observer.clone();
        Box::new(move |update: &MessageUpdate| {
            conversation.upsert_ai(&update.id, &update.text);
            match &observer {
                Some(observer) => observer(update),
                None => Ok(()),
            }
        })
    }
}
