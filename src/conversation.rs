use crate::types::{Message, MessageId};
use std::sync::{Arc, Mutex};

/// Message list of one chat session, shared between the session and
/// whatever renders it. AI replies are upserted by id.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user message and return its id
    pub fn push_user(&self, text: &str) -> MessageId {
        let message = Message::user(text);
        let id = message.id.clone();
        self.messages.lock().unwrap().push(message);
        id
    }

    /// Replace the AI message with this id, or add it if it is new. The
    /// updated message moves to the end of the list.
    pub fn upsert_ai(&self, id: &MessageId, text: &str) {
        let mut messages = self.messages.lock().unwrap();
        messages.retain(|message| &message.id != id);
        messages.push(Message::ai(id.clone(), text));
    }

    pub fn get(&self, id: &MessageId) -> Option<Message> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .find(|message| &message.id == id)
            .cloned()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
