use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable key of a message across repeated updates of the same reply
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    /// Marker shown in front of this sender's messages
    pub fn prefix(self) -> &'static str {
        match self {
            Sender::User => "🧑‍💻 ",
            Sender::Ai => "🤖 ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender: Sender,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            sender: Sender::User,
            text: text.into(),
        }
    }

    pub fn ai(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            sender: Sender::Ai,
            text: text.into(),
        }
    }

    /// Text as shown in the transcript, prefixed with the sender marker
    pub fn display_text(&self) -> String {
        format!("{}{}", self.sender.prefix(), self.text)
    }
}

/// Update event for the in-progress AI reply. Carries the full text so far,
/// replacing whatever was shown for the same id before.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageUpdate {
    pub id: MessageId,
    pub text: String,
}

pub type UpdateCallback = Box<dyn Fn(&MessageUpdate) -> anyhow::Result<()> + Send + Sync>;
