use serde::{Deserialize, Serialize};

/// A single chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: String,
    pub text: String,
    /// Milliseconds since the Unix epoch; also the sort key within a conversation
    pub timestamp: i64,
}

impl Message {
    pub fn new(sender: impl Into<String>, text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
            timestamp,
        }
    }

    /// Create a message stamped with the current wall clock time
    pub fn now(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(sender, text, now_millis())
    }
}

/// A message together with the conversation it belongs to, as handed to a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub conversation_id: String,
    pub message: Message,
}

impl StoredMessage {
    pub fn new(conversation_id: impl Into<String>, message: Message) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            message,
        }
    }
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
