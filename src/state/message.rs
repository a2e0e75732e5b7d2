use crate::types::{ApiMessage, Delta};
use crate::util::unix_timestamp_ms;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Appended to a message's content when its stream fails. Whatever was
/// merged before the failure stays in place above the notice.
pub const FAILURE_NOTICE: &str =
    "\n\n**Error:** failed to generate a response. Check your connection and try again.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Reasoning-channel text; assistant messages only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub timestamp: u64,
}

impl Message {
    pub fn user(content: String) -> Self {
        Self {
            id: next_message_id(),
            role: Role::User,
            content,
            reasoning: None,
            timestamp: unix_timestamp_ms(),
        }
    }

    /// An empty assistant draft, ready to accumulate stream deltas.
    pub fn assistant_draft() -> Self {
        Self {
            id: next_message_id(),
            role: Role::Assistant,
            content: String::new(),
            reasoning: Some(String::new()),
            timestamp: unix_timestamp_ms(),
        }
    }

    /// Fold one delta into this message. Append-only on both channels;
    /// callers must apply deltas in arrival order.
    pub fn apply_delta(&mut self, delta: &Delta) {
        self.content.push_str(&delta.content);
        if !delta.reasoning.is_empty() || self.reasoning.is_some() {
            self.reasoning
                .get_or_insert_with(String::new)
                .push_str(&delta.reasoning);
        }
    }

    pub fn append_failure_notice(&mut self) {
        self.content.push_str(FAILURE_NOTICE);
    }

    pub fn has_reasoning(&self) -> bool {
        self.reasoning.as_deref().is_some_and(|r| !r.trim().is_empty())
    }
}

impl From<&Message> for ApiMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
        }
    }
}

fn next_message_id() -> String {
    static SEQUENCE: AtomicU64 = AtomicU64::new(0);
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("msg-{}-{}", unix_timestamp_ms(), seq)
}
