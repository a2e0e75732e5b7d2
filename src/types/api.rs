use serde::{Deserialize, Serialize};

/// One message as sent to the completion endpoint. Only `role` and `content`
/// cross the wire; local fields like message ids and reasoning text never do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    pub role: String,
    pub content: String,
}

/// One parsed `data:` payload from the streaming response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: Option<ChunkDelta>,
}

/// Incremental fields of a choice. Both channels are optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
}

/// One normalized increment of assistant output. Absent wire fields become
/// empty strings so downstream concatenation never deals with null.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    pub content: String,
    pub reasoning: String,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.reasoning.is_empty()
    }
}

impl From<ChunkDelta> for Delta {
    fn from(delta: ChunkDelta) -> Self {
        Self {
            content: delta.content.unwrap_or_default(),
            reasoning: delta.reasoning_content.unwrap_or_default(),
        }
    }
}

impl ChatChunk {
    /// The first choice's incremental fields, normalized. A chunk without
    /// choices or without a delta yields an empty (no-op) delta.
    pub fn first_choice_delta(&self) -> Delta {
        self.choices
            .first()
            .and_then(|choice| choice.delta.clone())
            .map(Delta::from)
            .unwrap_or_default()
    }
}
