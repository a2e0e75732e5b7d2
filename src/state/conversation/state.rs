use super::super::message::{Message, Role};
use super::super::session::SessionList;
use crate::types::{ApiMessage, Delta};
use tokio_util::sync::CancellationToken;

/// One update from a streaming turn, tagged with the generation of the turn
/// that produced it. Updates from a superseded generation are dropped.
#[derive(Debug)]
pub struct StreamUpdate {
    pub generation: u64,
    pub event: TurnEvent,
}

#[derive(Debug)]
pub enum TurnEvent {
    Delta(Delta),
    Completed,
    Failed { error: String },
}

/// Everything the turn driver needs, captured at submit time.
pub struct TurnRequest {
    pub generation: u64,
    pub model: String,
    pub messages: Vec<ApiMessage>,
    pub cancel: CancellationToken,
}

/// Owns the session list and the lifecycle of the single in-flight stream.
/// All merging of deltas into the draft message happens here, guarded by the
/// generation counter, so a superseded stream can never touch the current
/// message.
pub struct ConversationManager {
    sessions: SessionList,
    generation: u64,
    active_cancel: Option<CancellationToken>,
    streaming: bool,
    last_error: Option<String>,
}

impl ConversationManager {
    pub fn new() -> Self {
        Self {
            sessions: SessionList::new(),
            generation: 0,
            active_cancel: None,
            streaming: false,
            last_error: None,
        }
    }

    /// Start a turn: cancel any stream still in flight, push the user
    /// message and an empty assistant draft, and capture the sanitized wire
    /// history (system prompt first, draft excluded).
    pub fn begin_turn(
        &mut self,
        content: String,
        model: &str,
        global_system_prompt: Option<&str>,
    ) -> TurnRequest {
        if let Some(cancel) = self.active_cancel.take() {
            cancel.cancel();
        }
        self.generation += 1;
        self.last_error = None;

        let session = self.sessions.ensure_active();
        session.messages.push(Message::user(content));

        let mut messages = Vec::with_capacity(session.messages.len() + 1);
        if let Some(prompt) =
            combine_system_prompts(global_system_prompt, session.system_prompt.as_deref())
        {
            messages.push(ApiMessage {
                role: Role::System.as_str().to_string(),
                content: prompt,
            });
        }
        messages.extend(session.messages.iter().map(ApiMessage::from));

        session.messages.push(Message::assistant_draft());
        self.sessions.refresh_active_title();

        let cancel = CancellationToken::new();
        self.active_cancel = Some(cancel.clone());
        self.streaming = true;

        TurnRequest {
            generation: self.generation,
            model: model.to_string(),
            messages,
            cancel,
        }
    }

    /// Apply one stream update. Returns true when it changed visible state;
    /// stale-generation updates return false and are otherwise ignored.
    pub fn apply_update(&mut self, update: StreamUpdate) -> bool {
        if update.generation != self.generation {
            return false;
        }
        match update.event {
            TurnEvent::Delta(delta) => match self.draft_mut() {
                Some(draft) => {
                    draft.apply_delta(&delta);
                    true
                }
                None => false,
            },
            TurnEvent::Completed => {
                self.streaming = false;
                self.active_cancel = None;
                true
            }
            TurnEvent::Failed { error } => {
                if let Some(draft) = self.draft_mut() {
                    draft.append_failure_notice();
                }
                self.last_error = Some(error);
                self.streaming = false;
                self.active_cancel = None;
                true
            }
        }
    }

    /// Stop consuming the in-flight stream and freeze the partial draft.
    /// The generation bump revokes anything already queued for delivery.
    pub fn cancel_active_turn(&mut self) {
        if let Some(cancel) = self.active_cancel.take() {
            cancel.cancel();
            self.generation += 1;
            self.streaming = false;
        }
    }

    pub fn start_new_session(&mut self) {
        self.cancel_active_turn();
        self.sessions.start_session();
    }

    pub fn cycle_session(&mut self) {
        self.cancel_active_turn();
        self.sessions.cycle_active();
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn active_title(&self) -> Option<&str> {
        self.sessions.active().map(|s| s.title.as_str())
    }

    pub fn active_messages(&self) -> &[Message] {
        self.sessions
            .active()
            .map(|s| s.messages.as_slice())
            .unwrap_or(&[])
    }

    #[cfg(test)]
    pub fn sessions_mut(&mut self) -> &mut SessionList {
        &mut self.sessions
    }

    fn draft_mut(&mut self) -> Option<&mut Message> {
        if !self.streaming {
            return None;
        }
        self.sessions
            .active_mut()
            .and_then(|session| session.messages.last_mut())
            .filter(|message| message.role == Role::Assistant)
    }
}

impl Default for ConversationManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Global and per-session prompts, joined by a blank line when both exist.
fn combine_system_prompts(global: Option<&str>, session: Option<&str>) -> Option<String> {
    let mut combined = String::new();
    for prompt in [global, session].into_iter().flatten() {
        if prompt.trim().is_empty() {
            continue;
        }
        if !combined.is_empty() {
            combined.push_str("\n\n");
        }
        combined.push_str(prompt);
    }
    if combined.is_empty() {
        None
    } else {
        Some(combined)
    }
}
