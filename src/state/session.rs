use super::message::Message;
use crate::util::unix_timestamp_ms;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SESSION_TITLE: &str = "New chat";
const TITLE_MAX_CHARS: usize = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    /// Optional per-session system prompt, combined with the global one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub created_at: u64,
}

impl ChatSession {
    fn new() -> Self {
        static SEQUENCE: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
        let seq = SEQUENCE.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Self {
            id: format!("session-{}-{}", unix_timestamp_ms(), seq),
            title: DEFAULT_SESSION_TITLE.to_string(),
            messages: Vec::new(),
            system_prompt: None,
            created_at: unix_timestamp_ms(),
        }
    }
}

/// In-memory session list. Newest sessions sit at the front; exactly one is
/// active once any exists.
#[derive(Default)]
pub struct SessionList {
    sessions: Vec<ChatSession>,
    active: Option<usize>,
}

impl SessionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn active(&self) -> Option<&ChatSession> {
        self.active.and_then(|idx| self.sessions.get(idx))
    }

    pub fn active_mut(&mut self) -> Option<&mut ChatSession> {
        self.active.and_then(|idx| self.sessions.get_mut(idx))
    }

    /// Create a fresh session at the front of the list and make it active.
    pub fn start_session(&mut self) -> &mut ChatSession {
        self.sessions.insert(0, ChatSession::new());
        self.active = Some(0);
        &mut self.sessions[0]
    }

    /// The active session, creating one implicitly on first use.
    pub fn ensure_active(&mut self) -> &mut ChatSession {
        if self.active().is_none() {
            self.start_session();
        }
        self.active_mut().expect("active session exists after ensure")
    }

    /// Cycle to the next session in the list, wrapping around.
    pub fn cycle_active(&mut self) {
        if self.sessions.is_empty() {
            return;
        }
        let next = match self.active {
            Some(idx) => (idx + 1) % self.sessions.len(),
            None => 0,
        };
        self.active = Some(next);
    }

    /// Derive the active session's title from its first user message once it
    /// has one; never overwrite a title that already diverged.
    pub fn refresh_active_title(&mut self) {
        if let Some(session) = self.active_mut() {
            if session.title != DEFAULT_SESSION_TITLE {
                return;
            }
            if let Some(first) = session.messages.first() {
                if !first.content.is_empty() {
                    session.title = first.content.chars().take(TITLE_MAX_CHARS).collect();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_active_creates_one_session() {
        let mut list = SessionList::new();
        assert!(list.is_empty());
        list.ensure_active();
        assert_eq!(list.len(), 1);
        list.ensure_active();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_title_derives_from_first_user_message() {
        let mut list = SessionList::new();
        let session = list.ensure_active();
        session
            .messages
            .push(Message::user("Explain the borrow checker to me in detail".to_string()));
        list.refresh_active_title();
        let title = &list.active().unwrap().title;
        assert_eq!(title.chars().count(), 30);
        assert!(title.starts_with("Explain the borrow checker"));
    }

    #[test]
    fn test_title_not_overwritten_once_set() {
        let mut list = SessionList::new();
        let session = list.ensure_active();
        session.messages.push(Message::user("first".to_string()));
        list.refresh_active_title();
        list.active_mut().unwrap().messages[0].content = "changed".to_string();
        list.refresh_active_title();
        assert_eq!(list.active().unwrap().title, "first");
    }

    #[test]
    fn test_new_sessions_go_to_front_and_cycle_wraps() {
        let mut list = SessionList::new();
        list.start_session();
        list.active_mut().unwrap().title = "older".to_string();
        list.start_session();
        list.active_mut().unwrap().title = "newer".to_string();

        assert_eq!(list.active().unwrap().title, "newer");
        list.cycle_active();
        assert_eq!(list.active().unwrap().title, "older");
        list.cycle_active();
        assert_eq!(list.active().unwrap().title, "newer");
    }
}
