use super::*;
use crate::api::mock_client::{MockApiClient, MockResponse};
use crate::api::ApiClient;
use crate::state::message::{Role, FAILURE_NOTICE};
use crate::types::Delta;
use std::sync::Arc;
use tokio::sync::mpsc;

fn mock_client(responses: Vec<MockResponse>) -> Arc<ApiClient> {
    Arc::new(ApiClient::new_mock(Arc::new(MockApiClient::new(responses))))
}

fn content_line(text: &str) -> String {
    format!("data: {{\"choices\":[{{\"delta\":{{\"content\":\"{text}\"}}}}]}}\n")
}

fn reasoning_line(text: &str) -> String {
    format!("data: {{\"choices\":[{{\"delta\":{{\"reasoning_content\":\"{text}\"}}}}]}}\n")
}

fn done_line() -> String {
    "data: [DONE]\n".to_string()
}

/// Drive one turn to completion and apply every update it produced.
async fn run_turn(
    manager: &mut ConversationManager,
    client: Arc<ApiClient>,
    request: TurnRequest,
) {
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    drive_turn(client, request, update_tx).await;
    while let Ok(update) = update_rx.try_recv() {
        manager.apply_update(update);
    }
}

#[test]
fn test_begin_turn_pushes_user_message_and_draft() {
    let mut manager = ConversationManager::new();
    let request = manager.begin_turn("hello".to_string(), "glm-4-flash", None);

    let messages = manager.active_messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "hello");
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "");
    assert!(manager.is_streaming());

    // The wire history carries the user message but never the empty draft.
    assert_eq!(request.messages.len(), 1);
    assert_eq!(request.messages[0].role, "user");
    assert_eq!(request.model, "glm-4-flash");
}

#[test]
fn test_begin_turn_prepends_combined_system_prompt() {
    let mut manager = ConversationManager::new();
    manager.sessions_mut().ensure_active().system_prompt = Some("Be terse.".to_string());
    let request = manager.begin_turn("hi".to_string(), "glm-4.5", Some("Be helpful."));

    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[0].role, "system");
    assert_eq!(request.messages[0].content, "Be helpful.\n\nBe terse.");
    assert_eq!(request.messages[1].role, "user");
}

#[tokio::test]
async fn test_turn_accumulates_content_and_reasoning_across_fragments() {
    // One event line split across chunk boundaries, plus both channels.
    let line_one = reasoning_line("thinking ");
    let (left, right) = line_one.split_at(25);
    let client = mock_client(vec![MockResponse::from_chunks(vec![
        left.to_string(),
        format!("{right}{}", reasoning_line("done.")),
        content_line("Hello"),
        content_line(" world"),
        done_line(),
    ])]);

    let mut manager = ConversationManager::new();
    let request = manager.begin_turn("hi".to_string(), "glm-4.5", None);
    run_turn(&mut manager, client, request).await;

    let messages = manager.active_messages();
    let reply = messages.last().unwrap();
    assert_eq!(reply.content, "Hello world");
    assert_eq!(reply.reasoning.as_deref(), Some("thinking done."));
    assert!(!manager.is_streaming());
    assert!(manager.last_error().is_none());
}

#[tokio::test]
async fn test_lines_after_sentinel_are_never_merged() {
    let client = mock_client(vec![MockResponse::from_chunks(vec![
        content_line("kept"),
        done_line(),
        content_line("dropped"),
    ])]);

    let mut manager = ConversationManager::new();
    let request = manager.begin_turn("hi".to_string(), "glm-4-flash", None);
    run_turn(&mut manager, client, request).await;

    assert_eq!(manager.active_messages().last().unwrap().content, "kept");
}

#[tokio::test]
async fn test_malformed_line_is_skipped_mid_stream() {
    let client = mock_client(vec![MockResponse::from_chunks(vec![
        "data: {bad json\n".to_string(),
        content_line("hi"),
        done_line(),
    ])]);

    let mut manager = ConversationManager::new();
    let request = manager.begin_turn("hi".to_string(), "glm-4-flash", None);
    run_turn(&mut manager, client, request).await;

    assert_eq!(manager.active_messages().last().unwrap().content, "hi");
    assert!(manager.last_error().is_none());
}

#[tokio::test]
async fn test_transport_failure_retains_partial_and_appends_notice() {
    let client = mock_client(vec![MockResponse::with_trailing_error(
        vec![content_line("partial answer")],
        "connection reset",
    )]);

    let mut manager = ConversationManager::new();
    let request = manager.begin_turn("hi".to_string(), "glm-4-flash", None);
    run_turn(&mut manager, client, request).await;

    let reply = manager.active_messages().last().unwrap().clone();
    assert!(reply.content.starts_with("partial answer"));
    assert!(reply.content.ends_with(FAILURE_NOTICE));
    assert!(!manager.is_streaming());
    assert!(manager.last_error().unwrap().contains("connection reset"));
}

#[tokio::test]
async fn test_request_failure_before_streaming_annotates_empty_draft() {
    // No responses configured: create_stream fails before any bytes flow.
    let client = mock_client(vec![]);

    let mut manager = ConversationManager::new();
    let request = manager.begin_turn("hi".to_string(), "glm-4-flash", None);
    run_turn(&mut manager, client, request).await;

    let reply = manager.active_messages().last().unwrap();
    assert_eq!(reply.content, FAILURE_NOTICE);
    assert!(manager.last_error().is_some());
}

#[tokio::test]
async fn test_stream_end_without_sentinel_completes_normally() {
    let client = mock_client(vec![MockResponse::from_chunks(vec![content_line(
        "truncated",
    )])]);

    let mut manager = ConversationManager::new();
    let request = manager.begin_turn("hi".to_string(), "glm-4-flash", None);
    run_turn(&mut manager, client, request).await;

    assert_eq!(
        manager.active_messages().last().unwrap().content,
        "truncated"
    );
    assert!(!manager.is_streaming());
    assert!(manager.last_error().is_none());
}

#[test]
fn test_superseded_generation_updates_are_dropped() {
    let mut manager = ConversationManager::new();
    let first = manager.begin_turn("first".to_string(), "glm-4-flash", None);
    let stale_generation = first.generation;

    // A new turn supersedes the first; its token is revoked immediately.
    let _second = manager.begin_turn("second".to_string(), "glm-4-flash", None);
    assert!(first.cancel.is_cancelled());

    let applied = manager.apply_update(StreamUpdate {
        generation: stale_generation,
        event: TurnEvent::Delta(Delta {
            content: "ghost".to_string(),
            reasoning: String::new(),
        }),
    });
    assert!(!applied);
    assert_eq!(manager.active_messages().last().unwrap().content, "");
    assert!(manager.is_streaming());
}

#[tokio::test]
async fn test_cancelled_turn_emits_nothing() {
    let client = mock_client(vec![MockResponse::from_chunks(vec![
        content_line("never seen"),
        done_line(),
    ])]);

    let mut manager = ConversationManager::new();
    let request = manager.begin_turn("hi".to_string(), "glm-4-flash", None);
    manager.cancel_active_turn();

    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    drive_turn(client, request, update_tx).await;
    assert!(update_rx.try_recv().is_err());

    assert!(!manager.is_streaming());
    assert_eq!(manager.active_messages().last().unwrap().content, "");
}

#[test]
fn test_cancel_freezes_partial_output() {
    let mut manager = ConversationManager::new();
    let request = manager.begin_turn("hi".to_string(), "glm-4-flash", None);
    let generation = request.generation;

    manager.apply_update(StreamUpdate {
        generation,
        event: TurnEvent::Delta(Delta {
            content: "partial".to_string(),
            reasoning: String::new(),
        }),
    });
    manager.cancel_active_turn();

    // Anything already queued from the cancelled stream arrives too late.
    let applied = manager.apply_update(StreamUpdate {
        generation,
        event: TurnEvent::Delta(Delta {
            content: " more".to_string(),
            reasoning: String::new(),
        }),
    });
    assert!(!applied);
    assert_eq!(manager.active_messages().last().unwrap().content, "partial");
}
