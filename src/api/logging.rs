use serde_json::Value;
use std::fs::OpenOptions;
use std::io::{IsTerminal, Write};

const DEFAULT_API_LOG_PATH: &str = "/tmp/glint-debug.log";
const DEBUG_PAYLOAD_ENV: &str = "GLINT_DEBUG_PAYLOAD";
const API_LOG_PATH_ENV: &str = "GLINT_API_LOG_PATH";

pub fn debug_payload_enabled() -> bool {
    std::env::var(DEBUG_PAYLOAD_ENV)
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

pub fn emit_debug_payload(request_url: &str, payload: &Value) {
    let formatted_payload = serde_json::to_string_pretty(payload)
        .unwrap_or_else(|_| "<payload serialization error>".to_string());
    let message =
        format!("GLINT_API DEBUG payload_request url={request_url}\npayload:\n{formatted_payload}\n");
    emit_log_message(&message);
}

/// A `data:` payload failed structured parsing. Non-fatal; the stream
/// continues with the next line.
pub fn emit_decode_error(payload: &str, parse_error: &serde_json::Error) {
    let message =
        format!("GLINT_API ERROR event_decode_failed error={parse_error}\ndata:\n{payload}\n");
    emit_log_message(&message);
}

/// The transport closed before the `[DONE]` sentinel. The turn completes
/// normally; this only records that truncation happened.
pub fn emit_premature_end() {
    emit_log_message("GLINT_API WARN stream_closed_before_done_sentinel\n");
}

fn emit_log_message(message: &str) {
    if let Some(path) = resolve_log_path() {
        if append_log_file(&path, message).is_ok() {
            return;
        }
    }

    eprintln!("{message}");
}

fn resolve_log_path() -> Option<String> {
    std::env::var(API_LOG_PATH_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            if std::io::stderr().is_terminal() {
                Some(DEFAULT_API_LOG_PATH.to_string())
            } else {
                None
            }
        })
}

fn append_log_file(path: &str, message: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(message.as_bytes())
}
