use crate::api::logging::emit_decode_error;
use crate::types::{ChatChunk, Delta};

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// Buffers text fragments as they arrive off the transport and yields
/// complete newline-terminated lines. Fragment boundaries never align with
/// line boundaries, so the unterminated tail is carried into the next push.
#[derive(Default)]
pub struct LineFramer {
    carry: String,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one fragment and drain every complete line it closes.
    pub fn push(&mut self, fragment: &str) -> Vec<String> {
        self.carry.push_str(fragment);
        let mut lines = Vec::new();
        while let Some(pos) = self.carry.find('\n') {
            let line = self.carry[..pos].to_string();
            self.carry.drain(..=pos);
            lines.push(line);
        }
        lines
    }

    /// The unterminated tail. Discarded with the framer at end of stream; a
    /// partial line never encodes a complete event.
    pub fn carry(&self) -> &str {
        &self.carry
    }
}

/// One decoded unit of the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem {
    /// An increment of content and/or reasoning text.
    Delta(Delta),
    /// The `[DONE]` sentinel: the stream ended normally.
    Done,
}

/// Classify one complete line.
///
/// Blank lines and lines without the `data: ` prefix carry no event. A
/// malformed JSON payload is dropped with a file-log diagnostic so the
/// stream keeps going. A payload without incremental fields decodes to an
/// empty delta, which merges as a no-op.
pub fn decode_data_line(line: &str) -> Option<StreamItem> {
    let payload = line.trim().strip_prefix(DATA_PREFIX)?;
    if payload == DONE_SENTINEL {
        return Some(StreamItem::Done);
    }
    match serde_json::from_str::<ChatChunk>(payload) {
        Ok(chunk) => Some(StreamItem::Delta(chunk.first_choice_delta())),
        Err(error) => {
            emit_decode_error(payload, &error);
            None
        }
    }
}

/// Framer + decoder for one response stream. Feed raw transport chunks in
/// arrival order; deltas come back in the same order. After the sentinel no
/// further lines are decoded, whatever else arrives.
#[derive(Default)]
pub struct StreamParser {
    framer: LineFramer,
    done: bool,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, chunk: &[u8]) -> Vec<StreamItem> {
        if self.done {
            return Vec::new();
        }
        let text = String::from_utf8_lossy(chunk);
        let mut items = Vec::new();
        for line in self.framer.push(&text) {
            match decode_data_line(&line) {
                Some(StreamItem::Done) => {
                    self.done = true;
                    items.push(StreamItem::Done);
                    break;
                }
                Some(item) => items.push(item),
                None => {}
            }
        }
        items
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}
