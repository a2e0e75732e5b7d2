use super::inline::{render_inline, Inline};

/// One structural unit of rendered text. Produced fresh on every render
/// pass; a pure projection of the text, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, spans: Vec<Inline> },
    Paragraph { spans: Vec<Inline> },
    ListItem {
        ordered: bool,
        index: Option<u64>,
        spans: Vec<Inline>,
    },
    Rule,
    Spacer,
    CodeBlock {
        language: Option<String>,
        text: String,
    },
}

/// Project accumulated text into an ordered block sequence.
///
/// Fully-delimited code fences are carved out first so nothing inside them
/// is line-classified; an unclosed fence is ordinary text with literal
/// backticks. Remaining text is classified line by line, one block per
/// line, with no multi-line merging.
pub fn render_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    if text.is_empty() {
        return blocks;
    }

    for segment in split_fenced_segments(text) {
        match segment {
            Segment::Code(raw) => blocks.push(parse_code_fence(raw)),
            Segment::Text(span) => {
                for line in span.split('\n') {
                    blocks.push(classify_line(line));
                }
            }
        }
    }
    blocks
}

enum Segment<'a> {
    Text(&'a str),
    Code(&'a str),
}

/// Carve the text into alternating plain and fenced-code segments. Only a
/// fence with both its opening and closing triple-backtick counts as code.
/// The single newline that separates a fence from surrounding prose belongs
/// to the fence, not the prose, so it produces no spacer.
fn split_fenced_segments(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = text;
    let mut after_code = false;

    while let Some(open) = rest.find("```") {
        let Some(close) = rest[open + 3..].find("```") else {
            break;
        };
        let end = open + 3 + close + 3;

        push_text_segment(&mut segments, &rest[..open], after_code, true);
        segments.push(Segment::Code(&rest[open..end]));
        rest = &rest[end..];
        after_code = true;
    }

    push_text_segment(&mut segments, rest, after_code, false);
    segments
}

fn push_text_segment<'a>(
    segments: &mut Vec<Segment<'a>>,
    mut span: &'a str,
    after_code: bool,
    before_code: bool,
) {
    if after_code {
        span = span.strip_prefix('\n').unwrap_or(span);
    }
    if before_code {
        span = span.strip_suffix('\n').unwrap_or(span);
    }
    if !span.is_empty() {
        segments.push(Segment::Text(span));
    }
}

fn parse_code_fence(raw: &str) -> Block {
    let inner = &raw[3..raw.len() - 3];
    if let Some(newline) = inner.find('\n') {
        let tag = &inner[..newline];
        if tag.chars().all(|c| c.is_alphanumeric() || c == '_') {
            let body = inner[newline + 1..]
                .strip_suffix('\n')
                .unwrap_or(&inner[newline + 1..]);
            return Block::CodeBlock {
                language: (!tag.is_empty()).then(|| tag.to_string()),
                text: body.to_string(),
            };
        }
    }
    // No language line; the whole interior is code as written.
    Block::CodeBlock {
        language: None,
        text: inner.to_string(),
    }
}

/// Ordered classifiers, first match wins:
/// rule, heading 1-3, unordered item, ordered item, blank, paragraph.
fn classify_line(line: &str) -> Block {
    if line == "---" || line == "***" {
        return Block::Rule;
    }
    if let Some(block) = match_heading(line) {
        return block;
    }
    if let Some(block) = match_unordered_item(line) {
        return block;
    }
    if let Some(block) = match_ordered_item(line) {
        return block;
    }
    if line.trim().is_empty() {
        return Block::Spacer;
    }
    Block::Paragraph {
        spans: render_inline(line),
    }
}

/// `#`/`##`/`###` need at least one space and non-empty content after the
/// marker; a bare marker falls through and renders literally.
fn match_heading(line: &str) -> Option<Block> {
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    if !(1..=3).contains(&hashes) {
        return None;
    }
    let rest = &line[hashes..];
    let content = rest.trim_start();
    if content.len() == rest.len() || content.is_empty() {
        return None;
    }
    Some(Block::Heading {
        level: hashes as u8,
        spans: render_inline(content),
    })
}

fn match_unordered_item(line: &str) -> Option<Block> {
    let content = line
        .strip_prefix("* ")
        .or_else(|| line.strip_prefix("- "))?;
    Some(Block::ListItem {
        ordered: false,
        index: None,
        spans: render_inline(content),
    })
}

fn match_ordered_item(line: &str) -> Option<Block> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let content = line[digits..].strip_prefix(". ")?;
    let index = line[..digits].parse::<u64>().ok()?;
    Some(Block::ListItem {
        ordered: true,
        index: Some(index),
        spans: render_inline(content),
    })
}
