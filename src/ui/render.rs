use crate::markdown::{render_blocks, Block, Inline};
use crate::state::{Message, Role};
use crate::ui::input::{char_display_width, truncate_to_display_width, InputState};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

const RULE_WIDTH: usize = 42;
const CODE_GUTTER: &str = "│ ";

fn heading_style(level: u8) -> Style {
    match level {
        1 => Style::default()
            .fg(Color::LightCyan)
            .add_modifier(Modifier::BOLD),
        2 => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
        _ => Style::default().fg(Color::Cyan),
    }
}

fn inline_spans(spans: &[Inline], base: Style) -> Vec<Span<'static>> {
    spans
        .iter()
        .map(|span| match span {
            Inline::Text(text) => Span::styled(text.clone(), base),
            Inline::Bold(text) => Span::styled(
                text.clone(),
                base.fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            Inline::Code(text) => Span::styled(
                text.clone(),
                Style::default().fg(Color::Yellow).bg(Color::Rgb(45, 45, 45)),
            ),
        })
        .collect()
}

/// Map one structural block onto styled terminal lines. All visual choices
/// live here; the block itself only carries classification.
pub fn block_lines(block: &Block) -> Vec<Line<'static>> {
    let dim = Style::default().fg(Color::DarkGray);
    match block {
        Block::Heading { level, spans } => {
            vec![Line::from(inline_spans(spans, heading_style(*level)))]
        }
        Block::Paragraph { spans } => {
            vec![Line::from(inline_spans(spans, Style::default().fg(Color::Gray)))]
        }
        Block::ListItem {
            ordered,
            index,
            spans,
        } => {
            let marker = if *ordered {
                format!("{}. ", index.unwrap_or(1))
            } else {
                "• ".to_string()
            };
            let mut line = vec![Span::styled(marker, Style::default().fg(Color::Cyan))];
            line.extend(inline_spans(spans, Style::default().fg(Color::Gray)));
            vec![Line::from(line)]
        }
        Block::Rule => vec![Line::from(Span::styled("─".repeat(RULE_WIDTH), dim))],
        Block::Spacer => vec![Line::default()],
        Block::CodeBlock { language, text } => {
            let header = match language {
                Some(lang) => format!("┌── {lang}"),
                None => "┌──".to_string(),
            };
            let mut lines = vec![Line::from(Span::styled(header, dim))];
            for code_line in text.split('\n') {
                lines.push(Line::from(vec![
                    Span::styled(CODE_GUTTER, dim),
                    Span::styled(
                        code_line.to_string(),
                        Style::default().fg(Color::White).add_modifier(Modifier::DIM),
                    ),
                ]));
            }
            lines.push(Line::from(Span::styled("└──", dim)));
            lines
        }
    }
}

/// Full transcript as terminal lines: user prompts verbatim, assistant
/// reasoning dimmed above the rendered answer blocks.
pub fn transcript_lines(messages: &[Message], streaming: bool) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (idx, message) in messages.iter().enumerate() {
        if idx > 0 {
            lines.push(Line::default());
        }
        let is_last = idx + 1 == messages.len();
        match message.role {
            Role::User => {
                for text_line in message.content.lines() {
                    lines.push(Line::from(vec![
                        Span::styled("> ", Style::default().fg(Color::DarkGray)),
                        Span::styled(text_line.to_string(), Style::default().fg(Color::Gray)),
                    ]));
                }
            }
            Role::Assistant | Role::System => {
                if message.has_reasoning() {
                    let reasoning_style = Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC);
                    lines.push(Line::from(Span::styled("· thinking", reasoning_style)));
                    for text_line in message.reasoning.as_deref().unwrap_or("").lines() {
                        lines.push(Line::from(Span::styled(
                            text_line.to_string(),
                            reasoning_style,
                        )));
                    }
                    if !message.content.is_empty() {
                        lines.push(Line::default());
                    }
                }
                if message.content.is_empty() {
                    if streaming && is_last {
                        lines.push(Line::from(Span::styled(
                            "…",
                            Style::default().fg(Color::DarkGray),
                        )));
                    }
                } else {
                    for block in render_blocks(&message.content) {
                        lines.extend(block_lines(&block));
                    }
                }
            }
        }
    }
    lines
}

pub fn render_header(
    frame: &mut Frame<'_>,
    area: Rect,
    title: &str,
    model: &str,
    thinking: bool,
    session_count: usize,
) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let thinking_label = if thinking { " · thinking" } else { "" };
    let text = truncate_line(
        &format!("glint · {model}{thinking_label} · {title} [{session_count}]"),
        area.width as usize,
    );
    frame.render_widget(
        Paragraph::new(text).style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        area,
    );
}

pub fn render_transcript(frame: &mut Frame<'_>, area: Rect, lines: Vec<Line<'static>>, scroll: usize) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll as u16, 0));
    frame.render_widget(paragraph, area);
}

pub fn render_input(frame: &mut Frame<'_>, area: Rect, input: &InputState) {
    if area.height == 0 || area.width <= 2 {
        return;
    }
    let width = area.width.saturating_sub(2) as usize;
    let cursor_col = input.cursor_col();
    let window_start = cursor_col.saturating_sub(width.saturating_sub(1));
    let visible = truncate_to_display_width(skip_display_cols(input.buffer(), window_start), width);

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::DarkGray)),
            Span::styled(visible, Style::default().fg(Color::White)),
        ])),
        area,
    );

    let cursor_x = area
        .x
        .saturating_add(2 + (cursor_col - window_start) as u16)
        .min(area.x.saturating_add(area.width.saturating_sub(1)));
    frame.set_cursor_position((cursor_x, area.y));
}

pub fn render_status_line(frame: &mut Frame<'_>, area: Rect, status: &str) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let text = truncate_line(status, area.width as usize);
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

fn skip_display_cols(text: &str, cols: usize) -> &str {
    if cols == 0 {
        return text;
    }
    let mut skipped = 0usize;
    for (idx, ch) in text.char_indices() {
        if skipped >= cols {
            return &text[idx..];
        }
        skipped += char_display_width(ch);
    }
    ""
}

fn truncate_line(input: &str, width: usize) -> String {
    let width = width.max(1);
    let truncated = truncate_to_display_width(input, width);
    if truncated.len() < input.len() && width >= 4 {
        let mut out = truncate_to_display_width(input, width - 3);
        out.push_str("...");
        out
    } else {
        truncated
    }
}
