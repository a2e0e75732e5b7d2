use crate::api::ApiClient;
use crate::config::Config;
use crate::state::conversation::{drive_turn, ConversationManager, StreamUpdate};
use crate::state::DEFAULT_SESSION_TITLE;
use crate::terminal::{self, TerminalType};
use crate::ui::input::InputState;
use crate::ui::layout::split_panes;
use crate::ui::render::{
    render_header, render_input, render_status_line, render_transcript, transcript_lines,
};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const TICK_INTERVAL: Duration = Duration::from_millis(33);
const PAGE_SCROLL_LINES: usize = 10;

pub struct App {
    config: Config,
    client: Arc<ApiClient>,
    conversation: ConversationManager,
    update_tx: mpsc::UnboundedSender<StreamUpdate>,
    update_rx: mpsc::UnboundedReceiver<StreamUpdate>,
    input: InputState,
    scroll: usize,
    auto_follow: bool,
    thinking_enabled: bool,
    pending_quit: bool,
    quit_requested: bool,
    status: Option<String>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let client = Arc::new(ApiClient::new(&config)?);
        Ok(Self::with_client(config, client))
    }

    #[cfg(test)]
    pub fn new_mock(config: Config, client: Arc<ApiClient>) -> Self {
        Self::with_client(config, client)
    }

    fn with_client(config: Config, client: Arc<ApiClient>) -> Self {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        Self {
            config,
            client,
            conversation: ConversationManager::new(),
            update_tx,
            update_rx,
            input: InputState::new(),
            scroll: 0,
            auto_follow: true,
            thinking_enabled: false,
            pending_quit: false,
            quit_requested: false,
            status: None,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut term = terminal::setup()?;
        let result = self.event_loop(&mut term).await;
        terminal::restore()?;
        result
    }

    async fn event_loop(&mut self, term: &mut TerminalType) -> Result<()> {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        while !self.quit_requested {
            self.draw(term)?;
            tokio::select! {
                Some(update) = self.update_rx.recv() => {
                    self.on_update(update);
                    while let Ok(queued) = self.update_rx.try_recv() {
                        self.on_update(queued);
                    }
                }
                _ = ticker.tick() => {
                    while event::poll(Duration::ZERO)? {
                        if let Event::Key(key) = event::read()? {
                            if key.kind != KeyEventKind::Release {
                                self.on_key(key);
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn draw(&mut self, term: &mut TerminalType) -> Result<()> {
        let lines = transcript_lines(
            self.conversation.active_messages(),
            self.conversation.is_streaming(),
        );
        let title = self
            .conversation
            .active_title()
            .unwrap_or(DEFAULT_SESSION_TITLE)
            .to_string();
        let model = self.current_model().to_string();
        let thinking = self.thinking_enabled;
        let session_count = self.conversation.session_count().max(1);
        let status = self.status_text();

        let input = &self.input;
        let scroll = &mut self.scroll;
        let auto_follow = self.auto_follow;
        term.draw(|frame| {
            let panes = split_panes(frame.area(), 1);
            let max_scroll = lines.len().saturating_sub(panes.transcript.height as usize);
            if auto_follow {
                *scroll = max_scroll;
            } else {
                *scroll = (*scroll).min(max_scroll);
            }
            render_header(frame, panes.header, &title, &model, thinking, session_count);
            render_transcript(frame, panes.transcript, lines, *scroll);
            render_input(frame, panes.input, input);
            render_status_line(frame, panes.status, &status);
        })?;
        Ok(())
    }

    fn current_model(&self) -> &str {
        if self.thinking_enabled {
            &self.config.thinking_model
        } else {
            &self.config.model
        }
    }

    fn status_text(&self) -> String {
        if let Some(status) = &self.status {
            return status.clone();
        }
        if self.conversation.is_streaming() {
            return "streaming... Ctrl+C cancel".to_string();
        }
        "Enter send · Ctrl+T thinking · Ctrl+N new chat · Ctrl+P sessions · Ctrl+C quit".to_string()
    }

    fn on_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if !(ctrl && key.code == KeyCode::Char('c')) {
            self.pending_quit = false;
        }
        match key.code {
            KeyCode::Char('c') if ctrl => self.on_interrupt(),
            KeyCode::Char('t') if ctrl => {
                self.thinking_enabled = !self.thinking_enabled;
                self.status = None;
            }
            KeyCode::Char('n') if ctrl => {
                self.conversation.start_new_session();
                self.auto_follow = true;
                self.status = None;
            }
            KeyCode::Char('p') if ctrl => {
                self.conversation.cycle_session();
                self.auto_follow = true;
                self.status = None;
            }
            KeyCode::Enter => self.submit_input(),
            KeyCode::Backspace => self.input.backspace(),
            KeyCode::Left => self.input.move_left(),
            KeyCode::Right => self.input.move_right(),
            KeyCode::Home => self.input.move_home(),
            KeyCode::End => self.input.move_end(),
            KeyCode::Up => self.scroll_by(-1),
            KeyCode::Down => self.scroll_by(1),
            KeyCode::PageUp => self.scroll_by(-(PAGE_SCROLL_LINES as isize)),
            KeyCode::PageDown => self.scroll_by(PAGE_SCROLL_LINES as isize),
            KeyCode::Char(ch) if !ctrl => self.input.insert_char(ch),
            _ => {}
        }
    }

    fn scroll_by(&mut self, delta: isize) {
        if delta < 0 {
            self.auto_follow = false;
            self.scroll = self.scroll.saturating_sub(delta.unsigned_abs());
        } else {
            // Scrolling down re-engages follow once the bottom is reached;
            // the draw pass clamps to the real maximum.
            self.scroll = self.scroll.saturating_add(delta as usize);
            self.auto_follow = true;
        }
    }

    fn submit_input(&mut self) {
        if self.conversation.is_streaming() {
            self.status = Some("busy - reply still streaming (Ctrl+C to cancel)".to_string());
            return;
        }
        let content = self.input.buffer().trim().to_string();
        if content.is_empty() {
            return;
        }
        self.input.take();
        self.status = None;
        self.auto_follow = true;

        let model = self.current_model().to_string();
        let request =
            self.conversation
                .begin_turn(content, &model, self.config.system_prompt.as_deref());
        tokio::spawn(drive_turn(
            Arc::clone(&self.client),
            request,
            self.update_tx.clone(),
        ));
    }

    fn on_update(&mut self, update: StreamUpdate) {
        if self.conversation.apply_update(update) {
            if let Some(error) = self.conversation.last_error() {
                self.status = Some(format!("[error] {error}"));
            } else if !self.conversation.is_streaming() {
                self.status = None;
            }
        }
    }

    fn on_interrupt(&mut self) {
        if self.conversation.is_streaming() {
            self.conversation.cancel_active_turn();
            self.status = Some("turn cancelled".to_string());
            self.pending_quit = false;
            return;
        }
        if self.pending_quit {
            self.quit_requested = true;
        } else {
            self.pending_quit = true;
            self.status = Some("press Ctrl+C again to exit".to_string());
        }
    }
}
