//! The interactive shell.
//!
//! Runs a synchronous event loop on the main thread while the pipeline tasks
//! stream answers in the background. Typed lines stand in for finalized
//! transcripts; a real speech-to-text transport would feed the same channel.

use std::io::Stdout;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseEventKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc::UnboundedSender;

use crate::core::events::AnswerEvent;
use crate::core::generation::GenerationCounter;
use crate::core::lock;
use crate::core::queue::EventQueue;
use crate::ui::consumer::SharedDisplayLog;
use crate::ui::{terminal, view};

/// Target frame cadence for streaming updates (~60fps).
const FRAME_DURATION: Duration = Duration::from_millis(16);

/// Lines scrolled per mouse wheel notch.
const WHEEL_SCROLL_LINES: usize = 3;

/// Owns the terminal and the input line; reads the shared display log.
pub struct TuiShell {
    log: SharedDisplayLog,
    transcripts: UnboundedSender<String>,
    queue: Arc<EventQueue>,
    generations: Arc<GenerationCounter>,
    input: String,
    last_revision: u64,
}

impl TuiShell {
    pub fn new(
        log: SharedDisplayLog,
        transcripts: UnboundedSender<String>,
        queue: Arc<EventQueue>,
        generations: Arc<GenerationCounter>,
    ) -> Self {
        Self {
            log,
            transcripts,
            queue,
            generations,
            input: String::new(),
            last_revision: 0,
        }
    }

    /// Runs the shell until the user quits. Terminal state is restored on
    /// exit, panic, and Ctrl+C.
    pub fn run(mut self) -> Result<()> {
        terminal::install_panic_hook();
        let mut terminal = terminal::setup_terminal()?;
        terminal::enable_mouse_capture()?;

        let result = self.event_loop(&mut terminal);

        let _ = terminal::restore_terminal();
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut dirty = true;
        let mut viewport_height = 20usize;

        loop {
            if event::poll(FRAME_DURATION)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if key.modifiers.contains(KeyModifiers::CONTROL) {
                            match key.code {
                                KeyCode::Char('c') => return Ok(()),
                                KeyCode::Char('l') => {
                                    self.queue.push(AnswerEvent::ClearAll {
                                        generation: self.generations.current(),
                                    });
                                }
                                _ => {}
                            }
                        } else {
                            match key.code {
                                KeyCode::Enter => self.submit_input(),
                                KeyCode::Backspace => {
                                    self.input.pop();
                                }
                                KeyCode::Up => lock(&self.log).scroll.scroll_up(1, viewport_height),
                                KeyCode::Down => {
                                    lock(&self.log).scroll.scroll_down(1, viewport_height);
                                }
                                KeyCode::PageUp => lock(&self.log).scroll.page_up(viewport_height),
                                KeyCode::PageDown => {
                                    lock(&self.log).scroll.page_down(viewport_height);
                                }
                                KeyCode::Home => lock(&self.log).scroll.scroll_to_top(),
                                KeyCode::End => lock(&self.log).scroll.scroll_to_bottom(),
                                KeyCode::Char(c) => self.input.push(c),
                                _ => {}
                            }
                        }
                        dirty = true;
                    }
                    Event::Mouse(mouse) => {
                        match mouse.kind {
                            MouseEventKind::ScrollUp => {
                                lock(&self.log)
                                    .scroll
                                    .scroll_up(WHEEL_SCROLL_LINES, viewport_height);
                                dirty = true;
                            }
                            MouseEventKind::ScrollDown => {
                                lock(&self.log)
                                    .scroll
                                    .scroll_down(WHEEL_SCROLL_LINES, viewport_height);
                                dirty = true;
                            }
                            _ => {}
                        }
                    }
                    Event::Resize(..) => dirty = true,
                    _ => {}
                }
            }

            // The consumer mutates the log from its own task; redraw when its
            // revision moves.
            let revision = lock(&self.log).revision();
            if revision != self.last_revision {
                self.last_revision = revision;
                dirty = true;
            }

            if dirty {
                terminal.draw(|frame| {
                    viewport_height = frame.area().height.saturating_sub(2).max(1) as usize;
                    let mut log = lock(&self.log);
                    view::draw(frame, &mut log, &self.input);
                })?;
                dirty = false;
            }
        }
    }

    /// Sends the typed line as a finalized transcript. The controller applies
    /// the minimum-length noise filter, not the shell.
    fn submit_input(&mut self) {
        let text = std::mem::take(&mut self.input);
        if !text.trim().is_empty() {
            let _ = self.transcripts.send(text);
        }
    }
}
