//! Terminal driver for the TUI.
//!
//! Implements the [`Driver`] trait for terminal I/O using crossterm for
//! keyboard events and ratatui for rendering. Network I/O is not the
//! driver's business; the runtime owns the transport.

use std::io::{self, Stdout, stdout};

use crossterm::{
    ExecutableCommand,
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use gallows_app::{App, Driver, UserInput};
use ratatui::{Terminal, backend::CrosstermBackend};
use thiserror::Error;

use crate::{InputState, KeyInput, KeyOutcome, ui};

/// Terminal driver errors.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// I/O error from terminal operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Terminal driver implementing the [`Driver`] trait.
///
/// Handles terminal I/O (crossterm) and rendering (ratatui). Owns the input
/// state for line editing and the last rendered app, so that edits and
/// resizes can be redrawn without a round trip through the runtime.
pub struct TerminalDriver {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    event_stream: EventStream,
    input_state: InputState,
    app: App,
}

impl TerminalDriver {
    /// Switch the terminal to raw mode on the alternate screen.
    pub fn new() -> Result<Self, TerminalError> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            event_stream: EventStream::new(),
            input_state: InputState::new(),
            app: App::new(),
        })
    }

    /// Convert a crossterm key event to `KeyInput`.
    fn convert_key(key: KeyEvent) -> Option<KeyInput> {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(KeyInput::Interrupt)
            },
            KeyCode::Char(c) => Some(KeyInput::Char(c)),
            KeyCode::Enter => Some(KeyInput::Enter),
            KeyCode::Backspace => Some(KeyInput::Backspace),
            KeyCode::Delete => Some(KeyInput::Delete),
            KeyCode::Esc => Some(KeyInput::Esc),
            KeyCode::Left => Some(KeyInput::Left),
            KeyCode::Right => Some(KeyInput::Right),
            KeyCode::Home => Some(KeyInput::Home),
            KeyCode::End => Some(KeyInput::End),
            _ => None,
        }
    }

    fn draw(&mut self) -> Result<(), TerminalError> {
        let Self { terminal, input_state, app, .. } = self;
        terminal.draw(|frame| ui::render(frame, app, input_state))?;
        Ok(())
    }
}

impl Driver for TerminalDriver {
    type Error = TerminalError;

    /// Edit the line in place until Enter. The buffer survives cancellation.
    async fn poll_input(&mut self) -> Result<Option<UserInput>, Self::Error> {
        loop {
            match self.event_stream.next().await {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    let Some(key) = Self::convert_key(key) else {
                        continue;
                    };
                    match self.input_state.handle_key(key) {
                        KeyOutcome::Submit(input) => return Ok(Some(input)),
                        KeyOutcome::Edited => self.draw()?,
                        KeyOutcome::Ignored => {},
                    }
                },
                Some(Ok(Event::Resize(..))) => self.draw()?,
                Some(Ok(_)) => {},
                Some(Err(e)) => return Err(TerminalError::Io(e)),
                None => return Ok(None),
            }
        }
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        self.app = app.clone();
        self.draw()
    }

    fn stop(&mut self) {
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}

impl Drop for TerminalDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn ctrl_c_interrupts() {
        let converted = TerminalDriver::convert_key(key(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(converted, Some(KeyInput::Interrupt));
    }

    #[test]
    fn plain_c_is_a_letter() {
        let converted = TerminalDriver::convert_key(key(KeyCode::Char('c'), KeyModifiers::NONE));
        assert_eq!(converted, Some(KeyInput::Char('c')));
    }

    #[test]
    fn function_keys_are_ignored() {
        assert_eq!(TerminalDriver::convert_key(key(KeyCode::F(1), KeyModifiers::NONE)), None);
    }
}
