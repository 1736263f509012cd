//! UI rendering
//!
//! Rendering functions that convert App state into terminal output using
//! ratatui widgets. All functions are pure (no I/O), taking state and
//! returning widget trees.

mod board;
mod input;
mod status;

pub use board::{board_lines, gallows};
use gallows_app::{App, Mode};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::InputState;

/// Render the entire UI.
pub fn render(frame: &mut Frame, app: &App, input: &InputState) {
    const MAIN_AREA_MIN_HEIGHT: u16 = 3;
    const INPUT_HEIGHT: u16 = 3;
    const STATUS_HEIGHT: u16 = 1;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(MAIN_AREA_MIN_HEIGHT),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(frame.area());

    let [main_area, input_area, status_area] = chunks.as_ref() else {
        return;
    };

    match (app.mode(), app.view()) {
        (Mode::InGame, Some(view)) => board::render(frame, view, *main_area),
        (mode, _) => render_lobby(frame, mode, *main_area),
    }
    input::render(frame, app, input, *input_area);
    status::render(frame, app, *status_area);
}

/// Render the screen shown outside a game.
fn render_lobby(frame: &mut Frame, mode: Mode, area: Rect) {
    let text = match mode {
        Mode::NamePrompt => "Enter a display name to join a game.\n\nType /help for commands.",
        Mode::Connecting | Mode::InGame => "Connecting...",
    };
    let block = Block::default().borders(Borders::ALL).title(" Gallows ");
    let paragraph = Paragraph::new(text)
        .style(Style::default().fg(Color::Gray))
        .wrap(Wrap { trim: true })
        .block(block);

    frame.render_widget(paragraph, area);
}
