//! Input line
//!
//! The title tells what Enter will do with the line.

use gallows_app::{App, Mode};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
};

use crate::InputState;

const PROMPT: &str = "> ";

/// Title and text colour for the current screen.
fn title(app: &App) -> (&'static str, Color) {
    match app.mode() {
        Mode::NamePrompt => (" Name ", Color::White),
        Mode::InGame if app.input_locked() => (" Guess (waiting) ", Color::DarkGray),
        Mode::InGame => (" Guess ", Color::White),
        Mode::Connecting => (" Command ", Color::DarkGray),
    }
}

/// Render the input line and place the terminal cursor in it.
pub fn render(frame: &mut Frame, app: &App, input: &InputState, area: Rect) {
    let (title, color) = title(app);
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);

    let line = format!("{PROMPT}{}", input.buffer());
    frame.render_widget(Paragraph::new(line).style(Style::default().fg(color)).block(block), area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }
    let column = (PROMPT.len() as u16).saturating_add(input.cursor() as u16);
    let x = inner.x + column.min(inner.width - 1);
    frame.set_cursor_position((x, inner.y));
}
