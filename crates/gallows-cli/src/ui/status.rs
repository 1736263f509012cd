//! Status bar
//!
//! Displays the screen we are on and the latest status message.

use gallows_app::{App, Mode};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

/// Render the status bar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let screen = match app.mode() {
        Mode::Connecting => Span::styled("Connecting", Style::default().fg(Color::Yellow)),
        Mode::NamePrompt => Span::styled("Register", Style::default().fg(Color::Cyan)),
        Mode::InGame if app.view().is_some_and(|view| view.live) => Span::styled(
            "Live",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        Mode::InGame => Span::styled("Offline", Style::default().fg(Color::Red)),
    };

    let message = app.status_message().map_or_else(String::new, |message| format!(" | {message}"));

    let status_line = Line::from(vec![Span::raw(" "), screen, Span::raw(message)]);

    let paragraph =
        Paragraph::new(status_line).style(Style::default().bg(Color::DarkGray).fg(Color::White));

    frame.render_widget(paragraph, area);
}
