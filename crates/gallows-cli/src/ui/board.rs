//! Game board
//!
//! The gallows drawing next to the word, lives, letters and turn.

use gallows_app::GameView;
use gallows_client::{Phase, TurnPosition};
use gallows_proto::MAX_LIVES;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

const GALLOWS_WIDTH: u16 = 11;
const LABEL_WIDTH: usize = 10;

/// Render the board for `view`.
pub fn render(frame: &mut Frame, view: &GameView, area: Rect) {
    let seat = match view.turn_position {
        TurnPosition::First => "first player",
        TurnPosition::Second => "second player",
    };
    let block =
        Block::default().borders(Borders::ALL).title(format!(" Game {}, {seat} ", view.game_id));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(GALLOWS_WIDTH), Constraint::Min(0)])
        .split(inner);

    let [art_area, text_area] = chunks.as_ref() else {
        return;
    };

    let misses = view.lives_remaining.map_or(0, |lives| MAX_LIVES.saturating_sub(lives));
    let art: Vec<Line> = gallows(misses).into_iter().map(Line::from).collect();
    frame.render_widget(Paragraph::new(art).style(Style::default().fg(Color::Red)), *art_area);
    frame.render_widget(Paragraph::new(board_lines(view)), *text_area);
}

/// The text half of the board.
pub fn board_lines(view: &GameView) -> Vec<Line<'static>> {
    let lives =
        view.lives_remaining.map_or_else(|| "?".to_string(), |n| format!("{n} / {MAX_LIVES}"));
    let letters = if view.guessed_letters.is_empty() {
        "none yet".to_string()
    } else {
        view.guessed_letters.iter().map(char::to_string).collect::<Vec<_>>().join(" ")
    };
    let turn = match view.phase {
        None => "-",
        Some(Phase::AwaitingOpponent) => "waiting for an opponent",
        Some(Phase::InProgress) if view.our_turn() => "yours",
        Some(Phase::InProgress) if view.turn_owner.is_some() => "opponent's",
        Some(Phase::InProgress) => "-",
        Some(Phase::Won | Phase::Lost) => "game over",
    };
    let updates = match (view.live, view.is_over()) {
        (true, _) => "live",
        (false, true) => "closed",
        (false, false) => "offline, use /refresh",
    };

    let word = Span::styled(view.word_mask.clone(), Style::default().add_modifier(Modifier::BOLD));
    let mut lines = vec![
        field("Word", word),
        field("Lives", Span::raw(lives)),
        field("Guessed", Span::raw(letters)),
        field("Turn", Span::raw(turn)),
        field("Opponent", Span::raw(view.teammate.clone().unwrap_or_else(|| "?".to_string()))),
        field("Updates", Span::raw(updates)),
    ];

    let result = match (view.phase, &view.revealed_word) {
        (Some(Phase::Won), Some(word)) => {
            Some((format!("solved, the word was {word}"), Color::Green))
        },
        (Some(Phase::Lost), Some(word)) => {
            Some((format!("out of lives, the word was {word}"), Color::Red))
        },
        (Some(Phase::Won), None) => Some(("solved".to_string(), Color::Green)),
        (Some(Phase::Lost), None) => Some(("out of lives".to_string(), Color::Red)),
        _ => None,
    };
    if let Some((text, color)) = result {
        lines.push(field("Result", Span::styled(text, Style::default().fg(color))));
    }
    lines
}

fn field(label: &str, value: Span<'static>) -> Line<'static> {
    let label = format!("{:<LABEL_WIDTH$}", format!("{label}:"));
    Line::from(vec![Span::styled(label, Style::default().fg(Color::DarkGray)), value])
}

/// Gallows drawing after `misses` wrong guesses, one part per miss.
pub fn gallows(misses: u32) -> Vec<String> {
    // (row, column, glyph, misses needed)
    const PARTS: &[(usize, usize, char, u32)] = &[
        (6, 0, '=', 1),
        (6, 1, '=', 1),
        (6, 2, '=', 1),
        (6, 3, '=', 1),
        (6, 4, '=', 1),
        (6, 5, '=', 1),
        (6, 6, '=', 1),
        (6, 7, '=', 1),
        (6, 8, '=', 1),
        (1, 6, '|', 2),
        (2, 6, '|', 2),
        (3, 6, '|', 2),
        (4, 6, '|', 2),
        (5, 6, '|', 2),
        (0, 2, '+', 3),
        (0, 3, '-', 3),
        (0, 4, '-', 3),
        (0, 5, '-', 3),
        (0, 6, '+', 3),
        (1, 2, '|', 4),
        (2, 2, 'O', 5),
        (3, 2, '|', 6),
        (3, 1, '/', 7),
        (3, 3, '\\', 8),
        (4, 1, '/', 9),
        (4, 3, '\\', 10),
    ];

    let mut grid = vec![vec![' '; 9]; 7];
    for &(row, column, glyph, needed) in PARTS {
        if misses >= needed {
            grid[row][column] = glyph;
        }
    }
    grid.into_iter().map(|row| row.into_iter().collect::<String>().trim_end().to_string()).collect()
}
