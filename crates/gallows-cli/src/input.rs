//! Input state and key handling for the TUI.
//!
//! This module owns all text input state (buffer, cursor) and handles
//! character-level key events. On Enter the line is handed to
//! [`UserInput::parse`], which tells commands from names and guesses.

use gallows_app::UserInput;

/// Key input events from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Character input.
    Char(char),
    /// Enter/Return key.
    Enter,
    /// Backspace key.
    Backspace,
    /// Delete key.
    Delete,
    /// Escape key.
    Esc,
    /// Ctrl+C.
    Interrupt,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Home key.
    Home,
    /// End key.
    End,
}

/// What a key press amounts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The line changed; redraw it.
    Edited,
    /// A complete line for the application.
    Submit(UserInput),
    /// Nothing to do.
    Ignored,
}

/// Input state for the TUI.
///
/// Manages the text input buffer and cursor position. The cursor counts
/// characters, not bytes.
#[derive(Debug, Default)]
pub struct InputState {
    buffer: String,
    cursor: usize,
}

impl InputState {
    /// Create a new empty input state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text in the input buffer.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Current cursor position, in characters.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Handle a key input event.
    pub fn handle_key(&mut self, key: KeyInput) -> KeyOutcome {
        match key {
            KeyInput::Char(c) => {
                let at = self.byte_offset(self.cursor);
                self.buffer.insert(at, c);
                self.cursor = self.cursor.saturating_add(1);
            },
            KeyInput::Backspace => {
                if self.cursor == 0 {
                    return KeyOutcome::Ignored;
                }
                self.cursor = self.cursor.saturating_sub(1);
                let at = self.byte_offset(self.cursor);
                self.buffer.remove(at);
            },
            KeyInput::Delete => {
                if self.cursor >= self.len() {
                    return KeyOutcome::Ignored;
                }
                let at = self.byte_offset(self.cursor);
                self.buffer.remove(at);
            },
            KeyInput::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyInput::Right => self.cursor = self.cursor.saturating_add(1).min(self.len()),
            KeyInput::Home => self.cursor = 0,
            KeyInput::End => self.cursor = self.len(),
            KeyInput::Enter => return self.handle_enter(),
            KeyInput::Esc | KeyInput::Interrupt => return KeyOutcome::Submit(UserInput::Quit),
        }
        KeyOutcome::Edited
    }

    /// Take the line. Blank lines only clear the buffer.
    fn handle_enter(&mut self) -> KeyOutcome {
        let line = std::mem::take(&mut self.buffer);
        self.cursor = 0;

        match UserInput::parse(&line) {
            Some(input) => KeyOutcome::Submit(input),
            None => KeyOutcome::Edited,
        }
    }

    fn len(&self) -> usize {
        self.buffer.chars().count()
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.buffer.char_indices().nth(chars).map_or(self.buffer.len(), |(at, _)| at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> InputState {
        let mut input = InputState::new();
        for c in text.chars() {
            input.handle_key(KeyInput::Char(c));
        }
        input
    }

    #[test]
    fn char_input_adds_to_buffer() {
        let input = typed("hi");

        assert_eq!(input.buffer(), "hi");
        assert_eq!(input.cursor(), 2);
    }

    #[test]
    fn backspace_removes_char() {
        let mut input = typed("ab");

        assert_eq!(input.handle_key(KeyInput::Backspace), KeyOutcome::Edited);

        assert_eq!(input.buffer(), "a");
        assert_eq!(input.cursor(), 1);
    }

    #[test]
    fn backspace_at_start_is_ignored() {
        let mut input = typed("a");
        input.handle_key(KeyInput::Home);

        assert_eq!(input.handle_key(KeyInput::Backspace), KeyOutcome::Ignored);
        assert_eq!(input.buffer(), "a");
    }

    #[test]
    fn enter_submits_and_clears_buffer() {
        let mut input = typed("/refresh");

        assert_eq!(input.handle_key(KeyInput::Enter), KeyOutcome::Submit(UserInput::Refresh));
        assert!(input.buffer().is_empty());
        assert_eq!(input.cursor(), 0);
    }

    #[test]
    fn blank_enter_only_clears() {
        let mut input = typed("   ");
        assert_eq!(input.handle_key(KeyInput::Enter), KeyOutcome::Edited);
        assert!(input.buffer().is_empty());
    }

    #[test]
    fn escape_and_interrupt_quit() {
        let mut input = typed("half a na");
        assert_eq!(input.handle_key(KeyInput::Esc), KeyOutcome::Submit(UserInput::Quit));
        assert_eq!(input.handle_key(KeyInput::Interrupt), KeyOutcome::Submit(UserInput::Quit));
    }

    #[test]
    fn cursor_movement() {
        let mut input = typed("abc");

        input.handle_key(KeyInput::Home);
        assert_eq!(input.cursor(), 0);

        input.handle_key(KeyInput::End);
        assert_eq!(input.cursor(), 3);

        input.handle_key(KeyInput::Left);
        assert_eq!(input.cursor(), 2);

        input.handle_key(KeyInput::Right);
        input.handle_key(KeyInput::Right);
        assert_eq!(input.cursor(), 3);
    }

    #[test]
    fn editing_in_the_middle_of_multibyte_text() {
        let mut input = typed("zoë");
        input.handle_key(KeyInput::Left);
        input.handle_key(KeyInput::Char('é'));
        assert_eq!(input.buffer(), "zoéë");

        input.handle_key(KeyInput::Delete);
        assert_eq!(input.buffer(), "zoé");
        assert_eq!(input.cursor(), 3);
    }
}
