//! Line-oriented user input.
//!
//! Frontends hand the [`crate::App`] whole lines; commands start with `/`.

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// Free text: a display name or a guess, depending on the screen.
    Text(String),
    /// `/quit`
    Quit,
    /// `/reset`: delete the game and start over.
    Reset,
    /// `/refresh`: re-read the game from the server.
    Refresh,
    /// `/help`
    Help,
    /// A `/command` nobody knows.
    Unknown(String),
}

impl UserInput {
    /// Interpret a line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let Some(command) = line.strip_prefix('/') else {
            return Some(Self::Text(line.to_string()));
        };

        Some(match command.to_ascii_lowercase().as_str() {
            "quit" | "q" | "exit" => Self::Quit,
            "reset" => Self::Reset,
            "refresh" | "r" => Self::Refresh,
            "help" | "h" | "?" => Self::Help,
            _ => Self::Unknown(line.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_case_insensitive() {
        assert_eq!(UserInput::parse("/QUIT"), Some(UserInput::Quit));
        assert_eq!(UserInput::parse("  /refresh "), Some(UserInput::Refresh));
    }

    #[test]
    fn text_is_trimmed() {
        assert_eq!(UserInput::parse("  e \n"), Some(UserInput::Text("e".into())));
        assert_eq!(UserInput::parse("   "), None);
    }

    #[test]
    fn unknown_command_is_kept_verbatim() {
        assert_eq!(UserInput::parse("/dance"), Some(UserInput::Unknown("/dance".into())));
    }
}
