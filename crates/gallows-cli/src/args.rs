//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use gallows_client::{ClientConfig, PushPlayerSemantics};
use url::Url;

/// Gallows terminal client
#[derive(Parser, Debug, Clone)]
#[command(name = "gallows")]
#[command(about = "Two-player hangman in the terminal")]
#[command(version)]
pub struct Args {
    /// Game server root URL
    #[arg(short, long, default_value = "http://127.0.0.1:8000/")]
    pub server: Url,

    /// File the session token is kept in between runs
    #[arg(long, default_value = "gallows-session.cbor")]
    pub token_file: PathBuf,

    /// Register under this name instead of prompting for one
    #[arg(short, long)]
    pub name: Option<String>,

    /// Whom the `player` field of letter events names
    #[arg(long, value_enum, default_value_t = PushPlayer::Next)]
    pub push_player: PushPlayer,

    /// Log filter used when `RUST_LOG` is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log file. The terminal itself belongs to the UI.
    #[arg(long, default_value = "gallows.log")]
    pub log_file: PathBuf,
}

/// `--push-player` values.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushPlayer {
    /// The player who just guessed
    Acting,
    /// The player who moves next
    Next,
}

impl From<PushPlayer> for PushPlayerSemantics {
    fn from(value: PushPlayer) -> Self {
        match value {
            PushPlayer::Acting => Self::ActingPlayer,
            PushPlayer::Next => Self::NextPlayer,
        }
    }
}

impl Args {
    /// Client configuration selected by the flags.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig { push_player: self.push_player.into() }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["gallows"]).unwrap();

        assert_eq!(args.server.as_str(), "http://127.0.0.1:8000/");
        assert_eq!(args.token_file, PathBuf::from("gallows-session.cbor"));
        assert_eq!(args.name, None);
        assert_eq!(args.client_config().push_player, PushPlayerSemantics::NextPlayer);
    }

    #[test]
    fn push_player_flag_selects_semantics() {
        let args = Args::try_parse_from([
            "gallows",
            "--server",
            "https://hangman.example/api/",
            "--name",
            "ada",
            "--push-player",
            "acting",
        ])
        .unwrap();

        assert_eq!(args.server.path(), "/api/");
        assert_eq!(args.name.as_deref(), Some("ada"));
        assert_eq!(args.client_config().push_player, PushPlayerSemantics::ActingPlayer);
        assert!(Args::try_parse_from(["gallows", "--push-player", "both"]).is_err());
    }

    #[test]
    fn malformed_server_url_is_refused() {
        assert!(Args::try_parse_from(["gallows", "--server", "not a url"]).is_err());
    }
}
