//! Server-side session status.

use std::{fmt, str::FromStr};

use crate::errors::ProtocolError;

/// What the server knows about a session token.
///
/// This is the single value that decides whether a client starts fresh or
/// resumes, and which recovery branch it takes when resuming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Token is unknown, expired, or absent.
    Unregistered,
    /// Registered as first player, no opponent yet.
    WaitingForOpponent,
    /// Both players joined, game running.
    InProgress,
    /// Word was solved.
    Won,
    /// Lives ran out.
    Lost,
}

impl SessionStatus {
    /// Text body used on the wire.
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Unregistered => "false",
            Self::WaitingForOpponent => "registered",
            Self::InProgress => "playing",
            Self::Won => "win",
            Self::Lost => "lost",
        }
    }
}

impl FromStr for SessionStatus {
    type Err = ProtocolError;

    fn from_str(body: &str) -> Result<Self, Self::Err> {
        match body.trim().trim_matches('"') {
            "false" => Ok(Self::Unregistered),
            "registered" => Ok(Self::WaitingForOpponent),
            "playing" => Ok(Self::InProgress),
            "win" => Ok(Self::Won),
            "lost" => Ok(Self::Lost),
            other => Err(ProtocolError::UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}
