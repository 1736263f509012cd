//! Identity types shared by client and server.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;

/// Game identifier assigned at registration. Scopes the push channel.
pub type GameId = u64;

/// Position of a player in the turn order.
///
/// The first player is assigned immediately at registration and waits for an
/// opponent; the second player's registration starts the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TurnPosition {
    /// Position `0`, moves first.
    First,
    /// Position `1`.
    Second,
}

impl TurnPosition {
    /// The opposing position.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }

    /// Numeric wire value.
    pub fn index(self) -> u8 {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }
}

impl TryFrom<u8> for TurnPosition {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::First),
            1 => Ok(Self::Second),
            other => Err(ProtocolError::InvalidTurnPosition(other)),
        }
    }
}

impl From<TurnPosition> for u8 {
    fn from(position: TurnPosition) -> Self {
        position.index()
    }
}

impl fmt::Display for TurnPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Opaque session token binding a client to a server-side player.
///
/// Persisted across reloads. The server may expire it at any time; a status
/// query answering `unregistered` invalidates it.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a raw token. Empty tokens are rejected.
    pub fn new(value: impl Into<String>) -> Result<Self, ProtocolError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ProtocolError::EmptyToken);
        }
        Ok(Self(value))
    }

    /// Raw token text, as sent to the server.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionToken {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SessionToken> for String {
    fn from(token: SessionToken) -> Self {
        token.0
    }
}

// Tokens are credentials; keep them out of logs.
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(4).collect();
        write!(f, "SessionToken({prefix}…)")
    }
}
