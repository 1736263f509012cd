//! Push events delivered over the per-game channel.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    errors::{ProtocolError, Result},
    ids::{GameId, TurnPosition},
};

/// Kind of game event announced on the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushKind {
    /// Second player joined; the game is running.
    GameStart,
    /// A player guessed a letter present in the word.
    LetterCorrect,
    /// A player guessed a letter absent from the word.
    LetterFalse,
    /// The word was completed.
    Solved,
    /// Lives ran out.
    Lost,
    /// A player deleted the game.
    GameDeleted,
}

impl PushKind {
    /// Event name used on the wire.
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::GameStart => "game_start",
            Self::LetterCorrect => "letter_correct",
            Self::LetterFalse => "letter_false",
            Self::Solved => "solved",
            Self::Lost => "lost",
            Self::GameDeleted => "game_deleted",
        }
    }

    /// Parse a wire event name.
    pub fn from_wire(name: &str) -> Result<Self> {
        match name {
            "game_start" => Ok(Self::GameStart),
            "letter_correct" => Ok(Self::LetterCorrect),
            "letter_false" => Ok(Self::LetterFalse),
            "solved" => Ok(Self::Solved),
            "lost" => Ok(Self::Lost),
            "game_deleted" => Ok(Self::GameDeleted),
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }

    /// Letter events carry a player position.
    pub fn is_letter(self) -> bool {
        matches!(self, Self::LetterCorrect | Self::LetterFalse)
    }

    /// Events after which the game can no longer be played.
    pub fn ends_game(self) -> bool {
        matches!(self, Self::Solved | Self::Lost | Self::GameDeleted)
    }
}

impl fmt::Display for PushKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// JSON shape of a push message.
#[derive(Debug, Serialize, Deserialize)]
struct RawEvent {
    #[serde(default)]
    player: i64,
    game_id: GameId,
    data: String,
}

/// A decoded push event.
///
/// `player` is only meaningful for letter events. Whether it names the player
/// who acted or the player who moves next is a deployment detail that the
/// client resolves, not the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushEvent {
    /// What happened.
    pub kind: PushKind,
    /// Game the event belongs to.
    pub game_id: GameId,
    /// Player position attached to letter events.
    pub player: Option<TurnPosition>,
}

impl PushEvent {
    /// Event without a player attribution.
    pub fn new(kind: PushKind, game_id: GameId) -> Self {
        Self { kind, game_id, player: None }
    }

    /// Letter event attributed to `player`.
    pub fn letter(kind: PushKind, game_id: GameId, player: TurnPosition) -> Self {
        Self { kind, game_id, player: Some(player) }
    }

    /// Decode one `data:` payload.
    pub fn from_json(body: &str) -> Result<Self> {
        let raw: RawEvent = serde_json::from_str(body)
            .map_err(|e| ProtocolError::MalformedEvent(e.to_string()))?;
        let kind = PushKind::from_wire(&raw.data)?;

        let player = if kind.is_letter() {
            let index = u8::try_from(raw.player)
                .map_err(|_| ProtocolError::malformed("event player", raw.player.to_string()))?;
            Some(TurnPosition::try_from(index)?)
        } else {
            None
        };

        Ok(Self { kind, game_id: raw.game_id, player })
    }

    /// Encode as a `data:` payload.
    pub fn to_json(&self) -> String {
        let raw = RawEvent {
            player: self.player.map_or(0, |p| i64::from(p.index())),
            game_id: self.game_id,
            data: self.kind.as_wire().to_string(),
        };
        // A struct of integers and a string always serializes.
        serde_json::to_string(&raw).unwrap_or_default()
    }
}
