//! Registration payloads.

use serde::{Deserialize, Serialize};

use crate::{
    SessionStatus,
    errors::{ProtocolError, Result},
    ids::{GameId, SessionToken, TurnPosition},
};

/// Body of the registration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Display name shown to the opponent.
    pub username: String,
}

/// Raw registration response.
///
/// `result` codes: `0` invalid name, `1` name already active in a running
/// game, `2` registered as first player, `3` registered as second player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// Result code.
    pub result: u8,
    /// Game the player was placed into. Meaningless on rejection.
    #[serde(default)]
    pub game_id: GameId,
    /// Fresh session token. Present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl RegisterResponse {
    /// Result code for an invalid display name.
    pub const INVALID_NAME: u8 = 0;
    /// Result code for a display name already active in a running game.
    pub const NAME_TAKEN: u8 = 1;
    /// Result code for a first player waiting on an opponent.
    pub const AWAITING_OPPONENT: u8 = 2;
    /// Result code for a second player whose registration started the game.
    pub const GAME_STARTED: u8 = 3;
}

/// Why the server refused a display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Empty or otherwise unacceptable name.
    InvalidName,
    /// Name already belongs to a player in a running game.
    NameTaken,
}

/// A successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Token to persist for future reloads.
    pub token: SessionToken,
    /// Game this player belongs to.
    pub game_id: GameId,
    /// Assigned turn position.
    pub turn_position: TurnPosition,
}

impl Registration {
    /// Status implied by a fresh registration.
    ///
    /// The second player's registration is what starts the game.
    pub fn initial_status(&self) -> SessionStatus {
        match self.turn_position {
            TurnPosition::First => SessionStatus::WaitingForOpponent,
            TurnPosition::Second => SessionStatus::InProgress,
        }
    }
}

/// Interpreted registration response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationReply {
    /// Player registered.
    Accepted(Registration),
    /// Display name refused; the user must pick another one.
    Rejected(Rejection),
}

impl TryFrom<RegisterResponse> for RegistrationReply {
    type Error = ProtocolError;

    fn try_from(response: RegisterResponse) -> Result<Self> {
        let turn_position = match response.result {
            RegisterResponse::INVALID_NAME => return Ok(Self::Rejected(Rejection::InvalidName)),
            RegisterResponse::NAME_TAKEN => return Ok(Self::Rejected(Rejection::NameTaken)),
            RegisterResponse::AWAITING_OPPONENT => TurnPosition::First,
            RegisterResponse::GAME_STARTED => TurnPosition::Second,
            other => return Err(ProtocolError::UnknownRegistration(other)),
        };

        let token = response.token.ok_or(ProtocolError::MissingToken)?;
        Ok(Self::Accepted(Registration {
            token: SessionToken::new(token)?,
            game_id: response.game_id,
            turn_position,
        }))
    }
}
