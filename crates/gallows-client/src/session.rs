//! Player identity and client configuration.

use gallows_proto::{GameId, Registration, SessionToken, TurnPosition};

/// Identity of this client within one game.
///
/// Created once at registration and never mutated. A new game means a new
/// `PlayerSession` and a new [`crate::Client`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSession {
    token: SessionToken,
    game_id: GameId,
    turn_position: TurnPosition,
}

impl PlayerSession {
    /// Create a session from its parts.
    pub fn new(token: SessionToken, game_id: GameId, turn_position: TurnPosition) -> Self {
        Self { token, game_id, turn_position }
    }

    /// Opaque token sent with every request.
    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// Game this session belongs to. Scopes the push channel.
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    /// Our place in the turn order.
    pub fn turn_position(&self) -> TurnPosition {
        self.turn_position
    }
}

impl From<Registration> for PlayerSession {
    fn from(registration: Registration) -> Self {
        Self::new(registration.token, registration.game_id, registration.turn_position)
    }
}

/// How to read the `player` field of letter events.
///
/// The reference server sends the player who moves next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PushPlayerSemantics {
    /// The field names the player who guessed; the turn passes to the other.
    ActingPlayer,
    /// The field names the player who moves next.
    #[default]
    NextPlayer,
}

impl PushPlayerSemantics {
    /// Turn owner implied by a letter event carrying `player`.
    pub fn next_owner(self, player: TurnPosition) -> TurnPosition {
        match self {
            Self::ActingPlayer => player.other(),
            Self::NextPlayer => player,
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientConfig {
    /// Interpretation of the player field in letter events.
    pub push_player: PushPlayerSemantics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acting_player_hands_turn_to_opponent() {
        let semantics = PushPlayerSemantics::ActingPlayer;
        assert_eq!(semantics.next_owner(TurnPosition::First), TurnPosition::Second);
    }

    #[test]
    fn letter_events_name_the_next_player_by_default() {
        let semantics = ClientConfig::default().push_player;
        assert_eq!(semantics, PushPlayerSemantics::NextPlayer);
        assert_eq!(semantics.next_owner(TurnPosition::Second), TurnPosition::Second);
    }

    #[test]
    fn next_player_is_taken_literally() {
        let semantics = PushPlayerSemantics::NextPlayer;
        assert_eq!(semantics.next_owner(TurnPosition::First), TurnPosition::First);
    }
}
