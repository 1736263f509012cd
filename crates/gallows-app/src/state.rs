//! Observable application state types.
//!
//! [`GameView`] is the view model of one game: a plain copy of what the
//! client currently believes, detached from the client so the UI can hold on
//! to it without borrowing protocol state.

use std::collections::BTreeSet;

use gallows_client::{Client, GameId, Phase, TurnPosition};

/// Which screen the app is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Restoring or registering.
    Connecting,
    /// Waiting for the user to type a display name.
    NamePrompt,
    /// Attached to a game, running or finished.
    InGame,
}

/// Rendered view of a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameView {
    /// Game we belong to.
    pub game_id: GameId,
    /// Our turn position.
    pub turn_position: TurnPosition,
    /// Game phase. `None` before the status query answered.
    pub phase: Option<Phase>,
    /// Word mask, `_` for hidden slots.
    pub word_mask: String,
    /// Lives left. `None` until the first snapshot.
    pub lives_remaining: Option<u32>,
    /// Letters guessed by either player.
    pub guessed_letters: BTreeSet<char>,
    /// Who may guess. `None` outside a running game.
    pub turn_owner: Option<TurnPosition>,
    /// Secret word, once the game is over.
    pub revealed_word: Option<String>,
    /// Opponent's display name.
    pub teammate: Option<String>,
    /// The push channel is up.
    pub live: bool,
}

impl GameView {
    /// Copy the client's current state.
    pub fn of(client: &Client) -> Self {
        let state = client.state();
        Self {
            game_id: client.session().game_id(),
            turn_position: client.session().turn_position(),
            phase: state.phase(),
            word_mask: state.word_mask().to_string(),
            lives_remaining: state.lives_remaining(),
            guessed_letters: state.guessed_letters().clone(),
            turn_owner: state.turn_owner(),
            revealed_word: state.revealed_word().map(ToOwned::to_owned),
            teammate: state.teammate().map(ToOwned::to_owned),
            live: client.channel_open(),
        }
    }

    /// Running game and the turn is ours.
    pub fn our_turn(&self) -> bool {
        self.phase == Some(Phase::InProgress) && self.turn_owner == Some(self.turn_position)
    }

    /// The game has finished.
    pub fn is_over(&self) -> bool {
        self.phase.is_some_and(Phase::is_terminal)
    }
}
