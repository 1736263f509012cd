//! Application input events.
//!
//! This module defines [`AppEvent`], the inputs that drive the
//! [`crate::App`] state machine.
//!
//! Events originate from two distinct sources:
//! - User input lines, already split into commands and text.
//! - Game notifications translated from the client by the [`crate::Bridge`].

use gallows_client::{GameId, Phase, TurnPosition};
use gallows_proto::GuessOutcome;

use crate::{GameView, UserInput};

/// Events processed by the App state machine.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A line of user input.
    Input(UserInput),

    /// No usable session; ask for a display name.
    NeedName {
        /// Why the previous attempt failed. `None` on a fresh start.
        reason: Option<String>,
    },

    /// A session was restored or registered.
    SessionStarted {
        /// Game joined.
        game_id: GameId,
        /// Our turn position.
        turn_position: TurnPosition,
    },

    /// Local view of the game changed.
    GameUpdated(GameView),

    /// Game phase moved forward.
    PhaseChanged {
        /// Previous phase. `None` on restore.
        from: Option<Phase>,
        /// New phase.
        to: Phase,
    },

    /// Turn passed.
    TurnChanged {
        /// Whether it is now our turn.
        ours: bool,
    },

    /// Our guess was scored.
    GuessScored {
        /// Letter guessed.
        letter: char,
        /// Verdict.
        outcome: GuessOutcome,
    },

    /// Our guess was refused because the opponent holds the turn.
    NotYourTurn {
        /// Refused letter.
        letter: char,
    },

    /// No guess is in flight anymore; input may be re-enabled.
    SubmissionSettled,

    /// Push channel dropped and will not be reopened.
    ChannelLost {
        /// Transport description.
        reason: String,
    },

    /// Server no longer knows our token.
    RegistrationRequired,

    /// The game was deleted.
    SessionEnded,

    /// Something failed; shown to the user.
    Error {
        /// Error description.
        message: String,
    },
}
