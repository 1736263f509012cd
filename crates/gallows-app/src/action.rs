//! Application side-effects and intents.
//!
//! This module defines the [`AppAction`] enum, which represents instructions
//! produced by the [`crate::App`] state machine for the runtime to execute.

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Quit the application.
    Quit,

    /// Register a display name.
    Register {
        /// Name as typed.
        name: String,
    },

    /// Hand a guess to the input gate.
    SubmitGuess {
        /// Raw input, validated by the client.
        input: String,
    },

    /// Poll the authoritative game state.
    Refresh,

    /// Delete the game on the server, then forget the session.
    ResetGame,

    /// Forget the persisted session and drop the client.
    DiscardSession,
}
