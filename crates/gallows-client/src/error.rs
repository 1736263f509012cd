//! Client error types.

use gallows_proto::ProtocolError;
use thiserror::Error;

use crate::{Phase, Ticket};

/// Errors returned by the client state machine.
///
/// None of these are faults of the process. Input errors are rejected before
/// anything reaches the network; `StaleResponse` means a reply was discarded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Guess input is not exactly one ASCII letter.
    #[error("a guess must be exactly one letter, got {input:?}")]
    InvalidGuess {
        /// Raw input as typed.
        input: String,
    },

    /// Letter was already guessed by either player.
    #[error("letter {letter} was already guessed")]
    DuplicateGuess {
        /// Normalized letter.
        letter: char,
    },

    /// A guess is already awaiting its result.
    #[error("a guess is already in flight")]
    SubmissionPending,

    /// Guesses are only accepted while the game is running.
    #[error("game is not running (phase: {phase:?})")]
    GameNotRunning {
        /// Current phase. `None` before the session was restored.
        phase: Option<Phase>,
    },

    /// Response was issued for a state the client has already moved past.
    #[error("stale response for {ticket:?} (current generation {current})")]
    StaleResponse {
        /// Ticket the response was tagged with.
        ticket: Ticket,
        /// Generation at the time the response arrived.
        current: u64,
    },

    /// Session status has not been fed in yet.
    #[error("session has not been restored")]
    NotRestored,

    /// Session status was already fed in.
    #[error("session was already restored")]
    AlreadyRestored,
}

/// Errors from the typed API layer.
#[derive(Error, Debug)]
pub enum ApiError<E>
where
    E: std::error::Error + 'static,
{
    /// Network-level failure. Safe to surface for a user-driven retry.
    #[error("transport error: {0}")]
    Transport(#[source] E),

    /// Server answered with something we cannot interpret.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}
