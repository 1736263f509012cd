//! Client events and actions.

use gallows_proto::{GameId, GameSnapshot, GuessOutcome, PushEvent, SessionStatus, TurnPosition};

use crate::Phase;

/// Tag attached to every outbound request.
///
/// `generation` changes on every phase transition; `seq` orders requests of
/// one kind. A response is only applied while its ticket is still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket {
    /// Phase generation the request was issued in.
    pub generation: u64,
    /// Per-kind request sequence number.
    pub seq: u64,
}

/// Events the caller feeds into the client.
///
/// The caller is responsible for:
/// - Querying the session status once at startup
/// - Executing fetch actions and feeding the responses back
/// - Forwarding push events and channel failures
/// - Forwarding user guesses
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Result of the startup status query. Must come first, exactly once.
    Restored {
        /// Server-side status of our token.
        status: SessionStatus,
    },

    /// Event received on the push channel.
    PushReceived(PushEvent),

    /// Push channel failed or was closed by the server.
    ChannelLost {
        /// Transport-level description.
        reason: String,
    },

    /// Response to [`ClientAction::FetchSnapshot`].
    SnapshotReceived {
        /// Ticket from the action.
        ticket: Ticket,
        /// Authoritative game fields.
        snapshot: GameSnapshot,
    },

    /// Response to [`ClientAction::FetchRevealedWord`].
    RevealedWordReceived {
        /// Ticket from the action.
        ticket: Ticket,
        /// The secret word.
        word: String,
    },

    /// Response to [`ClientAction::FetchTeammate`].
    TeammateReceived {
        /// Ticket from the action.
        ticket: Ticket,
        /// Display name of the other player.
        name: String,
    },

    /// Response to [`ClientAction::FetchStatus`].
    StatusReceived {
        /// Ticket from the action.
        ticket: Ticket,
        /// Server-side status of our token.
        status: SessionStatus,
    },

    /// User wants to guess.
    SubmitGuess {
        /// Raw input, validated by the client.
        input: String,
    },

    /// Response to [`ClientAction::SendGuess`].
    GuessResolved {
        /// Ticket from the action.
        ticket: Ticket,
        /// Server verdict.
        outcome: GuessOutcome,
    },

    /// [`ClientAction::SendGuess`] failed at the transport level.
    ///
    /// The guess may or may not have reached the server; it is not re-sent.
    GuessFailed {
        /// Ticket from the action.
        ticket: Ticket,
        /// Failure description.
        reason: String,
    },

    /// Explicit poll of the authoritative state.
    Refresh,
}

/// Why a session can no longer be played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// A player deleted the game.
    Deleted,
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Open the push channel for this game, closing any previous one.
    Subscribe {
        /// Channel scope.
        game_id: GameId,
    },

    /// Close the push channel.
    CloseChannel,

    /// Query word mask, lives, guessed letters and turn owner.
    ///
    /// Feed the result back as [`ClientEvent::SnapshotReceived`].
    FetchSnapshot {
        /// Ticket to echo back.
        ticket: Ticket,
    },

    /// Re-query the session status while waiting for an opponent.
    ///
    /// Feed the result back as [`ClientEvent::StatusReceived`].
    FetchStatus {
        /// Ticket to echo back.
        ticket: Ticket,
    },

    /// Query the secret word.
    FetchRevealedWord {
        /// Ticket to echo back.
        ticket: Ticket,
    },

    /// Query the other player's display name.
    FetchTeammate {
        /// Ticket to echo back.
        ticket: Ticket,
    },

    /// Submit a guess. Must not be retried automatically.
    SendGuess {
        /// Ticket to echo back.
        ticket: Ticket,
        /// Normalized letter.
        letter: char,
    },

    /// Server does not know our token; a new registration is needed.
    RegistrationRequired,

    /// Phase moved forward.
    PhaseChanged {
        /// Previous phase, `None` on restore.
        from: Option<Phase>,
        /// New phase.
        to: Phase,
    },

    /// Turn owner changed.
    TurnChanged {
        /// New owner.
        owner: TurnPosition,
        /// Whether it is now our turn.
        ours: bool,
    },

    /// Word mask, lives, guessed letters, revealed word or teammate changed.
    StateUpdated,

    /// Server scored our guess.
    GuessScored {
        /// The letter guessed.
        letter: char,
        /// Verdict.
        outcome: GuessOutcome,
    },

    /// Server refused our guess because the opponent holds the turn.
    ///
    /// Not an error; the user may retry once the turn comes back.
    NotYourTurn {
        /// The refused letter.
        letter: char,
    },

    /// Push channel is gone. It is not reopened; reloading restores state.
    ChannelLost {
        /// Transport-level description.
        reason: String,
    },

    /// Session cannot continue.
    SessionEnded {
        /// Why.
        reason: EndReason,
    },

    /// Log message for debugging.
    Log {
        /// Log message.
        message: String,
    },
}
