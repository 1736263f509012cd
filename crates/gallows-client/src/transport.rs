//! Transport seam.
//!
//! [`Transport`] is the only thing that touches the network. It knows nothing
//! about game rules: it moves text bodies for queries, JSON for submissions,
//! and push events for the per-game channel. The HTTP implementation lives in
//! [`crate::http`] behind the `transport` feature; tests use an in-memory one.

use std::future::Future;

use gallows_proto::{GameId, PushEvent, SessionToken};
use tokio::{sync::mpsc, task::AbortHandle};

/// HTTP method an endpoint is served under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// No body; the token cookie is all the server reads.
    Get,
    /// JSON body.
    Post,
}

/// Server operations the client uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Register a display name. Submit.
    Register,
    /// Session status of the token. Query.
    Status,
    /// Word mask. Query.
    WordMask,
    /// Lives remaining. Query.
    Lives,
    /// Guessed letters. Query.
    GuessedLetters,
    /// Whether the token's player holds the turn. Query.
    IsPlayersTurn,
    /// Secret word, once the game is over. Query.
    Word,
    /// Opponent's display name. Query.
    Teammate,
    /// Submit a guess. Submit.
    Guess,
    /// Delete the game. Submit.
    DeleteGame,
}

impl Endpoint {
    /// Path relative to the server base URL.
    pub fn path(self) -> &'static str {
        match self {
            Self::Register => "api/register",
            Self::Status => "api/registered",
            Self::WordMask => "api/game_string",
            Self::Lives => "api/lives",
            Self::GuessedLetters => "api/guessed_letters",
            Self::IsPlayersTurn => "api/is_players_turn",
            Self::Word => "api/word",
            Self::Teammate => "api/teammates",
            Self::Guess => "api/submit_char",
            Self::DeleteGame => "api/delete_game",
        }
    }

    /// Method the server routes this endpoint under.
    ///
    /// Deleting a game changes state but is still a `GET`.
    pub fn method(self) -> Method {
        match self {
            Self::Register | Self::Guess => Method::Post,
            Self::Status
            | Self::WordMask
            | Self::Lives
            | Self::GuessedLetters
            | Self::IsPlayersTurn
            | Self::Word
            | Self::Teammate
            | Self::DeleteGame => Method::Get,
        }
    }
}

/// Push channel path for a game.
pub fn channel_path(game_id: GameId) -> String {
    format!("sse/{game_id}")
}

/// Item delivered on a push subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelItem {
    /// Decoded push event.
    Event(PushEvent),
    /// Stream failed. Nothing follows.
    Lost(String),
}

/// Handle to an open push channel.
///
/// Dropping or closing the handle stops delivery.
#[derive(Debug)]
pub struct Subscription {
    /// Incoming items, in server-send order.
    pub events: mpsc::Receiver<ChannelItem>,
    /// Task feeding `events`, if the transport spawned one.
    abort_handle: Option<AbortHandle>,
}

impl Subscription {
    /// Wrap a receiver fed by something other than a task we own.
    pub fn new(events: mpsc::Receiver<ChannelItem>) -> Self {
        Self { events, abort_handle: None }
    }

    /// Wrap a receiver fed by a spawned task.
    pub fn with_task(events: mpsc::Receiver<ChannelItem>, abort_handle: AbortHandle) -> Self {
        Self { events, abort_handle: Some(abort_handle) }
    }

    /// Stop the channel.
    pub fn close(&mut self) {
        self.events.close();
        if let Some(handle) = self.abort_handle.take() {
            handle.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

/// Request/response calls plus the push channel.
///
/// Implementations must not retry `submit` calls on their own.
pub trait Transport: Send + Sync {
    /// Transport-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Idempotent read returning the response body as text.
    fn query(
        &self,
        endpoint: Endpoint,
        token: Option<&SessionToken>,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;

    /// State-changing call, returning the response body.
    ///
    /// `body` is sent as JSON when the endpoint takes a [`Method::Post`].
    fn submit(
        &self,
        endpoint: Endpoint,
        token: Option<&SessionToken>,
        body: serde_json::Value,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;

    /// Open the push channel for `game_id`.
    fn subscribe(
        &self,
        game_id: GameId,
    ) -> impl Future<Output = Result<Subscription, Self::Error>> + Send;
}
