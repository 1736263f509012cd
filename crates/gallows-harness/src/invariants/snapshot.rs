//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the observable state of the system at a point in time.
//! Invariants operate on snapshots rather than live state to ensure
//! consistent, atomic checks.

use std::collections::BTreeSet;

use gallows_app::GameView;
use gallows_client::{Client, Phase};
use gallows_proto::{GameId, GameSnapshot, SessionStatus, TurnPosition, WordMask};

/// Snapshot of the entire system state.
///
/// Contains observable state from one or more clients, plus the
/// authoritative server state of the game they play when known.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// Per-client state snapshots.
    pub clients: Vec<ClientSnapshot>,
    /// Authoritative state of the shared game. `None` if not observed.
    pub server: Option<ServerSnapshot>,
}

impl SystemSnapshot {
    /// Create an empty snapshot (no clients).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a snapshot with a single client.
    pub fn single(client: ClientSnapshot) -> Self {
        Self { clients: vec![client], server: None }
    }

    /// Create a snapshot from multiple clients.
    pub fn from_clients(clients: Vec<ClientSnapshot>) -> Self {
        Self { clients, server: None }
    }

    /// Attach the authoritative game state.
    #[must_use]
    pub fn with_server(mut self, server: ServerSnapshot) -> Self {
        self.server = Some(server);
        self
    }

    /// Add a client snapshot.
    pub fn add_client(&mut self, client: ClientSnapshot) {
        self.clients.push(client);
    }
}

/// Authoritative state of one game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSnapshot {
    /// Game observed.
    pub game_id: GameId,
    /// Server status. `None` once deleted.
    pub status: Option<SessionStatus>,
    /// Game fields. `None` once deleted.
    pub game: Option<GameSnapshot>,
}

/// Snapshot of a single client's observable state.
#[derive(Debug, Clone, Default)]
pub struct ClientSnapshot {
    /// Client identifier.
    pub id: u64,
    /// Our turn position. `None` before a session exists.
    pub position: Option<TurnPosition>,
    /// Current phase.
    pub phase: Option<Phase>,
    /// Current word mask.
    pub word_mask: WordMask,
    /// Current lives.
    pub lives_remaining: Option<u32>,
    /// Current guessed letters.
    pub guessed_letters: BTreeSet<char>,
    /// Current turn owner.
    pub turn_owner: Option<TurnPosition>,
    /// Whether the gate would let a guess through.
    pub can_submit: bool,
    /// Phase history (for monotonicity checks).
    pub phase_history: Vec<Phase>,
    /// Guessed letter history (for monotonicity checks).
    pub letters_history: Vec<BTreeSet<char>>,
    /// Lives history (for monotonicity checks).
    pub lives_history: Vec<u32>,
}

impl ClientSnapshot {
    /// Create a new client snapshot.
    pub fn new(id: u64) -> Self {
        Self { id, ..Default::default() }
    }

    /// Snapshot of `client` with its current state as the only history entry.
    pub fn of(id: u64, client: &Client) -> Self {
        let mut snapshot = Self::new(id);
        snapshot.record(client);
        snapshot
    }

    /// Take the current state of `client` and append it to the history.
    pub fn record(&mut self, client: &Client) {
        let state = client.state();

        self.position = Some(client.session().turn_position());
        self.phase = state.phase();
        self.word_mask = state.word_mask().clone();
        self.lives_remaining = state.lives_remaining();
        self.guessed_letters = state.guessed_letters().clone();
        self.turn_owner = state.turn_owner();
        self.can_submit = client.can_submit();
        self.push_history();
    }

    /// Take the state shown by a rendered view and append it to the history.
    ///
    /// Views carry no gate state; `can_submit` is read as "our turn in a
    /// running game", which is what the gate checks.
    pub fn record_view(&mut self, view: &GameView) {
        self.position = Some(view.turn_position);
        self.phase = view.phase;
        self.word_mask = view.word_mask.parse().unwrap_or_default();
        self.lives_remaining = view.lives_remaining;
        self.guessed_letters = view.guessed_letters.clone();
        self.turn_owner = view.turn_owner;
        self.can_submit = view.our_turn();
        self.push_history();
    }

    fn push_history(&mut self) {
        if let Some(phase) = self.phase
            && self.phase_history.last() != Some(&phase)
        {
            self.phase_history.push(phase);
        }
        if self.letters_history.last() != Some(&self.guessed_letters) {
            self.letters_history.push(self.guessed_letters.clone());
        }
        if let Some(lives) = self.lives_remaining
            && self.lives_history.last() != Some(&lives)
        {
            self.lives_history.push(lives);
        }
    }

    /// Set the phase, recording it in the history.
    #[must_use]
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self.phase_history.push(phase);
        self
    }

    /// Set guessed letters, recording them in the history.
    #[must_use]
    pub fn with_letters(mut self, letters: &str) -> Self {
        self.guessed_letters = letters.chars().collect();
        self.letters_history.push(self.guessed_letters.clone());
        self
    }

    /// Set lives, recording them in the history.
    #[must_use]
    pub fn with_lives(mut self, lives: u32) -> Self {
        self.lives_remaining = Some(lives);
        self.lives_history.push(lives);
        self
    }
}
