//! Client state machine.
//!
//! The `Client` owns the [`GameState`] of one [`PlayerSession`] and is the
//! only thing that mutates it. Push events are treated as hints: every event
//! that may have changed the game triggers a fresh snapshot fetch instead of
//! applying a delta, so lost, duplicated or reordered events all converge to
//! the server's view once a later snapshot lands.
//!
//! Responses are matched to requests through [`Ticket`]s. The generation part
//! moves on every phase transition, which is how a snapshot or guess result
//! issued before the game ended is recognised and discarded.

use gallows_proto::{
    GameSnapshot, GuessOutcome, PushEvent, PushKind, SessionStatus, TurnPosition, normalize_letter,
};

use crate::{
    ClientConfig, PlayerSession,
    error::ClientError,
    event::{ClientAction, ClientEvent, EndReason, Ticket},
    state::{GameState, Phase},
};

/// Client for one game session.
#[derive(Debug, Clone)]
pub struct Client {
    session: PlayerSession,
    config: ClientConfig,
    state: GameState,

    /// Startup status was fed in.
    restored: bool,

    /// Game was deleted; nothing further applies.
    ended: bool,

    /// Bumped on every phase transition.
    generation: u64,

    /// Seq of the most recently issued snapshot request.
    snapshot_seq: u64,

    /// Seq counter for every other request kind.
    request_seq: u64,

    /// Guess awaiting its result.
    pending_guess: Option<(Ticket, char)>,

    /// Whether we asked for a push channel and have not closed or lost it.
    channel_open: bool,
}

impl Client {
    /// Create a client for `session`. Feed [`ClientEvent::Restored`] first.
    pub fn new(session: PlayerSession, config: ClientConfig) -> Self {
        Self {
            session,
            config,
            state: GameState::default(),
            restored: false,
            ended: false,
            generation: 0,
            snapshot_seq: 0,
            request_seq: 0,
            pending_guess: None,
            channel_open: false,
        }
    }

    /// Identity this client acts for.
    pub fn session(&self) -> &PlayerSession {
        &self.session
    }

    /// Active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current local view of the game.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Current phase generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether it is our turn in a running game.
    pub fn can_submit(&self) -> bool {
        self.state.phase() == Some(Phase::InProgress)
            && self.state.turn_owner() == Some(self.session.turn_position())
    }

    /// A guess is awaiting its result.
    pub fn submission_pending(&self) -> bool {
        self.pending_guess.is_some()
    }

    /// The push channel is (supposed to be) open.
    pub fn channel_open(&self) -> bool {
        self.channel_open
    }

    /// The game was deleted.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Process an event and return resulting actions.
    ///
    /// Returning `Err` never leaves the client in an inconsistent state. For
    /// guess results the pending flag is cleared even when the result itself
    /// is rejected as stale.
    pub fn handle(&mut self, event: ClientEvent) -> Result<Vec<ClientAction>, ClientError> {
        if !self.restored && !matches!(event, ClientEvent::Restored { .. }) {
            return Err(ClientError::NotRestored);
        }

        match event {
            ClientEvent::Restored { status } => self.handle_restored(status),
            ClientEvent::PushReceived(push) => Ok(self.handle_push(push)),
            ClientEvent::ChannelLost { reason } => Ok(self.handle_channel_lost(reason)),
            ClientEvent::SnapshotReceived { ticket, snapshot } => {
                self.handle_snapshot(ticket, snapshot)
            },
            ClientEvent::RevealedWordReceived { ticket, word } => {
                self.handle_revealed_word(ticket, &word)
            },
            ClientEvent::TeammateReceived { ticket, name } => self.handle_teammate(ticket, name),
            ClientEvent::SubmitGuess { input } => self.handle_submit(input),
            ClientEvent::GuessResolved { ticket, outcome } => {
                self.handle_guess_resolved(ticket, outcome)
            },
            ClientEvent::GuessFailed { ticket, reason } => {
                self.handle_guess_failed(ticket, &reason)
            },
            ClientEvent::StatusReceived { ticket, status } => {
                self.handle_status(ticket, status)
            },
            ClientEvent::Refresh => Ok(self.handle_refresh()),
        }
    }

    fn handle_restored(&mut self, status: SessionStatus) -> Result<Vec<ClientAction>, ClientError> {
        if self.restored {
            return Err(ClientError::AlreadyRestored);
        }
        self.restored = true;

        let Some(phase) = Phase::from_status(status) else {
            return Ok(vec![
                log(format!("server does not know game {}", self.session.game_id())),
                ClientAction::RegistrationRequired,
            ]);
        };

        let mut actions = self.transition(phase);
        if !phase.is_terminal() {
            // Subscribe before the first snapshot so nothing falls in between.
            self.channel_open = true;
            let subscribe = ClientAction::Subscribe { game_id: self.session.game_id() };
            actions.insert(1.min(actions.len()), subscribe);
        }
        if phase == Phase::AwaitingOpponent {
            // game_start may have fired before the channel was open
            actions.push(self.fetch_status());
        }
        Ok(actions)
    }

    fn handle_status(
        &mut self,
        ticket: Ticket,
        status: SessionStatus,
    ) -> Result<Vec<ClientAction>, ClientError> {
        if ticket.generation != self.generation || self.ended {
            return Err(self.stale(ticket));
        }
        let Some(phase) = Phase::from_status(status) else {
            self.ended = true;
            self.pending_guess = None;
            let mut actions = self.close_channel();
            actions.push(log(format!("server forgot game {}", self.session.game_id())));
            actions.push(ClientAction::RegistrationRequired);
            return Ok(actions);
        };
        let actions = self.transition(phase);
        if actions.is_empty() {
            return Ok(vec![log(format!("status {status} changes nothing"))]);
        }
        Ok(actions)
    }

    fn handle_push(&mut self, push: PushEvent) -> Vec<ClientAction> {
        if push.game_id != self.session.game_id() {
            return vec![log(format!("ignoring {} for game {}", push.kind, push.game_id))];
        }
        let Some(phase) = self.state.phase().filter(|_| !self.ended) else {
            return vec![log(format!("ignoring {} outside a game", push.kind))];
        };

        match push.kind {
            PushKind::GameStart => match phase {
                Phase::AwaitingOpponent => {
                    let mut actions = self.transition(Phase::InProgress);
                    actions.extend(self.assign_turn(TurnPosition::First));
                    actions
                },
                Phase::InProgress => vec![self.fetch_snapshot()],
                Phase::Won | Phase::Lost => vec![log("ignoring game_start after game end")],
            },
            PushKind::LetterCorrect | PushKind::LetterFalse => {
                let mut actions = match phase {
                    // game_start was missed; the letter event proves the game runs
                    Phase::AwaitingOpponent => self.transition(Phase::InProgress),
                    Phase::InProgress => vec![self.fetch_snapshot()],
                    Phase::Won | Phase::Lost => {
                        return vec![log(format!("ignoring {} after game end", push.kind))];
                    },
                };
                if let Some(player) = push.player {
                    actions.extend(self.assign_turn(self.config.push_player.next_owner(player)));
                }
                actions
            },
            PushKind::Solved => self.finish(Phase::Won),
            PushKind::Lost => self.finish(Phase::Lost),
            PushKind::GameDeleted => {
                self.ended = true;
                self.pending_guess = None;
                let mut actions = self.close_channel();
                actions.push(ClientAction::SessionEnded { reason: EndReason::Deleted });
                actions
            },
        }
    }

    fn handle_channel_lost(&mut self, reason: String) -> Vec<ClientAction> {
        if !self.channel_open {
            return vec![log(format!("channel already closed: {reason}"))];
        }
        self.channel_open = false;
        vec![ClientAction::ChannelLost { reason }]
    }

    fn handle_snapshot(
        &mut self,
        ticket: Ticket,
        snapshot: GameSnapshot,
    ) -> Result<Vec<ClientAction>, ClientError> {
        if ticket.generation != self.generation || ticket.seq != self.snapshot_seq || self.ended {
            return Err(self.stale(ticket));
        }

        let effect = self.state.merge_snapshot(snapshot);
        let mut actions = Vec::new();
        if effect.fields_changed {
            actions.push(ClientAction::StateUpdated);
        }
        if effect.turn_changed {
            actions.extend(self.turn_changed());
        }
        Ok(actions)
    }

    fn handle_revealed_word(
        &mut self,
        ticket: Ticket,
        word: &str,
    ) -> Result<Vec<ClientAction>, ClientError> {
        let terminal = self.state.phase().is_some_and(Phase::is_terminal);
        if ticket.generation != self.generation || !terminal {
            return Err(self.stale(ticket));
        }
        let changed = self.state.set_revealed_word(word);
        Ok(changed.then_some(ClientAction::StateUpdated).into_iter().collect())
    }

    fn handle_teammate(
        &mut self,
        ticket: Ticket,
        name: String,
    ) -> Result<Vec<ClientAction>, ClientError> {
        if ticket.generation != self.generation {
            return Err(self.stale(ticket));
        }
        let changed = self.state.set_teammate(name);
        Ok(changed.then_some(ClientAction::StateUpdated).into_iter().collect())
    }

    fn handle_submit(&mut self, input: String) -> Result<Vec<ClientAction>, ClientError> {
        let mut chars = input.trim().chars();
        let letter = match (chars.next(), chars.next()) {
            (Some(c), None) => normalize_letter(c),
            _ => None,
        }
        .ok_or(ClientError::InvalidGuess { input })?;

        if self.state.phase() != Some(Phase::InProgress) || self.ended {
            return Err(ClientError::GameNotRunning { phase: self.state.phase() });
        }
        if self.pending_guess.is_some() {
            return Err(ClientError::SubmissionPending);
        }
        if self.state.guessed_letters().contains(&letter) {
            return Err(ClientError::DuplicateGuess { letter });
        }

        let ticket = self.next_ticket();
        self.pending_guess = Some((ticket, letter));

        let mut actions = Vec::new();
        if !self.can_submit() {
            actions.push(log(format!("sending {letter} while the turn looks taken")));
        }
        actions.push(ClientAction::SendGuess { ticket, letter });
        Ok(actions)
    }

    fn handle_guess_resolved(
        &mut self,
        ticket: Ticket,
        outcome: GuessOutcome,
    ) -> Result<Vec<ClientAction>, ClientError> {
        let letter = self.take_pending(ticket)?;
        if ticket.generation != self.generation || self.ended {
            return Err(self.stale(ticket));
        }

        if !outcome.is_scored() {
            // our view of the turn was wrong; ask the server
            return Ok(vec![ClientAction::NotYourTurn { letter }, self.fetch_snapshot()]);
        }

        let mut actions = vec![ClientAction::GuessScored { letter, outcome }];
        if self.state.insert_letter(letter) {
            actions.push(ClientAction::StateUpdated);
        }
        if outcome.is_terminal() {
            let phase = if outcome == GuessOutcome::Won { Phase::Won } else { Phase::Lost };
            actions.extend(self.transition(phase));
        } else {
            actions.extend(self.assign_turn(self.session.turn_position().other()));
            actions.push(self.fetch_snapshot());
        }
        Ok(actions)
    }

    fn handle_guess_failed(
        &mut self,
        ticket: Ticket,
        reason: &str,
    ) -> Result<Vec<ClientAction>, ClientError> {
        let letter = self.take_pending(ticket)?;
        Ok(vec![log(format!("guess {letter} failed, not retrying: {reason}"))])
    }

    fn handle_refresh(&mut self) -> Vec<ClientAction> {
        if self.ended {
            return Vec::new();
        }
        match self.state.phase() {
            Some(Phase::AwaitingOpponent) => vec![self.fetch_status()],
            Some(Phase::InProgress) => vec![self.fetch_snapshot()],
            Some(Phase::Won | Phase::Lost) if self.state.revealed_word().is_none() => {
                vec![ClientAction::FetchRevealedWord { ticket: self.next_ticket() }]
            },
            _ => Vec::new(),
        }
    }

    /// Advance the phase and issue the fetches the new phase needs.
    fn transition(&mut self, next: Phase) -> Vec<ClientAction> {
        let Some(from) = self.state.advance(next) else {
            return Vec::new();
        };
        self.generation += 1;

        let mut actions = vec![ClientAction::PhaseChanged { from, to: next }];
        match next {
            Phase::AwaitingOpponent => {},
            Phase::InProgress => {
                actions.push(self.fetch_snapshot());
                actions.push(ClientAction::FetchTeammate { ticket: self.next_ticket() });
            },
            Phase::Won | Phase::Lost => {
                actions.extend(self.close_channel());
                actions.push(ClientAction::FetchRevealedWord { ticket: self.next_ticket() });
            },
        }
        actions
    }

    fn finish(&mut self, phase: Phase) -> Vec<ClientAction> {
        let actions = self.transition(phase);
        if actions.is_empty() {
            return vec![log(format!("already finished, ignoring {phase:?}"))];
        }
        actions
    }

    fn assign_turn(&mut self, owner: TurnPosition) -> Vec<ClientAction> {
        if self.state.set_turn_owner(owner) { self.turn_changed() } else { Vec::new() }
    }

    fn turn_changed(&self) -> Vec<ClientAction> {
        self.state
            .turn_owner()
            .map(|owner| ClientAction::TurnChanged {
                owner,
                ours: owner == self.session.turn_position(),
            })
            .into_iter()
            .collect()
    }

    fn close_channel(&mut self) -> Vec<ClientAction> {
        if !self.channel_open {
            return Vec::new();
        }
        self.channel_open = false;
        vec![ClientAction::CloseChannel]
    }

    fn take_pending(&mut self, ticket: Ticket) -> Result<char, ClientError> {
        match self.pending_guess {
            Some((pending, letter)) if pending == ticket => {
                self.pending_guess = None;
                Ok(letter)
            },
            _ => Err(self.stale(ticket)),
        }
    }

    fn fetch_snapshot(&mut self) -> ClientAction {
        self.snapshot_seq += 1;
        ClientAction::FetchSnapshot {
            ticket: Ticket { generation: self.generation, seq: self.snapshot_seq },
        }
    }

    fn fetch_status(&mut self) -> ClientAction {
        ClientAction::FetchStatus { ticket: self.next_ticket() }
    }

    fn next_ticket(&mut self) -> Ticket {
        self.request_seq += 1;
        Ticket { generation: self.generation, seq: self.request_seq }
    }

    fn stale(&self, ticket: Ticket) -> ClientError {
        ClientError::StaleResponse { ticket, current: self.generation }
    }
}

fn log(message: impl Into<String>) -> ClientAction {
    ClientAction::Log { message: message.into() }
}
