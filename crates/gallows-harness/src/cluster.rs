//! Test cluster simulation for convergence testing.
//!
//! Runs several pure [`Client`]s against one [`SimServer`] without an async
//! runtime. Requests, responses and push deliveries are queued as work items
//! and executed one at a time. With [`NetworkFaults::interleave`] the next
//! item is picked by a seeded RNG, so races between a push and an in-flight
//! response replay exactly from the seed.

use gallows_client::{
    ChannelItem, Client, ClientAction, ClientConfig, ClientError, ClientEvent, Endpoint,
    PlayerSession,
};
use gallows_proto::{
    GameSnapshot, PushEvent, RegistrationReply, SessionStatus, SessionToken, TurnPosition,
    parse_letters,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::{
    invariants::{ClientSnapshot, InvariantRegistry, ServerSnapshot, SystemSnapshot},
    sim_server::{SimConfig, SimServer},
};

/// Push channel and scheduling faults.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NetworkFaults {
    /// Probability that a push event never reaches a subscriber.
    pub drop_rate: f64,
    /// Probability that a push event is delivered twice.
    pub duplicate_rate: f64,
    /// Push events on one channel may overtake each other.
    pub reorder: bool,
    /// Pending requests, responses and pushes run in random order.
    pub interleave: bool,
}

impl NetworkFaults {
    /// Deliver everything once, in order.
    pub fn none() -> Self {
        Self::default()
    }

    /// Duplicate and reorder pushes and interleave everything, dropping none.
    pub fn lossless_chaos() -> Self {
        Self { drop_rate: 0.0, duplicate_rate: 0.3, reorder: true, interleave: true }
    }
}

/// One event delivered to a client and the state it left behind.
///
/// Serializable so whole games can be pinned with snapshot tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    /// Client the event was delivered to.
    pub client: usize,
    /// Short description of the event.
    pub event: String,
    /// Phase afterwards.
    pub phase: Option<String>,
    /// Word mask afterwards.
    pub mask: String,
    /// Lives afterwards.
    pub lives: Option<u32>,
    /// Turn owner afterwards.
    pub turn_owner: Option<String>,
    /// Set when the client rejected the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A queued unit of simulated network activity.
#[derive(Debug, Clone)]
enum Work {
    /// Client asked for I/O that has not reached the server yet.
    Request { client: usize, action: ClientAction },
    /// Server answered; the client has not seen the answer yet.
    Response { client: usize, event: ClientEvent },
    /// Push event on its way to a subscriber.
    Push { client: usize, item: ChannelItem },
}

impl Work {
    fn client(&self) -> usize {
        match self {
            Self::Request { client, .. }
            | Self::Response { client, .. }
            | Self::Push { client, .. } => *client,
        }
    }
}

/// Simulated cluster of clients sharing one authoritative server.
pub struct TestCluster {
    server: SimServer,
    clients: Vec<Client>,
    snapshots: Vec<ClientSnapshot>,
    subscribed: Vec<bool>,
    /// Registration status of clients enrolled but not started yet.
    unstarted: Vec<Option<SessionStatus>>,
    /// Non-I/O actions each client produced, in order.
    notices: Vec<Vec<ClientAction>>,
    /// Errors each client returned for delivered events.
    errors: Vec<Vec<ClientError>>,
    work: Vec<Work>,
    /// Server history entries already fanned out.
    delivered: usize,
    rng: ChaCha8Rng,
    faults: NetworkFaults,
    client_config: ClientConfig,
    invariants: Option<InvariantRegistry>,
    lose_next_guess_response: bool,
    transcript: Vec<TranscriptEntry>,
}

impl TestCluster {
    /// Create an empty cluster.
    pub fn new(seed: u64, server: SimConfig, client_config: ClientConfig) -> Self {
        Self {
            server: SimServer::new(server),
            clients: Vec::new(),
            snapshots: Vec::new(),
            subscribed: Vec::new(),
            unstarted: Vec::new(),
            notices: Vec::new(),
            errors: Vec::new(),
            work: Vec::new(),
            delivered: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            faults: NetworkFaults::none(),
            client_config,
            invariants: None,
            lose_next_guess_response: false,
            transcript: Vec::new(),
        }
    }

    /// Apply push and scheduling faults.
    #[must_use]
    pub fn with_faults(mut self, faults: NetworkFaults) -> Self {
        self.faults = faults;
        self
    }

    /// Check invariants after every delivered event.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(registry);
        self
    }

    /// Register a player and start its client. Returns the client index.
    pub fn register(&mut self, name: &str) -> Result<usize, String> {
        let index = self.enroll(name)?;
        self.start(index)?;
        Ok(index)
    }

    /// Register a player without starting its client yet.
    ///
    /// Until [`Self::start`] the client has no push channel, so anything the
    /// server pushes in between never reaches it.
    pub fn enroll(&mut self, name: &str) -> Result<usize, String> {
        let response = self.server.register(name);
        self.fan_out();

        let registration = match RegistrationReply::try_from(response)
            .map_err(|e| format!("bad registration response: {e}"))?
        {
            RegistrationReply::Accepted(registration) => registration,
            RegistrationReply::Rejected(rejection) => {
                return Err(format!("{name} rejected: {rejection:?}"));
            },
        };

        let status = registration.initial_status();
        let index = self.clients.len();
        self.clients.push(Client::new(PlayerSession::from(registration), self.client_config));
        self.snapshots.push(ClientSnapshot::new(index as u64));
        self.subscribed.push(false);
        self.unstarted.push(Some(status));
        self.notices.push(Vec::new());
        self.errors.push(Vec::new());
        Ok(index)
    }

    /// Feed an enrolled client the status its registration answered with.
    pub fn start(&mut self, index: usize) -> Result<(), String> {
        let status = self.unstarted[index]
            .take()
            .ok_or_else(|| format!("client {index} already started"))?;
        self.feed(index, ClientEvent::Restored { status }).map_err(|e| e.to_string())
    }

    /// Restart client `index` from its token, as a page reload would.
    ///
    /// Everything in flight for the old instance is discarded.
    pub fn reload(&mut self, index: usize) -> Result<(), String> {
        let session = self.clients[index].session().clone();
        self.work.retain(|w| w.client() != index);
        self.subscribed[index] = false;

        let status = self.server.status(Some(session.token()));
        self.unstarted[index] = None;
        self.clients[index] = Client::new(session, self.client_config);
        self.snapshots[index] = ClientSnapshot::new(index as u64);
        self.feed(index, ClientEvent::Restored { status }).map_err(|e| e.to_string())
    }

    /// User of client `index` typed `input`.
    pub fn guess(&mut self, index: usize, input: &str) -> Result<(), ClientError> {
        self.feed(index, ClientEvent::SubmitGuess { input: input.to_string() })
    }

    /// User of client `index` asked for a refresh.
    pub fn refresh(&mut self, index: usize) -> Result<(), ClientError> {
        self.feed(index, ClientEvent::Refresh)
    }

    /// Client `index` deletes its game.
    pub fn delete_game(&mut self, index: usize) -> Result<(), String> {
        let token = self.token(index);
        self.server.delete_game(&token).map_err(|e| e.to_string())?;
        self.fan_out();
        Ok(())
    }

    /// Break the push channel of client `index`.
    pub fn lose_channel(&mut self, index: usize, reason: &str) {
        self.subscribed[index] = false;
        self.work.retain(|w| !matches!(w, Work::Push { client, .. } if *client == index));
        if let Err(e) = self.feed(index, ClientEvent::ChannelLost { reason: reason.to_string() }) {
            self.errors[index].push(e);
        }
    }

    /// The next guess reaches the server but its response is lost.
    pub fn lose_next_guess_response(&mut self) {
        self.lose_next_guess_response = true;
    }

    /// Execute one queued work item. Returns `false` if nothing was queued.
    pub fn step(&mut self) -> bool {
        if self.work.is_empty() {
            return false;
        }

        let mut index =
            if self.faults.interleave { self.rng.gen_range(0..self.work.len()) } else { 0 };
        if !self.faults.reorder
            && let Work::Push { client, .. } = &self.work[index]
        {
            let client = *client;
            index = self
                .work
                .iter()
                .position(|w| matches!(w, Work::Push { client: c, .. } if *c == client))
                .unwrap_or(index);
        }

        match self.work.remove(index) {
            Work::Request { client, action } => {
                if let Some(event) = self.execute(client, action) {
                    self.work.push(Work::Response { client, event });
                }
            },
            Work::Response { client, event } => {
                if let Err(e) = self.feed(client, event) {
                    self.errors[client].push(e);
                }
            },
            Work::Push { client, item } => {
                let event = match item {
                    ChannelItem::Event(push) => ClientEvent::PushReceived(push),
                    ChannelItem::Lost(reason) => ClientEvent::ChannelLost { reason },
                };
                if let Err(e) = self.feed(client, event) {
                    self.errors[client].push(e);
                }
            },
        }
        true
    }

    /// Run until no work is queued. Errors out after `max_steps`.
    pub fn run_until_quiet(&mut self, max_steps: usize) -> Result<usize, String> {
        let mut steps = 0;
        while self.step() {
            steps += 1;
            if steps > max_steps {
                return Err(format!("still busy after {max_steps} steps"));
            }
        }
        Ok(steps)
    }

    /// Run until no work is queued.
    pub fn settle(&mut self) -> Result<usize, String> {
        self.run_until_quiet(10_000)
    }

    /// Client `index`.
    pub fn client(&self, index: usize) -> &Client {
        &self.clients[index]
    }

    /// All clients.
    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    /// Recorded observations of client `index`.
    pub fn snapshot(&self, index: usize) -> &ClientSnapshot {
        &self.snapshots[index]
    }

    /// Non-I/O actions client `index` produced.
    pub fn notices(&self, index: usize) -> &[ClientAction] {
        &self.notices[index]
    }

    /// Errors client `index` returned for delivered events.
    pub fn errors(&self, index: usize) -> &[ClientError] {
        &self.errors[index]
    }

    /// Whether client `index` has its push channel open.
    pub fn is_subscribed(&self, index: usize) -> bool {
        self.subscribed[index]
    }

    /// Every delivered event, in delivery order.
    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Work items still queued.
    pub fn pending(&self) -> usize {
        self.work.len()
    }

    /// The server.
    pub fn server(&self) -> &SimServer {
        &self.server
    }

    /// The server, for driving it directly.
    pub fn server_mut(&mut self) -> &mut SimServer {
        &mut self.server
    }

    /// Snapshot of the first client's game: every client in it plus the
    /// server's state of it.
    pub fn system_snapshot(&self) -> SystemSnapshot {
        let Some(first) = self.clients.first() else {
            return SystemSnapshot::empty();
        };
        let game_id = first.session().game_id();
        let clients = self
            .clients
            .iter()
            .zip(&self.snapshots)
            .filter(|(client, _)| client.session().game_id() == game_id)
            .map(|(_, snapshot)| snapshot.clone())
            .collect();

        SystemSnapshot::from_clients(clients).with_server(ServerSnapshot {
            game_id,
            status: self.server.game_status(game_id),
            game: self.server.snapshot(game_id),
        })
    }

    fn token(&self, index: usize) -> SessionToken {
        self.clients[index].session().token().clone()
    }

    /// Hand `event` to client `index` and queue what it asks for.
    fn feed(&mut self, index: usize, event: ClientEvent) -> Result<(), ClientError> {
        let label = describe(&event);
        let result = self.clients[index].handle(event);
        if let Ok(actions) = &result {
            for action in actions.clone() {
                self.dispatch(index, action);
            }
        }
        self.snapshots[index].record(&self.clients[index]);

        let state = self.clients[index].state();
        self.transcript.push(TranscriptEntry {
            client: index,
            event: label,
            phase: state.phase().map(|p| format!("{p:?}")),
            mask: state.word_mask().to_string(),
            lives: state.lives_remaining(),
            turn_owner: state.turn_owner().map(|p| p.to_string()),
            error: result.as_ref().err().map(ToString::to_string),
        });

        if let Some(registry) = &self.invariants {
            registry.assert_all(&self.system_snapshot(), &format!("after event on client {index}"));
        }
        result.map(|_| ())
    }

    fn dispatch(&mut self, index: usize, action: ClientAction) {
        match action {
            ClientAction::Subscribe { .. } => self.subscribed[index] = true,
            ClientAction::CloseChannel => {
                self.subscribed[index] = false;
                self.work.retain(|w| !matches!(w, Work::Push { client, .. } if *client == index));
            },
            ClientAction::FetchSnapshot { .. }
            | ClientAction::FetchStatus { .. }
            | ClientAction::FetchRevealedWord { .. }
            | ClientAction::FetchTeammate { .. }
            | ClientAction::SendGuess { .. } => {
                self.work.push(Work::Request { client: index, action });
            },
            other => self.notices[index].push(other),
        }
    }

    /// Run a request against the server. `None` when the request failed and
    /// nothing is fed back.
    fn execute(&mut self, index: usize, action: ClientAction) -> Option<ClientEvent> {
        let token = self.token(index);
        let own = self.clients[index].session().turn_position();

        match action {
            ClientAction::FetchSnapshot { ticket } => match self.read_snapshot(&token, own) {
                Ok(snapshot) => Some(ClientEvent::SnapshotReceived { ticket, snapshot }),
                Err(e) => {
                    tracing::debug!(client = index, error = %e, "snapshot failed");
                    None
                },
            },
            ClientAction::FetchStatus { ticket } => {
                let status = self.server.status(Some(&token));
                Some(ClientEvent::StatusReceived { ticket, status })
            },
            ClientAction::FetchRevealedWord { ticket } => {
                let word = self.server.query(Endpoint::Word, Some(&token)).ok()?;
                Some(ClientEvent::RevealedWordReceived { ticket, word })
            },
            ClientAction::FetchTeammate { ticket } => {
                let name = self.server.query(Endpoint::Teammate, Some(&token)).ok()?;
                Some(ClientEvent::TeammateReceived { ticket, name })
            },
            ClientAction::SendGuess { ticket, letter } => {
                let result = self.server.guess(&token, letter);
                self.fan_out();
                Some(match result {
                    Ok(_) if self.lose_next_guess_response => {
                        self.lose_next_guess_response = false;
                        ClientEvent::GuessFailed { ticket, reason: "response lost".to_string() }
                    },
                    Ok(outcome) => ClientEvent::GuessResolved { ticket, outcome },
                    Err(e) => ClientEvent::GuessFailed { ticket, reason: e.to_string() },
                })
            },
            _ => None,
        }
    }

    fn read_snapshot(
        &mut self,
        token: &SessionToken,
        own: TurnPosition,
    ) -> Result<GameSnapshot, String> {
        let mut read = |endpoint| {
            self.server.query(endpoint, Some(token)).map_err(|e| format!("{endpoint:?}: {e}"))
        };
        let mask = read(Endpoint::WordMask)?;
        let lives = read(Endpoint::Lives)?;
        let letters = read(Endpoint::GuessedLetters)?;
        let turn = read(Endpoint::IsPlayersTurn)?;

        Ok(GameSnapshot {
            word_mask: mask.parse().map_err(|e| format!("{e}"))?,
            lives_remaining: GameSnapshot::parse_lives(&lives).map_err(|e| e.to_string())?,
            guessed_letters: parse_letters(&letters).map_err(|e| e.to_string())?,
            turn_owner: Some(GameSnapshot::parse_turn(&turn, own).map_err(|e| e.to_string())?),
        })
    }

    /// Queue new server push events for every subscriber of their game.
    fn fan_out(&mut self) {
        let fresh: Vec<PushEvent> = self.server.history()[self.delivered..].to_vec();
        self.delivered = self.server.history().len();

        let drop_rate = self.faults.drop_rate.clamp(0.0, 1.0);
        let duplicate_rate = self.faults.duplicate_rate.clamp(0.0, 1.0);

        for event in fresh {
            for index in 0..self.clients.len() {
                if !self.subscribed[index]
                    || self.clients[index].session().game_id() != event.game_id
                {
                    continue;
                }
                if self.rng.gen_bool(drop_rate) {
                    tracing::debug!(client = index, kind = %event.kind, "push dropped");
                    continue;
                }
                let copies = if self.rng.gen_bool(duplicate_rate) { 2 } else { 1 };
                for _ in 0..copies {
                    self.work.push(Work::Push { client: index, item: ChannelItem::Event(event) });
                }
            }
        }
    }
}

/// Transcript label for an event. Tickets are left out so labels stay stable.
fn describe(event: &ClientEvent) -> String {
    match event {
        ClientEvent::Restored { status } => format!("restored {status}"),
        ClientEvent::PushReceived(push) => match push.player {
            Some(player) => format!("push {} player {player}", push.kind),
            None => format!("push {}", push.kind),
        },
        ClientEvent::ChannelLost { reason } => format!("channel lost: {reason}"),
        ClientEvent::SnapshotReceived { snapshot, .. } => {
            format!("snapshot {} lives {}", snapshot.word_mask, snapshot.lives_remaining)
        },
        ClientEvent::RevealedWordReceived { word, .. } => format!("word {word}"),
        ClientEvent::TeammateReceived { name, .. } => format!("teammate {name}"),
        ClientEvent::StatusReceived { status, .. } => format!("status {status}"),
        ClientEvent::SubmitGuess { input } => format!("submit {input}"),
        ClientEvent::GuessResolved { outcome, .. } => format!("guess resolved {outcome:?}"),
        ClientEvent::GuessFailed { reason, .. } => format!("guess failed: {reason}"),
        ClientEvent::Refresh => "refresh".to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gallows_client::Phase;
    use gallows_proto::PushKind;

    use super::*;

    fn cluster(word: &str) -> TestCluster {
        TestCluster::new(0, SimConfig::default().word(word), ClientConfig::default())
            .with_invariants(InvariantRegistry::standard())
    }

    #[test]
    fn pairing_runs_the_game() {
        let mut cluster = cluster("RUST");
        let first = cluster.register("ada").unwrap();
        cluster.settle().unwrap();
        assert_eq!(cluster.client(first).state().phase(), Some(Phase::AwaitingOpponent));

        let second = cluster.register("bob").unwrap();
        cluster.settle().unwrap();

        for index in [first, second] {
            assert_eq!(cluster.client(index).state().phase(), Some(Phase::InProgress));
            assert_eq!(cluster.client(index).state().turn_owner(), Some(TurnPosition::First));
        }
        assert_eq!(cluster.client(first).state().teammate(), Some("bob"));
    }

    #[test]
    fn reload_discards_in_flight_work() {
        let mut cluster = cluster("RUST");
        let first = cluster.register("ada").unwrap();
        let _ = cluster.register("bob").unwrap();
        assert!(cluster.pending() > 0);

        cluster.reload(first).unwrap();
        cluster.settle().unwrap();

        assert!(cluster.errors(first).is_empty());
        assert_eq!(cluster.client(first).state().lives_remaining(), Some(10));
    }

    #[test]
    fn closing_the_channel_discards_queued_pushes() {
        let mut cluster = cluster("RUST");
        let first = cluster.register("ada").unwrap();
        let _ = cluster.register("bob").unwrap();

        cluster.lose_channel(first, "gone");
        cluster.settle().unwrap();

        assert!(!cluster.is_subscribed(first));
        assert!(
            cluster
                .notices(first)
                .iter()
                .any(|a| matches!(a, ClientAction::ChannelLost { .. }))
        );
        assert_eq!(cluster.server().history()[0].kind, PushKind::GameStart);
    }

    #[test]
    fn refresh_recovers_a_dropped_game_start() {
        let mut cluster = cluster("RUST");
        let first = cluster.register("ada").unwrap();
        cluster.settle().unwrap();
        let _ = cluster.register("bob").unwrap();

        cluster.lose_channel(first, "gone");
        cluster.settle().unwrap();
        // game_start never arrived, so the client still waits
        assert_eq!(cluster.client(first).state().phase(), Some(Phase::AwaitingOpponent));

        cluster.refresh(first).unwrap();
        cluster.settle().unwrap();

        assert_eq!(cluster.client(first).state().phase(), Some(Phase::InProgress));
        assert_eq!(cluster.client(first).state().turn_owner(), Some(TurnPosition::First));
        assert!(cluster.client(first).can_submit());
    }

    #[test]
    fn start_after_both_registered_still_reaches_the_game() {
        let mut cluster = cluster("RUST");
        let first = cluster.enroll("ada").unwrap();
        let second = cluster.register("bob").unwrap();
        assert!(cluster.start(first).is_ok());
        assert!(cluster.start(first).is_err());
        cluster.settle().unwrap();

        for index in [first, second] {
            assert_eq!(cluster.client(index).state().phase(), Some(Phase::InProgress));
            assert_eq!(cluster.client(index).state().turn_owner(), Some(TurnPosition::First));
        }
        assert!(cluster.client(first).can_submit());
        assert!(cluster.errors(first).is_empty());
        assert_eq!(cluster.client(first).state().teammate(), Some("bob"));
    }
}
