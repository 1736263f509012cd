//! In-process authoritative game server.
//!
//! `SimServer` plays the server side of the protocol without a network. It
//! pairs players, picks words from a seeded RNG, scores guesses and broadcasts
//! push events to subscribed channels. Every endpoint answers with the exact
//! text body the real server sends, so the client's decoding runs unchanged.
//!
//! The server is synchronous. Tests drive it either directly or through
//! [`crate::SimTransport`], which shares it behind a [`SharedSimServer`].

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use gallows_client::{ChannelItem, Endpoint, PushPlayerSemantics, Subscription};
use gallows_proto::{
    GameId, GameSnapshot, GuessOutcome, GuessRequest, MAX_LIVES, PushEvent, PushKind,
    RegisterRequest, RegisterResponse, SessionStatus, SessionToken, TurnPosition, WordMask,
    normalize_letter,
};
use rand::{SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Buffered push events per subscriber.
const CHANNEL_CAPACITY: usize = 64;

/// Body of the word query before the game has ended.
pub const WORD_NOT_AVAILABLE: &str = "Unable to return word: Game has to end first!";

/// Body of a successful deletion.
pub const GAME_DELETED: &str = "Game has been deleted, users have been reset";

/// Words drawn from when none are configured.
pub const DEFAULT_WORDS: &[&str] = &["GALLOWS", "HANGMAN", "BORROW", "LIFETIME", "TRAIT", "CARGO"];

/// Server-side request failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// Request carried no token or one the server does not know.
    #[error("unknown session token")]
    UnknownToken,

    /// Guess sent to a game that is waiting or finished.
    #[error("game {0} is not running")]
    GameNotRunning(GameId),

    /// Body did not decode.
    #[error("bad request body: {0}")]
    BadRequest(String),

    /// Query sent to a submit endpoint or the other way round.
    #[error("{endpoint:?} does not accept a {method}")]
    WrongMethod {
        /// Endpoint called.
        endpoint: Endpoint,
        /// `"query"` or `"submit"`.
        method: &'static str,
    },
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// RNG seed for word choice.
    pub seed: u64,
    /// Candidate words, upper-cased on use.
    pub words: Vec<String>,
    /// What the `player` field of letter events names.
    pub push_player: PushPlayerSemantics,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            words: DEFAULT_WORDS.iter().map(|w| (*w).to_string()).collect(),
            push_player: PushPlayerSemantics::NextPlayer,
        }
    }
}

impl SimConfig {
    /// Default words with a specific seed.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed, ..Self::default() }
    }

    /// Every game uses `word`.
    #[must_use]
    pub fn word(mut self, word: &str) -> Self {
        self.words = vec![word.to_string()];
        self
    }

    /// Attribute letter events with `semantics`.
    #[must_use]
    pub fn push_player(mut self, semantics: PushPlayerSemantics) -> Self {
        self.push_player = semantics;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Waiting,
    Running,
    Done { won: bool },
}

#[derive(Debug, Clone)]
struct SimPlayer {
    token: String,
    name: String,
}

#[derive(Debug, Clone)]
struct SimGame {
    word: String,
    /// Index is the turn position.
    players: Vec<SimPlayer>,
    current: TurnPosition,
    lives: u32,
    guessed: BTreeSet<char>,
    stage: Stage,
}

impl SimGame {
    fn new(word: String, first: SimPlayer) -> Self {
        Self {
            word,
            players: vec![first],
            current: TurnPosition::First,
            lives: MAX_LIVES,
            guessed: BTreeSet::new(),
            stage: Stage::Waiting,
        }
    }

    fn mask(&self) -> WordMask {
        WordMask::reveal(&self.word, &self.guessed)
    }

    fn solved(&self) -> bool {
        self.mask().is_complete()
    }

    fn status(&self) -> SessionStatus {
        match self.stage {
            Stage::Waiting => SessionStatus::WaitingForOpponent,
            Stage::Running => SessionStatus::InProgress,
            Stage::Done { won: true } => SessionStatus::Won,
            Stage::Done { won: false } => SessionStatus::Lost,
        }
    }

    fn teammates(&self, position: TurnPosition) -> String {
        self.players
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != usize::from(position.index()))
            .map(|(_, player)| player.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Authoritative in-memory game server.
pub struct SimServer {
    config: SimConfig,
    rng: ChaCha8Rng,
    games: BTreeMap<GameId, SimGame>,
    /// Token text to seat.
    seats: HashMap<String, (GameId, TurnPosition)>,
    next_game_id: GameId,
    next_token: u64,
    /// Every push event ever broadcast, in send order.
    history: Vec<PushEvent>,
    subscribers: HashMap<GameId, Vec<mpsc::Sender<ChannelItem>>>,
}

/// Server shared between transports.
pub type SharedSimServer = Arc<Mutex<SimServer>>;

/// Create a server ready to share between transports.
pub fn create_shared_server(config: SimConfig) -> SharedSimServer {
    Arc::new(Mutex::new(SimServer::new(config)))
}

/// Lock a shared server, ignoring poisoning.
pub fn lock(server: &SharedSimServer) -> MutexGuard<'_, SimServer> {
    server.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SimServer {
    /// Create a server with no games.
    pub fn new(config: SimConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            games: BTreeMap::new(),
            seats: HashMap::new(),
            next_game_id: 1,
            next_token: 1,
            history: Vec::new(),
            subscribers: HashMap::new(),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Answer a query endpoint with its text body.
    pub fn query(
        &mut self,
        endpoint: Endpoint,
        token: Option<&SessionToken>,
    ) -> Result<String, SimError> {
        if endpoint == Endpoint::Status {
            return Ok(self.status(token).as_wire().to_string());
        }

        let (game_id, position) = self.seat(token)?;
        let game = self.games.get(&game_id).ok_or(SimError::UnknownToken)?;

        let body = match endpoint {
            Endpoint::WordMask => game.mask().to_string(),
            Endpoint::Lives => game.lives.to_string(),
            Endpoint::GuessedLetters => {
                game.guessed.iter().map(char::to_string).collect::<Vec<_>>().join(" ")
            },
            Endpoint::IsPlayersTurn => (game.current == position).to_string(),
            Endpoint::Word => match game.stage {
                Stage::Done { .. } => game.word.clone(),
                Stage::Waiting | Stage::Running => WORD_NOT_AVAILABLE.to_string(),
            },
            Endpoint::Teammate => game.teammates(position),
            Endpoint::Status | Endpoint::Register | Endpoint::Guess | Endpoint::DeleteGame => {
                return Err(SimError::WrongMethod { endpoint, method: "query" });
            },
        };
        Ok(body)
    }

    /// Answer a submit endpoint with its text body.
    pub fn submit(
        &mut self,
        endpoint: Endpoint,
        token: Option<&SessionToken>,
        body: &serde_json::Value,
    ) -> Result<String, SimError> {
        match endpoint {
            Endpoint::Register => {
                let request: RegisterRequest = decode(body)?;
                let response = self.register(&request.username);
                serde_json::to_string(&response).map_err(|e| SimError::BadRequest(e.to_string()))
            },
            Endpoint::Guess => {
                let request: GuessRequest = decode(body)?;
                let token = token.ok_or(SimError::UnknownToken)?;
                self.guess(token, request.character).map(|outcome| outcome.code().to_string())
            },
            Endpoint::DeleteGame => {
                let token = token.ok_or(SimError::UnknownToken)?;
                self.delete_game(token)?;
                Ok(GAME_DELETED.to_string())
            },
            Endpoint::Status
            | Endpoint::WordMask
            | Endpoint::Lives
            | Endpoint::GuessedLetters
            | Endpoint::IsPlayersTurn
            | Endpoint::Word
            | Endpoint::Teammate => Err(SimError::WrongMethod { endpoint, method: "submit" }),
        }
    }

    /// Register a display name.
    ///
    /// Joins the oldest game waiting for an opponent, which starts it, or
    /// opens a new one.
    pub fn register(&mut self, name: &str) -> RegisterResponse {
        let name = name.trim();
        if name.is_empty() {
            return rejection(RegisterResponse::INVALID_NAME);
        }
        if self.name_active(name) {
            return rejection(RegisterResponse::NAME_TAKEN);
        }

        let token = self.issue_token();
        let player = SimPlayer { token: token.clone(), name: name.to_string() };
        let waiting =
            self.games.iter_mut().find(|(_, g)| g.stage == Stage::Waiting).map(|(id, g)| (*id, g));

        let (game_id, result) = match waiting {
            Some((game_id, game)) => {
                game.players.push(player);
                game.stage = Stage::Running;
                self.seats.insert(token.clone(), (game_id, TurnPosition::Second));
                tracing::debug!(game_id, name, "second player joined");
                self.broadcast(PushEvent::new(PushKind::GameStart, game_id));
                (game_id, RegisterResponse::GAME_STARTED)
            },
            None => {
                let game_id = self.next_game_id;
                self.next_game_id += 1;
                let word = self.pick_word();
                self.games.insert(game_id, SimGame::new(word, player));
                self.seats.insert(token.clone(), (game_id, TurnPosition::First));
                tracing::debug!(game_id, name, "game opened");
                (game_id, RegisterResponse::AWAITING_OPPONENT)
            },
        };

        RegisterResponse { result, game_id, token: Some(token) }
    }

    /// Status of `token`. Unknown or absent tokens are unregistered.
    pub fn status(&self, token: Option<&SessionToken>) -> SessionStatus {
        self.seat(token)
            .ok()
            .and_then(|(game_id, _)| self.games.get(&game_id))
            .map_or(SessionStatus::Unregistered, SimGame::status)
    }

    /// Score a guess.
    ///
    /// The turn passes to the opponent whatever the letter. A letter event is
    /// pushed while the game continues, `solved` or `lost` when it ends.
    pub fn guess(&mut self, token: &SessionToken, letter: char) -> Result<GuessOutcome, SimError> {
        let (game_id, position) = self.seat(Some(token))?;
        let semantics = self.config.push_player;
        let game = self.games.get_mut(&game_id).ok_or(SimError::UnknownToken)?;

        if game.stage != Stage::Running {
            return Err(SimError::GameNotRunning(game_id));
        }
        if game.current != position {
            return Ok(GuessOutcome::NotYourTurn);
        }
        let letter = normalize_letter(letter)
            .ok_or_else(|| SimError::BadRequest(format!("{letter:?} is not a letter")))?;

        let next = position.other();
        game.current = next;
        game.guessed.insert(letter);
        let attributed = match semantics {
            PushPlayerSemantics::ActingPlayer => position,
            PushPlayerSemantics::NextPlayer => next,
        };

        let hit = game.word.contains(letter);
        let (outcome, event) = if game.solved() {
            game.stage = Stage::Done { won: true };
            (GuessOutcome::Won, PushEvent::new(PushKind::Solved, game_id))
        } else if hit {
            (GuessOutcome::Correct, PushEvent::letter(PushKind::LetterCorrect, game_id, attributed))
        } else {
            game.lives = game.lives.saturating_sub(1);
            if game.lives == 0 {
                game.stage = Stage::Done { won: false };
                (GuessOutcome::Lost, PushEvent::new(PushKind::Lost, game_id))
            } else {
                let event = PushEvent::letter(PushKind::LetterFalse, game_id, attributed);
                (GuessOutcome::Incorrect, event)
            }
        };

        tracing::debug!(game_id, %letter, ?outcome, "guess scored");
        self.broadcast(event);
        Ok(outcome)
    }

    /// Delete the game of `token` for both players.
    pub fn delete_game(&mut self, token: &SessionToken) -> Result<(), SimError> {
        let (game_id, _) = self.seat(Some(token))?;
        if let Some(game) = self.games.remove(&game_id) {
            for player in &game.players {
                self.seats.remove(&player.token);
            }
        }
        tracing::debug!(game_id, "game deleted");
        self.broadcast(PushEvent::new(PushKind::GameDeleted, game_id));
        Ok(())
    }

    /// Open a push channel for `game_id`. Any id is accepted.
    pub fn subscribe(&mut self, game_id: GameId) -> Subscription {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        self.subscribers.entry(game_id).or_default().push(tx);
        Subscription::new(rx)
    }

    /// Break every open channel of `game_id` with `reason`.
    pub fn drop_channels(&mut self, game_id: GameId, reason: &str) {
        for tx in self.subscribers.remove(&game_id).unwrap_or_default() {
            let _ = tx.try_send(ChannelItem::Lost(reason.to_string()));
        }
    }

    /// Open channels of `game_id` whose receiver is still alive.
    pub fn subscriber_count(&self, game_id: GameId) -> usize {
        self.subscribers
            .get(&game_id)
            .map_or(0, |subs| subs.iter().filter(|tx| !tx.is_closed()).count())
    }

    /// All push events broadcast so far.
    pub fn history(&self) -> &[PushEvent] {
        &self.history
    }

    /// Push events broadcast for `game_id`.
    pub fn events_for(&self, game_id: GameId) -> Vec<PushEvent> {
        self.history.iter().filter(|e| e.game_id == game_id).copied().collect()
    }

    /// Authoritative fields of `game_id`. `turn_owner` is set only while the
    /// game runs.
    pub fn snapshot(&self, game_id: GameId) -> Option<GameSnapshot> {
        let game = self.games.get(&game_id)?;
        Some(GameSnapshot {
            word_mask: game.mask(),
            lives_remaining: game.lives,
            guessed_letters: game.guessed.clone(),
            turn_owner: (game.stage == Stage::Running).then_some(game.current),
        })
    }

    /// Status of `game_id`. `None` once deleted.
    pub fn game_status(&self, game_id: GameId) -> Option<SessionStatus> {
        self.games.get(&game_id).map(SimGame::status)
    }

    /// Secret word of `game_id`.
    pub fn word_of(&self, game_id: GameId) -> Option<&str> {
        self.games.get(&game_id).map(|g| g.word.as_str())
    }

    /// Number of live games.
    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    fn seat(&self, token: Option<&SessionToken>) -> Result<(GameId, TurnPosition), SimError> {
        token.and_then(|t| self.seats.get(t.as_str())).copied().ok_or(SimError::UnknownToken)
    }

    fn name_active(&self, name: &str) -> bool {
        self.games
            .values()
            .filter(|g| !matches!(g.stage, Stage::Done { .. }))
            .any(|g| g.players.iter().any(|p| p.name == name))
    }

    fn issue_token(&mut self) -> String {
        let token = format!("sim-{:04}", self.next_token);
        self.next_token += 1;
        token
    }

    fn pick_word(&mut self) -> String {
        self.config
            .words
            .choose(&mut self.rng)
            .map_or_else(|| DEFAULT_WORDS[0].to_string(), |w| w.to_ascii_uppercase())
    }

    fn broadcast(&mut self, event: PushEvent) {
        self.history.push(event);
        let Some(subscribers) = self.subscribers.get_mut(&event.game_id) else {
            return;
        };
        subscribers.retain(|tx| match tx.try_send(ChannelItem::Event(event)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(game_id = event.game_id, "subscriber lagging, event dropped");
                true
            },
            Err(TrySendError::Closed(_)) => false,
        });
    }
}

fn rejection(result: u8) -> RegisterResponse {
    RegisterResponse { result, game_id: 0, token: None }
}

fn decode<T: serde::de::DeserializeOwned>(body: &serde_json::Value) -> Result<T, SimError> {
    serde_json::from_value(body.clone()).map_err(|e| SimError::BadRequest(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn server(word: &str) -> SimServer {
        SimServer::new(SimConfig::default().word(word))
    }

    fn token(response: &RegisterResponse) -> SessionToken {
        SessionToken::new(response.token.clone().unwrap()).unwrap()
    }

    fn started(word: &str) -> (SimServer, SessionToken, SessionToken) {
        let mut server = server(word);
        let first = token(&server.register("ada"));
        let second = token(&server.register("bob"));
        (server, first, second)
    }

    #[test]
    fn second_registration_starts_the_game() {
        let mut server = server("RUST");

        let first = server.register("ada");
        assert_eq!(first.result, RegisterResponse::AWAITING_OPPONENT);
        assert_eq!(server.status(Some(&token(&first))), SessionStatus::WaitingForOpponent);

        let second = server.register("bob");
        assert_eq!(second.result, RegisterResponse::GAME_STARTED);
        assert_eq!(second.game_id, first.game_id);
        assert_eq!(server.history(), &[PushEvent::new(PushKind::GameStart, first.game_id)]);
        assert_eq!(server.status(Some(&token(&first))), SessionStatus::InProgress);
    }

    #[test]
    fn empty_and_active_names_are_refused() {
        let mut server = server("RUST");
        assert_eq!(server.register("  ").result, RegisterResponse::INVALID_NAME);

        let _ = server.register("ada");
        let again = server.register("ada");
        assert_eq!(again.result, RegisterResponse::NAME_TAKEN);
        assert_eq!(again.token, None);
    }

    #[test]
    fn out_of_turn_guess_changes_nothing() {
        let (mut server, _, second) = started("RUST");

        assert_eq!(server.guess(&second, 'r').unwrap(), GuessOutcome::NotYourTurn);
        assert_eq!(server.history().len(), 1);
        assert!(server.snapshot(1).unwrap().guessed_letters.is_empty());
    }

    #[test]
    fn letter_events_name_the_next_player_by_default() {
        let (mut server, first, _) = started("RUST");

        assert_eq!(server.guess(&first, 'r').unwrap(), GuessOutcome::Correct);
        assert_eq!(
            server.history().last(),
            Some(&PushEvent::letter(PushKind::LetterCorrect, 1, TurnPosition::Second))
        );
        assert_eq!(server.query(Endpoint::WordMask, Some(&first)).unwrap(), "R _ _ _");
        assert_eq!(server.query(Endpoint::IsPlayersTurn, Some(&first)).unwrap(), "false");
    }

    #[test]
    fn acting_player_attribution_is_configurable() {
        let mut server = SimServer::new(
            SimConfig::default().word("RUST").push_player(PushPlayerSemantics::ActingPlayer),
        );
        let first = token(&server.register("ada"));
        let _ = server.register("bob");

        assert_eq!(server.guess(&first, 'x').unwrap(), GuessOutcome::Incorrect);
        assert_eq!(
            server.history().last(),
            Some(&PushEvent::letter(PushKind::LetterFalse, 1, TurnPosition::First))
        );
        assert_eq!(server.query(Endpoint::Lives, Some(&first)).unwrap(), "9");
    }

    #[test]
    fn completing_the_word_wins_without_losing_a_life() {
        let (mut server, first, second) = started("AB");

        assert_eq!(server.guess(&first, 'a').unwrap(), GuessOutcome::Correct);
        assert_eq!(server.guess(&second, 'b').unwrap(), GuessOutcome::Won);
        assert_eq!(server.status(Some(&first)), SessionStatus::Won);
        assert_eq!(server.query(Endpoint::Lives, Some(&first)).unwrap(), "10");
        assert_eq!(server.query(Endpoint::Word, Some(&second)).unwrap(), "AB");
        assert_eq!(server.guess(&first, 'c'), Err(SimError::GameNotRunning(1)));
    }

    #[test]
    fn last_life_loses() {
        let (mut server, first, second) = started("Q");
        let players = [&first, &second];
        let misses = "ABCDEFGHIJ";

        let outcomes: Vec<_> = misses
            .chars()
            .enumerate()
            .map(|(i, c)| server.guess(players[i % 2], c).unwrap())
            .collect();

        assert_eq!(outcomes.last(), Some(&GuessOutcome::Lost));
        assert!(outcomes[..9].iter().all(|o| *o == GuessOutcome::Incorrect));
        assert_eq!(server.status(Some(&first)), SessionStatus::Lost);
        assert_eq!(server.history().last(), Some(&PushEvent::new(PushKind::Lost, 1)));
    }

    #[test]
    fn word_is_hidden_until_the_end() {
        let (mut server, first, _) = started("RUST");
        assert_eq!(server.query(Endpoint::Word, Some(&first)).unwrap(), WORD_NOT_AVAILABLE);
    }

    #[test]
    fn teammates_lists_the_other_player() {
        let (mut server, first, second) = started("RUST");
        assert_eq!(server.query(Endpoint::Teammate, Some(&first)).unwrap(), "bob");
        assert_eq!(server.query(Endpoint::Teammate, Some(&second)).unwrap(), "ada");
    }

    #[test]
    fn deletion_unregisters_both_players_and_pushes() {
        let (mut server, first, second) = started("RUST");
        let mut channel = server.subscribe(1);

        let body = server.submit(Endpoint::DeleteGame, Some(&second), &serde_json::json!({}));
        assert_eq!(body.unwrap(), GAME_DELETED);

        assert_eq!(server.status(Some(&first)), SessionStatus::Unregistered);
        assert_eq!(server.game_count(), 0);
        assert_eq!(
            channel.events.try_recv().unwrap(),
            ChannelItem::Event(PushEvent::new(PushKind::GameDeleted, 1))
        );
    }

    #[test]
    fn submit_bodies_decode_like_the_wire() {
        let mut server = server("RUST");
        let body = server
            .submit(Endpoint::Register, None, &serde_json::json!({ "username": "ada" }))
            .unwrap();
        let response: RegisterResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(response.result, RegisterResponse::AWAITING_OPPONENT);

        let garbage = server.submit(Endpoint::Guess, None, &serde_json::json!({ "nope": 1 }));
        assert!(matches!(garbage, Err(SimError::BadRequest(_))));
        assert!(matches!(
            server.query(Endpoint::Guess, None),
            Err(SimError::WrongMethod { method: "query", .. })
        ));
    }

    #[test]
    fn word_choice_is_seeded() {
        let pick = |seed| {
            let mut server = SimServer::new(SimConfig::with_seed(seed));
            let _ = server.register("ada");
            server.word_of(1).unwrap().to_string()
        };
        assert_eq!(pick(7), pick(7));
    }

    #[test]
    fn dropped_channels_report_loss() {
        let mut server = server("RUST");
        let mut channel = server.subscribe(3);
        server.drop_channels(3, "reset by peer");

        assert_eq!(channel.events.try_recv().unwrap(), ChannelItem::Lost("reset by peer".into()));
        assert_eq!(server.subscriber_count(3), 0);
    }
}
