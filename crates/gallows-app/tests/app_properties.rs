//! Property-based tests for the App state machine.
//!
//! Tests verify that invariants hold under arbitrary event sequences.
//! The App and Bridge run against an in-process server, answered
//! synchronously, while an opponent guesses between our inputs and push
//! events are sometimes lost.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;

use gallows_app::{App, AppAction, AppEvent, Bridge, GameView, Mode, UserInput};
use gallows_client::{
    ChannelItem, ClientAction, ClientConfig, ClientEvent, Endpoint, PlayerSession,
    PushPlayerSemantics, SessionStatus, SessionToken, TurnPosition,
};
use gallows_harness::{
    ClientSnapshot, InvariantRegistry, ServerSnapshot, SimConfig, SimServer, SystemSnapshot,
};
use gallows_proto::{GameId, GameSnapshot, Registration, RegistrationReply, parse_letters};
use proptest::prelude::*;

const WORD: &str = "HANGMAN";

#[derive(Debug, Clone)]
enum Step {
    Type(String),
    OpponentGuess(char),
    DropPushes(bool),
}

fn letter() -> impl Strategy<Value = char> {
    prop::char::range('a', 'z')
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => letter().prop_map(|c| Step::Type(c.to_string())),
        1 => prop_oneof![Just("/refresh"), Just("/help"), Just("7"), Just("ab"), Just("  ")]
            .prop_map(|line| Step::Type(line.to_string())),
        3 => letter().prop_map(Step::OpponentGuess),
        1 => any::<bool>().prop_map(Step::DropPushes),
    ]
}

fn accept(reply: gallows_proto::RegisterResponse) -> Registration {
    match RegistrationReply::try_from(reply).unwrap() {
        RegistrationReply::Accepted(registration) => registration,
        RegistrationReply::Rejected(rejection) => panic!("rejected: {rejection:?}"),
    }
}

/// One player's App and Bridge wired to a server, with the opponent played
/// directly against the server.
struct Rig {
    app: App,
    bridge: Bridge,
    server: SimServer,
    game_id: GameId,
    ours: SessionToken,
    opponent: SessionToken,
    subscribed: bool,
    delivered: usize,
    drop_pushes: bool,
    snapshot: ClientSnapshot,
}

impl Rig {
    fn new() -> Self {
        let mut server = SimServer::new(SimConfig::default().word(WORD));
        let ours = accept(server.register("ada"));
        let opponent = accept(server.register("bob"));
        let config = ClientConfig { push_player: PushPlayerSemantics::NextPlayer };

        let mut rig = Self {
            app: App::new(),
            game_id: ours.game_id,
            ours: ours.token.clone(),
            opponent: opponent.token,
            bridge: Bridge::new(PlayerSession::from(ours), config),
            delivered: server.history().len(),
            server,
            subscribed: false,
            drop_pushes: false,
            snapshot: ClientSnapshot::new(0),
        };
        let events = rig.bridge.restore(SessionStatus::InProgress);
        rig.apply(events);
        rig
    }

    fn run(&mut self, step: Step) {
        match step {
            Step::Type(line) => {
                if let Some(input) = UserInput::parse(&line) {
                    self.apply(vec![AppEvent::Input(input)]);
                }
            },
            Step::OpponentGuess(letter) => {
                let _ = self.server.guess(&self.opponent, letter);
            },
            Step::DropPushes(drop) => self.drop_pushes = drop,
        }
        self.deliver();
    }

    /// Feed events to the App, route its actions through the Bridge and
    /// answer every request the client makes.
    fn apply(&mut self, events: Vec<AppEvent>) {
        let mut queue = VecDeque::from(events);
        while let Some(event) = queue.pop_front() {
            for action in self.app.handle(event) {
                assert_ne!(action, AppAction::Quit);
                queue.extend(self.bridge.process_app_action(action));
            }
            queue.extend(self.answer());
            if let Some(view) = self.app.view() {
                self.snapshot.record_view(view);
            }
        }
    }

    fn answer(&mut self) -> Vec<AppEvent> {
        let mut events = Vec::new();
        loop {
            let outgoing = self.bridge.take_outgoing();
            if outgoing.is_empty() {
                return events;
            }
            for action in outgoing {
                if let Some(event) = self.execute(action) {
                    events.extend(self.bridge.handle(event));
                }
            }
        }
    }

    fn execute(&mut self, action: ClientAction) -> Option<ClientEvent> {
        let token = self.ours.clone();
        match action {
            ClientAction::Subscribe { .. } => {
                self.subscribed = true;
                None
            },
            ClientAction::CloseChannel => {
                self.subscribed = false;
                None
            },
            ClientAction::FetchSnapshot { ticket } => {
                let snapshot = self.read_snapshot(&token)?;
                Some(ClientEvent::SnapshotReceived { ticket, snapshot })
            },
            ClientAction::FetchStatus { ticket } => {
                let status = self.server.query(Endpoint::Status, Some(&token)).ok()?.parse().ok()?;
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
                Some(match self.server.guess(&token, letter) {
                    Ok(outcome) => ClientEvent::GuessResolved { ticket, outcome },
                    Err(e) => ClientEvent::GuessFailed { ticket, reason: e.to_string() },
                })
            },
            _ => None,
        }
    }

    fn read_snapshot(&mut self, token: &SessionToken) -> Option<GameSnapshot> {
        let mut read = |endpoint| self.server.query(endpoint, Some(token)).ok();
        let mask = read(Endpoint::WordMask)?;
        let lives = read(Endpoint::Lives)?;
        let letters = read(Endpoint::GuessedLetters)?;
        let turn = read(Endpoint::IsPlayersTurn)?;

        Some(GameSnapshot {
            word_mask: mask.parse().ok()?,
            lives_remaining: GameSnapshot::parse_lives(&lives).ok()?,
            guessed_letters: parse_letters(&letters).ok()?,
            turn_owner: Some(GameSnapshot::parse_turn(&turn, TurnPosition::First).ok()?),
        })
    }

    /// Hand new server events to our channel, unless it is closed or
    /// dropping.
    fn deliver(&mut self) {
        while self.delivered < self.server.history().len() {
            let event = self.server.history()[self.delivered].clone();
            self.delivered += 1;
            if !self.subscribed || self.drop_pushes || event.game_id != self.game_id {
                continue;
            }
            let events = self.bridge.handle_push(ChannelItem::Event(event));
            self.apply(events);
        }
    }

    fn system(&self) -> SystemSnapshot {
        SystemSnapshot::single(self.snapshot.clone()).with_server(ServerSnapshot {
            game_id: self.game_id,
            status: self.server.game_status(self.game_id),
            game: self.server.snapshot(self.game_id),
        })
    }

    fn view(&self) -> &GameView {
        self.app.view().expect("in a game")
    }
}

/// Events the App may see in any order, without a client behind them.
fn event_strategy() -> impl Strategy<Value = AppEvent> {
    prop_oneof![
        3 => prop_oneof![
            letter().prop_map(|c| c.to_string()),
            Just("/refresh".to_string()),
            Just("/reset".to_string()),
        ]
        .prop_map(|line| AppEvent::Input(UserInput::parse(&line).unwrap())),
        1 => Just(AppEvent::NeedName { reason: None }),
        1 => Just(AppEvent::SessionStarted { game_id: 1, turn_position: TurnPosition::First }),
        1 => Just(AppEvent::SubmissionSettled),
        1 => any::<bool>().prop_map(|ours| AppEvent::TurnChanged { ours }),
        1 => Just(AppEvent::SessionEnded),
        1 => Just(AppEvent::RegistrationRequired),
        1 => Just(AppEvent::Error { message: "boom".into() }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Rendered views never regress, never claim more than the server knows,
    /// and never offer a guess outside a running game.
    #[test]
    fn prop_views_respect_invariants(steps in prop::collection::vec(step_strategy(), 0..60)) {
        let mut rig = Rig::new();
        let invariants = InvariantRegistry::standard();

        for step in steps {
            rig.run(step);

            let result = invariants.check_all(&rig.system());
            prop_assert!(result.is_ok(), "violations: {:?}", result.err());
            // every guess is answered before the step returns
            prop_assert!(!rig.app.input_locked());
            prop_assert_eq!(rig.app.mode(), Mode::InGame);
        }
    }

    /// Without lost pushes the screen ends up showing what the server holds.
    #[test]
    fn prop_lossless_views_converge(steps in prop::collection::vec(step_strategy(), 0..60)) {
        let mut rig = Rig::new();

        for step in steps {
            if !matches!(step, Step::DropPushes(_)) {
                rig.run(step);
            }
        }

        let result = InvariantRegistry::settled().check_all(&rig.system());
        prop_assert!(result.is_ok(), "violations: {:?}", result.err());
        prop_assert_eq!(rig.view().teammate.as_deref(), Some("bob"));
    }

    /// Guess input is only ever locked inside a game, and a lock is always
    /// paired with exactly one submitted guess.
    #[test]
    fn prop_input_lock_tracks_submissions(
        events in prop::collection::vec(event_strategy(), 0..80)
    ) {
        let mut app = App::new();

        for event in events {
            let was_locked = app.input_locked();
            let actions = app.handle(event);

            let submitted =
                actions.iter().filter(|a| matches!(a, AppAction::SubmitGuess { .. })).count();
            prop_assert!(submitted <= 1);
            if submitted == 1 {
                prop_assert!(!was_locked);
                prop_assert!(app.input_locked());
            }
            if app.input_locked() {
                prop_assert_eq!(app.mode(), Mode::InGame);
            }
            if app.mode() != Mode::InGame {
                prop_assert!(app.view().is_none());
            }
            prop_assert_eq!(actions.last(), Some(&AppAction::Render));
        }
    }
}

#[test]
fn restored_player_sees_the_running_game() {
    let rig = Rig::new();
    let view = rig.view();

    assert_eq!(view.word_mask, "_ _ _ _ _ _ _");
    assert_eq!(view.lives_remaining, Some(10));
    assert!(view.our_turn());
    assert!(view.live);
}

#[test]
fn opponent_guess_reaches_the_screen_through_the_push() {
    let mut rig = Rig::new();
    rig.run(Step::Type("n".into()));
    rig.run(Step::OpponentGuess('a'));

    let view = rig.view();
    assert_eq!(view.word_mask, "_ A N _ _ A N");
    assert!(view.our_turn());
    assert!(rig.app.status_message().is_some());
}

#[test]
fn dropped_push_leaves_the_screen_behind_until_refresh() {
    let mut rig = Rig::new();
    rig.run(Step::Type("n".into()));
    rig.run(Step::DropPushes(true));
    rig.run(Step::OpponentGuess('a'));
    assert_eq!(rig.view().word_mask, "_ _ N _ _ _ N");

    rig.run(Step::Type("/refresh".into()));
    assert_eq!(rig.view().word_mask, "_ A N _ _ A N");
    assert!(rig.view().our_turn());
}
