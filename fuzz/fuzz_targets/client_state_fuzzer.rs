//! Fuzz target for the client state machine
//!
//! Feeds arbitrary sequences of pushes, query responses and guesses into a
//! [`Client`] and checks that the local view only ever moves forward.
//!
//! # Strategy
//!
//! - Random restore status, including an unknown session
//! - Pushes of every kind, for our game and for other games
//! - Responses tagged with tickets the client issued, or with made-up ones
//! - Guesses with arbitrary input, valid or not
//!
//! # Invariants
//!
//! - Phase never moves backwards
//! - Guessed letters are never forgotten
//! - Lives never go up once known
//! - A turn owner exists only while the game is in progress
//! - `can_submit` implies the game is in progress
//! - NEVER panic, whatever the event order

#![no_main]

use std::collections::BTreeSet;

use arbitrary::Arbitrary;
use gallows_client::{
    Client, ClientAction, ClientConfig, ClientEvent, GameState, Phase, PlayerSession,
    PushPlayerSemantics, SessionStatus, SessionToken, Ticket, TurnPosition,
};
use gallows_proto::{GameSnapshot, GuessOutcome, PushEvent, PushKind, WordMask};
use libfuzzer_sys::fuzz_target;

const GAME_ID: u64 = 7;

#[derive(Debug, Clone, Copy, Arbitrary)]
enum FuzzStatus {
    Unregistered,
    WaitingForOpponent,
    InProgress,
    Won,
    Lost,
}

impl From<FuzzStatus> for SessionStatus {
    fn from(status: FuzzStatus) -> Self {
        match status {
            FuzzStatus::Unregistered => Self::Unregistered,
            FuzzStatus::WaitingForOpponent => Self::WaitingForOpponent,
            FuzzStatus::InProgress => Self::InProgress,
            FuzzStatus::Won => Self::Won,
            FuzzStatus::Lost => Self::Lost,
        }
    }
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum FuzzKind {
    GameStart,
    LetterCorrect,
    LetterFalse,
    Solved,
    Lost,
    GameDeleted,
}

impl From<FuzzKind> for PushKind {
    fn from(kind: FuzzKind) -> Self {
        match kind {
            FuzzKind::GameStart => Self::GameStart,
            FuzzKind::LetterCorrect => Self::LetterCorrect,
            FuzzKind::LetterFalse => Self::LetterFalse,
            FuzzKind::Solved => Self::Solved,
            FuzzKind::Lost => Self::Lost,
            FuzzKind::GameDeleted => Self::GameDeleted,
        }
    }
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum FuzzOutcome {
    Won,
    Correct,
    Incorrect,
    Lost,
    NotYourTurn,
}

impl From<FuzzOutcome> for GuessOutcome {
    fn from(outcome: FuzzOutcome) -> Self {
        match outcome {
            FuzzOutcome::Won => Self::Won,
            FuzzOutcome::Correct => Self::Correct,
            FuzzOutcome::Incorrect => Self::Incorrect,
            FuzzOutcome::Lost => Self::Lost,
            FuzzOutcome::NotYourTurn => Self::NotYourTurn,
        }
    }
}

/// Which ticket a response carries.
#[derive(Debug, Clone, Copy, Arbitrary)]
enum TicketChoice {
    /// One the client issued, picked by index.
    Issued(u8),
    /// Made up.
    Forged { generation: u8, seq: u8 },
}

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    Push { kind: FuzzKind, other_game: bool, player: Option<bool> },
    ChannelLost,
    Snapshot {
        ticket: TicketChoice,
        mask: Vec<Option<u8>>,
        lives: u8,
        letters: Vec<u8>,
        owner: Option<bool>,
    },
    RevealedWord { ticket: TicketChoice, word: String },
    Teammate { ticket: TicketChoice, name: String },
    Status { ticket: TicketChoice, status: FuzzStatus },
    Submit { input: String },
    Resolved { ticket: TicketChoice, outcome: FuzzOutcome },
    Failed { ticket: TicketChoice },
    Refresh,
}

#[derive(Debug, Clone, Arbitrary)]
struct Scenario {
    second_player: bool,
    next_player_semantics: bool,
    status: FuzzStatus,
    ops: Vec<Op>,
}

fn position(second: bool) -> TurnPosition {
    if second { TurnPosition::Second } else { TurnPosition::First }
}

fn letter(byte: u8) -> char {
    char::from(b'A' + byte % 26)
}

fn pick(issued: &[Ticket], choice: TicketChoice) -> Ticket {
    match choice {
        TicketChoice::Issued(index) if !issued.is_empty() => {
            issued[usize::from(index) % issued.len()]
        },
        TicketChoice::Issued(_) => Ticket { generation: 0, seq: 0 },
        TicketChoice::Forged { generation, seq } => {
            Ticket { generation: u64::from(generation), seq: u64::from(seq) }
        },
    }
}

fn event(op: Op, issued: &[Ticket]) -> ClientEvent {
    match op {
        Op::Push { kind, other_game, player } => {
            let game_id = if other_game { GAME_ID + 1 } else { GAME_ID };
            ClientEvent::PushReceived(PushEvent {
                kind: kind.into(),
                game_id,
                player: player.map(position),
            })
        },
        Op::ChannelLost => ClientEvent::ChannelLost { reason: "fuzz".into() },
        Op::Snapshot { ticket, mask, lives, letters, owner } => ClientEvent::SnapshotReceived {
            ticket: pick(issued, ticket),
            snapshot: GameSnapshot {
                word_mask: WordMask::from_slots(
                    mask.into_iter().map(|slot| slot.map(letter)).collect(),
                ),
                lives_remaining: u32::from(lives % 11),
                guessed_letters: letters.into_iter().map(letter).collect(),
                turn_owner: owner.map(position),
            },
        },
        Op::RevealedWord { ticket, word } => {
            ClientEvent::RevealedWordReceived { ticket: pick(issued, ticket), word }
        },
        Op::Teammate { ticket, name } => {
            ClientEvent::TeammateReceived { ticket: pick(issued, ticket), name }
        },
        Op::Status { ticket, status } => {
            ClientEvent::StatusReceived { ticket: pick(issued, ticket), status: status.into() }
        },
        Op::Submit { input } => ClientEvent::SubmitGuess { input },
        Op::Resolved { ticket, outcome } => {
            ClientEvent::GuessResolved { ticket: pick(issued, ticket), outcome: outcome.into() }
        },
        Op::Failed { ticket } => {
            ClientEvent::GuessFailed { ticket: pick(issued, ticket), reason: "fuzz".into() }
        },
        Op::Refresh => ClientEvent::Refresh,
    }
}

fn collect_tickets(actions: &[ClientAction], issued: &mut Vec<Ticket>) {
    for action in actions {
        match action {
            ClientAction::FetchSnapshot { ticket }
            | ClientAction::FetchRevealedWord { ticket }
            | ClientAction::FetchTeammate { ticket }
            | ClientAction::FetchStatus { ticket }
            | ClientAction::SendGuess { ticket, .. } => issued.push(*ticket),
            _ => {},
        }
    }
}

fn check_step(before: &GameState, after: &GameState, client: &Client) {
    match (before.phase(), after.phase()) {
        (Some(old), Some(new)) => {
            assert!(old == new || old.can_advance_to(new), "phase went {old:?} -> {new:?}");
        },
        (Some(old), None) => panic!("phase {old:?} was forgotten"),
        (None, _) => {},
    }

    let letters: &BTreeSet<char> = after.guessed_letters();
    assert!(letters.is_superset(before.guessed_letters()), "guessed letters shrank");

    if let Some(old) = before.lives_remaining() {
        let new = after.lives_remaining().expect("known lives stay known");
        assert!(new <= old, "lives went up from {old} to {new}");
    }

    if after.turn_owner().is_some() {
        assert_eq!(after.phase(), Some(Phase::InProgress), "turn owner outside a running game");
    }
    if client.can_submit() {
        assert_eq!(after.phase(), Some(Phase::InProgress));
    }
}

fuzz_target!(|scenario: Scenario| {
    let token = SessionToken::new("fuzz-token").expect("valid token");
    let session = PlayerSession::new(token, GAME_ID, position(scenario.second_player));
    let push_player = if scenario.next_player_semantics {
        PushPlayerSemantics::NextPlayer
    } else {
        PushPlayerSemantics::ActingPlayer
    };
    let mut client = Client::new(session, ClientConfig { push_player });

    let mut issued = Vec::new();
    if let Ok(actions) = client.handle(ClientEvent::Restored { status: scenario.status.into() }) {
        collect_tickets(&actions, &mut issued);
    }

    for op in scenario.ops {
        let before = client.state().clone();
        let generation = client.generation();

        if let Ok(actions) = client.handle(event(op, &issued)) {
            collect_tickets(&actions, &mut issued);
        }

        assert!(client.generation() >= generation, "generation went backwards");
        check_step(&before, client.state(), &client);
    }
});
