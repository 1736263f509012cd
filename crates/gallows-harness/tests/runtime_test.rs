//! End-to-end tests of the production runtime.
//!
//! The real [`Runtime`] runs against [`SimTransport`] and [`SimDriver`]; the
//! test types lines and waits for renders the way a user at a terminal would.
//! Invariants are checked on every render.

#![allow(clippy::unwrap_used)]

use gallows_app::{App, MemoryTokenStore, Mode, Runtime, SessionRecord};
use gallows_client::{ClientConfig, Endpoint, GameApi, Phase, SessionStatus};
use gallows_harness::{
    InvariantRegistry, SimConfig, SimDriver, SimHandle, SimTransport, create_shared_server,
};
use gallows_proto::{RegistrationReply, SessionToken, TurnPosition};

type SimRuntime = Runtime<SimTransport, MemoryTokenStore, SimDriver>;

fn transport(word: &str) -> SimTransport {
    SimTransport::new(create_shared_server(SimConfig::default().word(word)))
}

fn runtime(
    transport: &SimTransport,
    store: MemoryTokenStore,
    name: Option<&str>,
) -> (SimRuntime, SimHandle) {
    let (driver, handle) = SimDriver::new();
    let driver = driver.with_invariants(InvariantRegistry::standard());
    let runtime = Runtime::new(driver, transport.clone(), store, ClientConfig::default());
    let runtime = match name {
        Some(name) => runtime.with_name(name),
        None => runtime,
    };
    (runtime, handle)
}

fn in_phase(app: &App, phase: Phase) -> bool {
    app.view().is_some_and(|view| view.phase == Some(phase))
}

/// Our turn, input unlocked, and `guessed` letters already on screen.
fn ready_to_guess(app: &App, guessed: usize) -> bool {
    !app.input_locked()
        && app.view().is_some_and(|view| view.our_turn() && view.guessed_letters.len() == guessed)
}

fn revealed(app: &App) -> bool {
    app.view().is_some_and(|view| view.revealed_word.is_some())
}

async fn register(api: &GameApi<SimTransport>, name: &str) -> SessionRecord {
    match api.register(name).await.unwrap() {
        RegistrationReply::Accepted(registration) => SessionRecord {
            token: registration.token,
            game_id: registration.game_id,
            turn_position: registration.turn_position,
        },
        RegistrationReply::Rejected(rejection) => panic!("{name} rejected: {rejection:?}"),
    }
}

#[tokio::test]
async fn two_runtimes_play_a_game_to_the_end() {
    let transport = transport("HELLO");
    let (ada, mut ada_ui) = runtime(&transport, MemoryTokenStore::new(), Some("ada"));
    let (bob, mut bob_ui) = runtime(&transport, MemoryTokenStore::new(), None);

    let script = async {
        ada_ui.wait_for(|app| in_phase(app, Phase::AwaitingOpponent)).await.unwrap();
        bob_ui.wait_for(|app| app.mode() == Mode::NamePrompt).await.unwrap();
        bob_ui.type_line("bob").unwrap();

        for (turn, letter) in ["h", "e", "l", "o"].into_iter().enumerate() {
            let ui = if turn % 2 == 0 { &mut ada_ui } else { &mut bob_ui };
            ui.wait_for(|app| ready_to_guess(app, turn)).await.unwrap();
            ui.type_line(letter).unwrap();
        }

        let ada_end = ada_ui.wait_for(revealed).await.unwrap();
        let bob_end = bob_ui.wait_for(revealed).await.unwrap();
        ada_ui.close();
        bob_ui.close();
        (ada_end, bob_end)
    };

    let (ada_result, bob_result, (ada_end, bob_end)) = tokio::join!(ada.run(), bob.run(), script);
    ada_result.unwrap();
    bob_result.unwrap();

    for app in [&ada_end, &bob_end] {
        let view = app.view().unwrap();
        assert_eq!(view.phase, Some(Phase::Won));
        assert_eq!(view.revealed_word.as_deref(), Some("HELLO"));
        assert_eq!(view.word_mask, "H E L L O");
        assert!(!view.our_turn());
        assert!(!view.live);
    }
    assert_eq!(ada_end.view().unwrap().teammate.as_deref(), Some("bob"));
    assert_eq!(bob_end.view().unwrap().turn_position, TurnPosition::Second);
    assert!(ada_ui.stopped() && bob_ui.stopped());
    assert_eq!(transport.count(Endpoint::Guess), 4);
}

#[tokio::test]
async fn persisted_token_resumes_mid_game() {
    let transport = transport("HELLO");
    let api = GameApi::new(transport.clone());
    let ada = register(&api, "ada").await;
    let bob = register(&api, "bob").await;
    api.guess(&ada.token, 'h').await.unwrap();

    let (runtime, mut ui) = runtime(&transport, MemoryTokenStore::with_record(bob), None);
    let script = async {
        let app = ui
            .wait_for(|app| {
                ready_to_guess(app, 1) && app.view().is_some_and(|v| v.teammate.is_some())
            })
            .await
            .unwrap();
        ui.close();
        app
    };
    let (result, app) = tokio::join!(runtime.run(), script);
    result.unwrap();

    let view = app.view().unwrap();
    assert_eq!(app.mode(), Mode::InGame);
    assert_eq!(view.word_mask, "H _ _ _ _");
    assert_eq!(view.lives_remaining, Some(10));
    assert_eq!(view.teammate.as_deref(), Some("ada"));
    assert_eq!(transport.count(Endpoint::Register), 2);
}

#[tokio::test]
async fn unknown_token_falls_back_to_registration() {
    let transport = transport("HELLO");
    let stale = SessionRecord {
        token: SessionToken::new("sim-9999").unwrap(),
        game_id: 5,
        turn_position: TurnPosition::First,
    };
    let (runtime, mut ui) = runtime(&transport, MemoryTokenStore::with_record(stale), Some("ada"));

    let script = async {
        let app = ui.wait_for(|app| in_phase(app, Phase::AwaitingOpponent)).await.unwrap();
        ui.close();
        app
    };
    let (result, app) = tokio::join!(runtime.run(), script);
    result.unwrap();

    assert_eq!(app.view().unwrap().game_id, 1);
    let calls = transport.calls();
    assert_eq!(calls[0].endpoint, Endpoint::Status);
    assert_eq!(calls[0].token.as_deref(), Some("sim-9999"));
    assert_eq!(calls[1].endpoint, Endpoint::Register);
}

#[tokio::test]
async fn guessing_before_the_opponent_arrives_is_refused() {
    let transport = transport("HELLO");
    let (runtime, mut ui) = runtime(&transport, MemoryTokenStore::new(), None);

    let script = async {
        ui.wait_for(|app| app.mode() == Mode::NamePrompt).await.unwrap();
        ui.type_line("   ").unwrap();
        ui.type_line("ada").unwrap();
        ui.wait_for(|app| in_phase(app, Phase::AwaitingOpponent)).await.unwrap();

        ui.type_line("e").unwrap();
        let app = ui
            .wait_for(|app| {
                app.status_message().is_some_and(|m| m.starts_with("Error: game is not running"))
            })
            .await
            .unwrap();
        ui.type_line("/quit").unwrap();
        app
    };
    let (result, app) = tokio::join!(runtime.run(), script);
    result.unwrap();

    assert!(!app.input_locked());
    assert!(ui.stopped());
    assert_eq!(transport.count(Endpoint::Guess), 0);
}

#[tokio::test]
async fn reset_deletes_the_game_for_both_players() {
    let transport = transport("HELLO");
    let api = GameApi::new(transport.clone());
    let (runtime, mut ui) = runtime(&transport, MemoryTokenStore::new(), Some("ada"));

    let script = async {
        ui.wait_for(|app| in_phase(app, Phase::AwaitingOpponent)).await.unwrap();
        let bob = register(&api, "bob").await;
        ui.wait_for(|app| in_phase(app, Phase::InProgress)).await.unwrap();

        ui.type_line("/reset").unwrap();
        let app = ui.wait_for(|app| app.mode() == Mode::NamePrompt).await.unwrap();
        ui.close();
        (app, bob)
    };
    let (result, (app, bob)) = tokio::join!(runtime.run(), script);
    result.unwrap();

    assert!(app.view().is_none());
    assert_eq!(
        app.status_message(),
        Some("The game was deleted. Enter a display name to play again")
    );
    assert_eq!(transport.lock_server().game_count(), 0);
    assert_eq!(api.status(&bob.token).await.unwrap(), SessionStatus::Unregistered);
}
