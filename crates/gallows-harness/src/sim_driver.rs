//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as `TerminalDriver` but for
//! deterministic testing. It implements [`Driver`] so the same
//! [`gallows_app::Runtime`] orchestration code runs in both production and
//! simulation. Lines are scripted through a [`SimHandle`]; every render is
//! published so the test can wait for the screen it expects.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use gallows_app::{App, Driver, UserInput};
use gallows_proto::GameId;
use tokio::sync::{mpsc, watch};

use crate::invariants::{ClientSnapshot, InvariantRegistry, SystemSnapshot};

/// How long [`SimHandle::wait_for`] waits for a matching render.
const RENDER_TIMEOUT: Duration = Duration::from_secs(5);

/// Error type for simulation driver.
#[derive(Debug, Clone)]
pub struct SimDriverError(pub String);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

/// State shared between the driver and its handle.
#[derive(Default)]
struct SharedState {
    renders: usize,
    stopped: bool,
    /// Game the snapshot belongs to.
    game: Option<GameId>,
    snapshot: ClientSnapshot,
}

/// Simulation driver for deterministic testing.
///
/// Implements [`Driver`] trait so the same [`gallows_app::Runtime`]
/// orchestration code runs in both the terminal frontend and simulation
/// tests.
pub struct SimDriver {
    inputs: mpsc::UnboundedReceiver<UserInput>,
    renders: watch::Sender<App>,
    state: Arc<Mutex<SharedState>>,
    invariants: Option<InvariantRegistry>,
}

/// Test-side end of a [`SimDriver`].
pub struct SimHandle {
    inputs: Option<mpsc::UnboundedSender<UserInput>>,
    renders: watch::Receiver<App>,
    state: Arc<Mutex<SharedState>>,
}

impl SimDriver {
    /// Create a driver and the handle that scripts it.
    pub fn new() -> (Self, SimHandle) {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (render_tx, render_rx) = watch::channel(App::new());
        let state = Arc::new(Mutex::new(SharedState::default()));

        let driver =
            Self { inputs: input_rx, renders: render_tx, state: state.clone(), invariants: None };
        let handle = SimHandle { inputs: Some(input_tx), renders: render_rx, state };
        (driver, handle)
    }

    /// Enable invariant checking on every render.
    ///
    /// A violation fails the render, which ends [`gallows_app::Runtime::run`]
    /// with an error.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(registry);
        self
    }

    fn check_invariants(&self, app: &App) -> Result<(), SimDriverError> {
        let mut state = lock(&self.state);
        let Some(view) = app.view() else {
            return Ok(());
        };
        if state.game != Some(view.game_id) {
            state.game = Some(view.game_id);
            state.snapshot = ClientSnapshot::new(0);
        }
        state.snapshot.record_view(view);

        let Some(registry) = &self.invariants else {
            return Ok(());
        };
        registry.check_all(&SystemSnapshot::single(state.snapshot.clone())).map_err(|violations| {
            let messages: Vec<String> = violations.iter().map(ToString::to_string).collect();
            SimDriverError(messages.join("; "))
        })
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;

    async fn poll_input(&mut self) -> Result<Option<UserInput>, Self::Error> {
        Ok(self.inputs.recv().await)
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        self.check_invariants(app)?;
        lock(&self.state).renders += 1;
        self.renders.send_replace(app.clone());
        Ok(())
    }

    fn stop(&mut self) {
        lock(&self.state).stopped = true;
    }
}

impl SimHandle {
    /// Type one line. Blank lines are ignored, as a terminal would.
    pub fn type_line(&self, line: &str) -> Result<(), SimDriverError> {
        let Some(input) = UserInput::parse(line) else {
            return Ok(());
        };
        let sender =
            self.inputs.as_ref().ok_or_else(|| SimDriverError("input closed".to_string()))?;
        sender.send(input).map_err(|_| SimDriverError("driver dropped".to_string()))
    }

    /// Close input, which ends the run.
    pub fn close(&mut self) {
        self.inputs = None;
    }

    /// Wait until a render satisfies `predicate` and return that frame.
    pub async fn wait_for(
        &mut self,
        mut predicate: impl FnMut(&App) -> bool,
    ) -> Result<App, SimDriverError> {
        let waited =
            tokio::time::timeout(RENDER_TIMEOUT, self.renders.wait_for(|app| predicate(app)))
                .await
                .map(|received| received.map(|app| app.clone()));
        match waited {
            Ok(Ok(app)) => Ok(app),
            Ok(Err(_)) => Err(SimDriverError("driver dropped".to_string())),
            Err(_) => Err(SimDriverError(format!(
                "no matching render within {RENDER_TIMEOUT:?}, last status {:?}",
                self.latest().status_message()
            ))),
        }
    }

    /// Most recent render.
    pub fn latest(&self) -> App {
        self.renders.borrow().clone()
    }

    /// Number of renders so far.
    pub fn render_count(&self) -> usize {
        lock(&self.state).renders
    }

    /// Whether the runtime released the driver.
    pub fn stopped(&self) -> bool {
        lock(&self.state).stopped
    }

    /// Observations of the current game, as recorded from renders.
    pub fn snapshot(&self) -> ClientSnapshot {
        lock(&self.state).snapshot.clone()
    }
}

fn lock(state: &Arc<Mutex<SharedState>>) -> MutexGuard<'_, SharedState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gallows_app::{AppEvent, GameView, Mode};
    use gallows_client::{Phase, TurnPosition};

    use super::*;

    fn view(phase: Phase) -> GameView {
        GameView {
            game_id: 3,
            turn_position: TurnPosition::First,
            phase: Some(phase),
            word_mask: "_ _".into(),
            lives_remaining: Some(10),
            guessed_letters: Default::default(),
            turn_owner: None,
            revealed_word: None,
            teammate: None,
            live: true,
        }
    }

    #[tokio::test]
    async fn typed_lines_reach_poll_input() {
        let (mut driver, mut handle) = SimDriver::new();
        handle.type_line("  ").unwrap();
        handle.type_line("/refresh").unwrap();
        handle.close();

        assert_eq!(driver.poll_input().await.unwrap(), Some(UserInput::Refresh));
        assert_eq!(driver.poll_input().await.unwrap(), None);
    }

    #[tokio::test]
    async fn wait_for_sees_published_render() {
        let (mut driver, mut handle) = SimDriver::new();
        let mut app = App::new();
        let _ = app.handle(AppEvent::NeedName { reason: None });
        driver.render(&app).unwrap();

        let seen = handle.wait_for(|app| app.mode() == Mode::NamePrompt).await.unwrap();
        assert_eq!(seen.mode(), Mode::NamePrompt);
        assert_eq!(handle.render_count(), 1);
    }

    #[test]
    fn phase_regression_fails_the_render() {
        let (driver, _handle) = SimDriver::new();
        let mut driver = driver.with_invariants(InvariantRegistry::standard());
        let mut app = App::new();

        let _ = app.handle(AppEvent::GameUpdated(view(Phase::InProgress)));
        driver.render(&app).unwrap();
        let _ = app.handle(AppEvent::GameUpdated(view(Phase::AwaitingOpponent)));

        assert!(driver.render(&app).is_err());
    }

    #[test]
    fn stop_is_visible_to_the_handle() {
        let (mut driver, handle) = SimDriver::new();
        driver.stop();
        assert!(handle.stopped());
    }
}
