//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`App`]: UI state machine
//! - [`Bridge`]: protocol bridge to the client
//! - [`Driver`]: user-facing I/O
//! - [`GameApi`]: network I/O over a [`Transport`]
//! - [`SessionManager`]: persisted identity
//!
//! Everything runs on one task. Network calls issued by the client are
//! executed one at a time and their results fed straight back, so a push
//! event is never processed halfway through another event's follow-ups.

use gallows_client::{
    ChannelItem, ClientAction, ClientConfig, ClientEvent, GameApi, PlayerSession, Transport,
};

use crate::{
    App, AppAction, AppEvent, Bridge, Driver,
    identity::{Restored, SessionManager},
    store::TokenStore,
};

/// What woke the loop.
enum Wake {
    Input(Option<crate::UserInput>),
    Push(ChannelItem),
}

/// Result of executing one client I/O action.
#[derive(Default)]
struct Executed {
    /// Response to feed back into the client.
    feed: Option<ClientEvent>,
    /// Failure to show the user.
    error: Option<String>,
}

impl Executed {
    fn feed(event: ClientEvent) -> Self {
        Self { feed: Some(event), error: None }
    }

    fn failed(message: String) -> Self {
        Self { feed: None, error: Some(message) }
    }
}

/// Generic runtime that orchestrates App, Bridge, and Driver.
///
/// # Type Parameters
///
/// - `T`: network transport
/// - `S`: token persistence
/// - `D`: user-facing I/O driver
pub struct Runtime<T, S, D>
where
    T: Transport,
    S: TokenStore,
    D: Driver,
{
    driver: D,
    app: App,
    api: GameApi<T>,
    sessions: SessionManager<S>,
    /// Present while attached to a game.
    bridge: Option<Bridge>,
    config: ClientConfig,
    /// Name to register with if nothing can be restored.
    preset_name: Option<String>,
}

impl<T, S, D> Runtime<T, S, D>
where
    T: Transport,
    S: TokenStore,
    D: Driver,
{
    /// Create a new runtime.
    pub fn new(driver: D, transport: T, store: S, config: ClientConfig) -> Self {
        Self {
            driver,
            app: App::new(),
            api: GameApi::new(transport),
            sessions: SessionManager::new(store),
            bridge: None,
            config,
            preset_name: None,
        }
    }

    /// Register as `name` without prompting when no session can be restored.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.preset_name = Some(name.into());
        self
    }

    /// Run the main event loop until the user quits or input closes.
    ///
    /// Network and storage failures are shown to the user and never end the
    /// loop; only driver errors do.
    pub async fn run(mut self) -> Result<(), D::Error> {
        self.driver.render(&self.app)?;

        let events = self.start().await;
        let mut quit = self.process_events(events).await?;
        while !quit {
            quit = self.process_cycle().await?;
        }

        self.api.close_channel();
        self.driver.stop();
        Ok(())
    }

    /// Wait for input or a push event and process it.
    ///
    /// Returns `true` if the application should quit.
    async fn process_cycle(&mut self) -> Result<bool, D::Error> {
        let wake = tokio::select! {
            input = self.driver.poll_input() => Wake::Input(input?),
            item = self.api.next_push() => Wake::Push(item),
        };

        match wake {
            Wake::Input(Some(input)) => self.process_events(vec![AppEvent::Input(input)]).await,
            Wake::Input(None) => Ok(true),
            Wake::Push(item) => {
                let events = self.handle_push(item).await;
                self.process_events(events).await
            },
        }
    }

    /// Restore the persisted session, or fall back to registration.
    async fn start(&mut self) -> Vec<AppEvent> {
        match self.sessions.restore(&self.api).await {
            Ok(Some(restored)) => return self.begin(restored).await,
            Ok(None) => {},
            Err(e) => {
                tracing::warn!(error = %e, "could not restore session");
                return vec![AppEvent::NeedName {
                    reason: Some(format!("Could not restore session: {e}")),
                }];
            },
        }

        match self.preset_name.take() {
            Some(name) => self.register(&name).await,
            None => vec![AppEvent::NeedName { reason: None }],
        }
    }

    async fn register(&mut self, name: &str) -> Vec<AppEvent> {
        match self.sessions.register(&self.api, name).await {
            Ok(restored) => self.begin(restored).await,
            Err(e) => {
                tracing::info!(error = %e, "registration failed");
                vec![AppEvent::NeedName { reason: Some(e.to_string()) }]
            },
        }
    }

    /// Attach a fresh client to `restored` and run its startup fetches.
    async fn begin(&mut self, restored: Restored) -> Vec<AppEvent> {
        let mut bridge = Bridge::new(restored.session, self.config);
        let mut events = bridge.restore(restored.status);
        self.bridge = Some(bridge);
        events.extend(self.flush_outgoing().await);
        events
    }

    async fn handle_push(&mut self, item: ChannelItem) -> Vec<AppEvent> {
        let Some(bridge) = self.bridge.as_mut() else {
            tracing::debug!(?item, "push without a session");
            return vec![];
        };
        let mut events = bridge.handle_push(item);
        events.extend(self.flush_outgoing().await);
        events
    }

    /// Delete the game for both players.
    async fn reset(&mut self) -> Vec<AppEvent> {
        let Some(bridge) = self.bridge.as_ref() else {
            return vec![];
        };
        let token = bridge.client().session().token().clone();

        match self.api.delete_game(&token).await {
            Ok(()) => {
                tracing::info!("game deleted");
                vec![AppEvent::SessionEnded]
            },
            Err(e) => vec![AppEvent::Error { message: format!("could not delete game: {e}") }],
        }
    }

    fn discard(&mut self) -> Vec<AppEvent> {
        self.bridge = None;
        self.api.close_channel();
        match self.sessions.discard() {
            Ok(()) => vec![],
            Err(e) => vec![AppEvent::Error { message: e.to_string() }],
        }
    }

    /// Feed events to the App and execute what it asks for.
    ///
    /// Returns `true` if should quit.
    async fn process_events(&mut self, events: Vec<AppEvent>) -> Result<bool, D::Error> {
        let mut actions = Vec::new();
        for event in events {
            actions.extend(self.app.handle(event));
        }
        self.process_actions(actions).await
    }

    /// Process actions returned by the App.
    ///
    /// Returns `true` if should quit.
    async fn process_actions(&mut self, initial_actions: Vec<AppAction>) -> Result<bool, D::Error> {
        let mut pending_actions = initial_actions;

        while !pending_actions.is_empty() {
            let actions = std::mem::take(&mut pending_actions);

            for action in actions {
                let events = match action {
                    AppAction::Render => {
                        self.driver.render(&self.app)?;
                        continue;
                    },
                    AppAction::Quit => return Ok(true),
                    AppAction::Register { name } => self.register(&name).await,
                    AppAction::ResetGame => self.reset().await,
                    AppAction::DiscardSession => self.discard(),

                    // Game operations go through the bridge
                    AppAction::SubmitGuess { .. } | AppAction::Refresh => {
                        let Some(bridge) = self.bridge.as_mut() else {
                            continue;
                        };
                        let mut events = bridge.process_app_action(action);
                        events.extend(self.flush_outgoing().await);
                        events
                    },
                };

                for event in events {
                    pending_actions.extend(self.app.handle(event));
                }
            }
        }
        Ok(false)
    }

    /// Execute queued client I/O until the client stops asking for more.
    async fn flush_outgoing(&mut self) -> Vec<AppEvent> {
        let mut events = Vec::new();

        loop {
            let Some(bridge) = self.bridge.as_mut() else {
                break;
            };
            let actions = bridge.take_outgoing();
            if actions.is_empty() {
                break;
            }
            let session = bridge.client().session().clone();

            for action in actions {
                let executed = execute(&mut self.api, &session, action).await;
                if let Some(message) = executed.error {
                    events.push(AppEvent::Error { message });
                }
                if let Some(event) = executed.feed
                    && let Some(bridge) = self.bridge.as_mut()
                {
                    events.extend(bridge.handle(event));
                }
            }
        }
        events
    }
}

/// Run one client I/O action against the API.
///
/// Query failures are reported and left for a user-driven `/refresh`. A
/// failed guess is fed back as [`ClientEvent::GuessFailed`] and never re-sent.
async fn execute<T: Transport>(
    api: &mut GameApi<T>,
    session: &PlayerSession,
    action: ClientAction,
) -> Executed {
    let token = session.token();

    match action {
        ClientAction::Subscribe { game_id } => match api.subscribe(game_id).await {
            Ok(()) => Executed::default(),
            Err(e) => Executed::feed(ClientEvent::ChannelLost { reason: e.to_string() }),
        },
        ClientAction::CloseChannel => {
            api.close_channel();
            Executed::default()
        },
        ClientAction::FetchSnapshot { ticket } => {
            match api.snapshot(token, session.turn_position()).await {
                Ok(snapshot) => Executed::feed(ClientEvent::SnapshotReceived { ticket, snapshot }),
                Err(e) => Executed::failed(format!("could not read the game: {e}")),
            }
        },
        ClientAction::FetchStatus { ticket } => match api.status(token).await {
            Ok(status) => Executed::feed(ClientEvent::StatusReceived { ticket, status }),
            Err(e) => Executed::failed(format!("could not read the session status: {e}")),
        },
        ClientAction::FetchRevealedWord { ticket } => match api.revealed_word(token).await {
            Ok(word) => Executed::feed(ClientEvent::RevealedWordReceived { ticket, word }),
            Err(e) => Executed::failed(format!("could not read the word: {e}")),
        },
        ClientAction::FetchTeammate { ticket } => match api.teammate(token).await {
            Ok(name) => Executed::feed(ClientEvent::TeammateReceived { ticket, name }),
            Err(e) => {
                tracing::warn!(error = %e, "teammate lookup failed");
                Executed::default()
            },
        },
        ClientAction::SendGuess { ticket, letter } => match api.guess(token, letter).await {
            Ok(outcome) => Executed::feed(ClientEvent::GuessResolved { ticket, outcome }),
            Err(e) => {
                let reason = e.to_string();
                Executed {
                    error: Some(format!("guess {letter} failed: {reason}")),
                    feed: Some(ClientEvent::GuessFailed { ticket, reason }),
                }
            },
        },
        other => {
            tracing::debug!(?other, "not an I/O action");
            Executed::default()
        },
    }
}
