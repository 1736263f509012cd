//! Protocol-to-Application translation layer.
//!
//! The [`Bridge`] wraps the sans-IO [`gallows_client::Client`] and adapts it
//! to the application lifecycle.
//!
//! # Responsibilities
//!
//! - Converts [`crate::AppAction`]s into client events.
//! - Accumulates I/O [`ClientAction`]s (fetches, guesses, channel control)
//!   for the runtime to execute in its next I/O step.
//! - Interprets client results and converts them back into
//!   [`crate::AppEvent`]s to update the UI.
//! - Reports when the in-flight guess has settled, whichever way it went.

use gallows_client::{
    ChannelItem, Client, ClientAction, ClientConfig, ClientError, ClientEvent, PlayerSession,
    SessionStatus,
};

use crate::{AppAction, AppEvent, GameView};

/// Bridge between App and Client protocol logic.
pub struct Bridge {
    client: Client,
    outgoing: Vec<ClientAction>,
    /// A guess was handed to the client and has not settled yet.
    guess_in_flight: bool,
}

impl Bridge {
    /// Bridge for `session`. Feed the status with [`Bridge::restore`] first.
    pub fn new(session: PlayerSession, config: ClientConfig) -> Self {
        Self { client: Client::new(session, config), outgoing: Vec::new(), guess_in_flight: false }
    }

    /// Wrapped client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Current view of the game.
    pub fn view(&self) -> GameView {
        GameView::of(&self.client)
    }

    /// Feed the startup status.
    pub fn restore(&mut self, status: SessionStatus) -> Vec<AppEvent> {
        let mut events = vec![AppEvent::SessionStarted {
            game_id: self.client.session().game_id(),
            turn_position: self.client.session().turn_position(),
        }];
        events.extend(self.handle(ClientEvent::Restored { status }));
        events
    }

    /// Process an App action and return resulting App events.
    pub fn process_app_action(&mut self, action: AppAction) -> Vec<AppEvent> {
        match action {
            AppAction::SubmitGuess { input } => {
                self.guess_in_flight = true;
                self.handle(ClientEvent::SubmitGuess { input })
            },
            AppAction::Refresh => self.handle(ClientEvent::Refresh),
            AppAction::Render
            | AppAction::Quit
            | AppAction::Register { .. }
            | AppAction::ResetGame
            | AppAction::DiscardSession => vec![],
        }
    }

    /// Handle an item from the push channel.
    pub fn handle_push(&mut self, item: ChannelItem) -> Vec<AppEvent> {
        match item {
            ChannelItem::Event(event) => self.handle(ClientEvent::PushReceived(event)),
            ChannelItem::Lost(reason) => self.handle(ClientEvent::ChannelLost { reason }),
        }
    }

    /// Feed any client event, typically a response to an executed action.
    pub fn handle(&mut self, event: ClientEvent) -> Vec<AppEvent> {
        let result = self.client.handle(event);
        let mut events = self.handle_client_result(result);

        if self.guess_in_flight && !self.client.submission_pending() {
            self.guess_in_flight = false;
            events.push(AppEvent::SubmissionSettled);
        }
        events
    }

    /// Take pending I/O actions.
    pub fn take_outgoing(&mut self) -> Vec<ClientAction> {
        std::mem::take(&mut self.outgoing)
    }

    fn handle_client_result(
        &mut self,
        result: Result<Vec<ClientAction>, ClientError>,
    ) -> Vec<AppEvent> {
        match result {
            Ok(actions) => self.process_client_actions(actions),
            Err(ClientError::StaleResponse { ticket, current }) => {
                tracing::warn!(?ticket, current, "discarding stale response");
                vec![]
            },
            Err(e) => vec![AppEvent::Error { message: e.to_string() }],
        }
    }

    fn process_client_actions(&mut self, actions: Vec<ClientAction>) -> Vec<AppEvent> {
        let mut events = Vec::new();
        let mut changed = false;

        for action in actions {
            match action {
                ClientAction::Subscribe { .. }
                | ClientAction::CloseChannel
                | ClientAction::FetchSnapshot { .. }
                | ClientAction::FetchStatus { .. }
                | ClientAction::FetchRevealedWord { .. }
                | ClientAction::FetchTeammate { .. }
                | ClientAction::SendGuess { .. } => {
                    self.outgoing.push(action);
                },
                ClientAction::RegistrationRequired => {
                    events.push(AppEvent::RegistrationRequired);
                },
                ClientAction::PhaseChanged { from, to } => {
                    tracing::info!(?from, ?to, "phase changed");
                    changed = true;
                    events.push(AppEvent::PhaseChanged { from, to });
                },
                ClientAction::TurnChanged { ours, .. } => {
                    changed = true;
                    events.push(AppEvent::TurnChanged { ours });
                },
                ClientAction::StateUpdated => changed = true,
                ClientAction::GuessScored { letter, outcome } => {
                    events.push(AppEvent::GuessScored { letter, outcome });
                },
                ClientAction::NotYourTurn { letter } => {
                    events.push(AppEvent::NotYourTurn { letter });
                },
                ClientAction::ChannelLost { reason } => {
                    tracing::warn!(%reason, "push channel lost");
                    changed = true;
                    events.push(AppEvent::ChannelLost { reason });
                },
                ClientAction::SessionEnded { reason } => {
                    tracing::info!(?reason, "session ended");
                    events.push(AppEvent::SessionEnded);
                },
                ClientAction::Log { message } => {
                    tracing::debug!(%message, "client");
                },
            }
        }

        if changed {
            // view first so status messages render against fresh state
            events.insert(0, AppEvent::GameUpdated(self.view()));
        }
        events
    }
}
