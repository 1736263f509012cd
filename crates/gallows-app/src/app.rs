//! Application state machine.
//!
//! This module defines the [`App`] state machine, which manages the interactive
//! state of the application completely decoupled from I/O and protocol
//! mechanics.
//!
//! This is a pure state machine: it consumes [`crate::AppEvent`] inputs and
//! produces [`crate::AppAction`] instructions for the runtime to execute.
//!
//! # Responsibilities
//!
//! - Routes input lines to registration or guessing depending on the screen.
//! - Locks guess input while a submission is in flight.
//! - Keeps the last [`GameView`] and a status line for rendering.

use gallows_client::Phase;
use gallows_proto::GuessOutcome;

use crate::{AppAction, AppEvent, GameView, Mode, UserInput};

/// Shown for `/help`.
pub const HELP: &str =
    "type a letter to guess, /refresh to re-read the game, /reset to delete it, /quit to leave";

/// Application state machine.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies - fully testable in simulation.
#[derive(Debug, Clone)]
pub struct App {
    mode: Mode,
    /// Current game. `None` outside [`Mode::InGame`].
    view: Option<GameView>,
    /// A guess is in flight; further guesses are held back.
    input_locked: bool,
    /// Transient status message. `None` if no message.
    status_message: Option<String>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// App on the connecting screen.
    pub fn new() -> Self {
        Self { mode: Mode::Connecting, view: None, input_locked: false, status_message: None }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Input(input) => return self.handle_input(input),
            AppEvent::NeedName { reason } => {
                self.leave_game();
                self.mode = Mode::NamePrompt;
                self.status_message = Some(match reason {
                    Some(reason) => format!("{reason}. Enter a display name"),
                    None => "Enter a display name".to_string(),
                });
            },
            AppEvent::SessionStarted { game_id, turn_position } => {
                self.mode = Mode::InGame;
                self.input_locked = false;
                self.status_message =
                    Some(format!("Joined game {game_id} as player {turn_position}"));
            },
            AppEvent::GameUpdated(view) => {
                self.view = Some(view);
            },
            AppEvent::PhaseChanged { to, .. } => {
                self.status_message = Some(phase_message(to).to_string());
            },
            AppEvent::TurnChanged { ours } => {
                let over = self.view.as_ref().is_some_and(GameView::is_over);
                if !over {
                    self.status_message =
                        Some(if ours { "Your turn" } else { "Opponent's turn" }.to_string());
                }
            },
            AppEvent::GuessScored { letter, outcome } => {
                self.status_message = Some(outcome_message(letter, outcome));
            },
            AppEvent::NotYourTurn { letter } => {
                self.status_message =
                    Some(format!("Not your turn yet, try {letter} again when it is"));
            },
            AppEvent::SubmissionSettled => {
                self.input_locked = false;
            },
            AppEvent::ChannelLost { reason } => {
                self.status_message =
                    Some(format!("Lost the live connection ({reason}); use /refresh or restart"));
            },
            AppEvent::RegistrationRequired => {
                self.leave_game();
                self.mode = Mode::NamePrompt;
                self.status_message = Some("Session expired. Enter a display name".to_string());
                return vec![AppAction::DiscardSession, AppAction::Render];
            },
            AppEvent::SessionEnded => {
                self.leave_game();
                self.mode = Mode::NamePrompt;
                self.status_message =
                    Some("The game was deleted. Enter a display name to play again".to_string());
                return vec![AppAction::DiscardSession, AppAction::Render];
            },
            AppEvent::Error { message } => {
                self.status_message = Some(format!("Error: {message}"));
            },
        }
        vec![AppAction::Render]
    }

    fn handle_input(&mut self, input: UserInput) -> Vec<AppAction> {
        match input {
            UserInput::Quit => return vec![AppAction::Quit],
            UserInput::Help => self.status_message = Some(HELP.to_string()),
            UserInput::Unknown(command) => {
                self.status_message = Some(format!("Unknown command {command}, try /help"));
            },
            UserInput::Refresh if self.mode == Mode::InGame => {
                return vec![AppAction::Refresh, AppAction::Render];
            },
            UserInput::Reset if self.mode == Mode::InGame => {
                self.status_message = Some("Deleting game...".to_string());
                return vec![AppAction::ResetGame, AppAction::Render];
            },
            UserInput::Refresh | UserInput::Reset => {
                self.status_message = Some("Not in a game".to_string());
            },
            UserInput::Text(text) => return self.handle_text(text),
        }
        vec![AppAction::Render]
    }

    fn handle_text(&mut self, text: String) -> Vec<AppAction> {
        match self.mode {
            Mode::NamePrompt => {
                self.mode = Mode::Connecting;
                self.status_message = Some(format!("Registering as {text}..."));
                vec![AppAction::Register { name: text }, AppAction::Render]
            },
            Mode::InGame if self.input_locked => {
                self.status_message = Some("Still waiting for the previous guess".to_string());
                vec![AppAction::Render]
            },
            Mode::InGame => {
                self.input_locked = true;
                vec![AppAction::SubmitGuess { input: text }, AppAction::Render]
            },
            Mode::Connecting => {
                self.status_message = Some("Still connecting".to_string());
                vec![AppAction::Render]
            },
        }
    }

    fn leave_game(&mut self) {
        self.view = None;
        self.input_locked = false;
    }

    /// Current screen.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Current game view. `None` outside a game.
    pub fn view(&self) -> Option<&GameView> {
        self.view.as_ref()
    }

    /// A guess is in flight.
    pub fn input_locked(&self) -> bool {
        self.input_locked
    }

    /// Transient status message. `None` if no message.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }
}

fn phase_message(phase: Phase) -> &'static str {
    match phase {
        Phase::AwaitingOpponent => "Waiting for an opponent",
        Phase::InProgress => "Game on",
        Phase::Won => "Solved! You both win",
        Phase::Lost => "Out of lives, game lost",
    }
}

fn outcome_message(letter: char, outcome: GuessOutcome) -> String {
    match outcome {
        GuessOutcome::Won => format!("{letter} completes the word"),
        GuessOutcome::Correct => format!("{letter} is in the word"),
        GuessOutcome::Incorrect => format!("{letter} is not in the word"),
        GuessOutcome::Lost => format!("{letter} was the last life"),
        GuessOutcome::NotYourTurn => format!("{letter} was refused"),
    }
}
