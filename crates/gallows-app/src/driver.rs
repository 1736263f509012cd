//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from the user-facing
//! side of I/O. Each frontend implements the trait, while the generic
//! [`crate::Runtime`] handles all orchestration. Network I/O is not part of
//! the driver; it goes through a [`gallows_client::Transport`].

use std::future::Future;

use crate::{App, UserInput};

/// Abstracts user-facing I/O for the application runtime.
///
/// # Implementations
///
/// - **Terminal**: crossterm key events edited into lines, ratatui frames
/// - **Simulation**: scripted input over a channel, renders into a buffer
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Wait for the next line of input.
    ///
    /// Returns `None` once input is closed, which ends the run. Must be
    /// cancel-safe: the runtime races it against the push channel.
    fn poll_input(&mut self)
    -> impl Future<Output = Result<Option<UserInput>, Self::Error>> + Send;

    /// Render the application state.
    fn render(&mut self, app: &App) -> Result<(), Self::Error>;

    /// Release resources before the runtime returns.
    fn stop(&mut self);
}
