//! Terminal UI for Gallows
//!
//! A thin shell over [`gallows_app::Driver`] that provides terminal-specific
//! I/O. All orchestration logic lives in the generic [`gallows_app::Runtime`].
//!
//! This crate only handles line editing and terminal rendering.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod args;
pub mod input;
pub mod terminal;
pub mod ui;

pub use args::Args;
pub use gallows_app::{App, Driver, GameView, Mode, Runtime, UserInput};
pub use input::{InputState, KeyInput, KeyOutcome};
pub use terminal::{TerminalDriver, TerminalError};
