//! Application layer for Gallows
//!
//! Pure state machines and generic runtime for UI and session orchestration,
//! enabling deterministic simulation testing with the same code that runs in
//! production.
//!
//! # Components
//!
//! - [`App`]: UI state machine (screens, input lock, status line)
//! - [`Bridge`]: Protocol bridge (translates App actions to Client events)
//! - [`SessionManager`]: restores or registers the player identity
//! - [`TokenStore`]: persistence for the session token
//! - [`Driver`]: Trait for platform-specific I/O abstraction
//! - [`Runtime`]: Generic orchestration loop using Driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod bridge;
mod driver;
mod event;
mod identity;
mod input;
mod runtime;
mod state;
mod store;

pub use action::AppAction;
pub use app::{App, HELP};
pub use bridge::Bridge;
pub use driver::Driver;
pub use event::AppEvent;
pub use identity::{RegistrationError, Restored, SessionError, SessionManager};
pub use input::UserInput;
pub use runtime::Runtime;
pub use state::{GameView, Mode};
pub use store::{FileTokenStore, MemoryTokenStore, SessionRecord, StoreError, TokenStore};
