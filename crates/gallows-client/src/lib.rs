//! Client
//!
//! Action-based client state machine for the Gallows word-guessing game.
//! Keeps the local view of a two-player game synchronized with the
//! authoritative server and decides when a guess may be submitted.
//!
//! # Architecture
//!
//! The [`Client`] is sans-IO. It receives events ([`ClientEvent`]): the
//! startup status, push notifications, query responses and user guesses. It
//! processes them through pure state machine logic and returns actions
//! ([`ClientAction`]) for the caller to execute. Every request action carries
//! a [`Ticket`]; responses whose ticket is no longer current are rejected
//! instead of applied.
//!
//! # Components
//!
//! - [`Client`]: synchronizer and input gate for one session
//! - [`GameState`]: the local store, read-only outside this crate
//! - [`Transport`]: request/response and push channel seam
//! - [`GameApi`]: typed calls over a transport
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides
//! [`http::HttpTransport`], a [`Transport`] over HTTP and Server-Sent Events.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod api;
mod client;
mod error;
mod event;
mod session;
mod state;
mod transport;

#[cfg(feature = "transport")]
pub mod http;

pub use api::{ApiResult, GameApi};
pub use client::Client;
pub use error::{ApiError, ClientError};
pub use event::{ClientAction, ClientEvent, EndReason, Ticket};
pub use gallows_proto::{GameId, SessionStatus, SessionToken, TurnPosition};
pub use session::{ClientConfig, PlayerSession, PushPlayerSemantics};
pub use state::{GameState, Phase};
pub use transport::{ChannelItem, Endpoint, Method, Subscription, Transport, channel_path};
