//! Gallows wire protocol.
//!
//! Types and codecs for everything the client exchanges with the game server:
//! registration, session status, snapshot fields, guess outcome codes and the
//! push events delivered over the Server-Sent Events channel.
//!
//! The server speaks a mix of plain-text bodies (status strings, word masks,
//! letter lists) and small JSON documents (registration, push events). Every
//! parser here is strict: anything the client does not understand becomes a
//! [`ProtocolError`] instead of a silently defaulted value.
//!
//! # Components
//!
//! - [`SessionStatus`]: the answer to "who am I to the server right now"
//! - [`payloads`]: registration, guess and snapshot payloads
//! - [`PushEvent`]: discriminated push notification
//! - [`SseDecoder`]: incremental `text/event-stream` framing

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod errors;
mod event;
mod ids;
pub mod payloads;
mod sse;
mod status;

pub use errors::{ProtocolError, Result};
pub use event::{PushEvent, PushKind};
pub use ids::{GameId, SessionToken, TurnPosition};
pub use payloads::{
    game::{
        GameSnapshot, GuessOutcome, GuessRequest, MAX_LIVES, WordMask, normalize_letter,
        parse_letters,
    },
    session::{Registration, RegistrationReply, RegisterRequest, RegisterResponse, Rejection},
};
pub use sse::{MAX_EVENT_BYTES, SseDecoder};
pub use status::SessionStatus;
