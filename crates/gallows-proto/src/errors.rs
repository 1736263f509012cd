//! Protocol error types.
//!
//! Raised when a server response or push event cannot be interpreted. These
//! are never transient: retrying the same request against the same server
//! yields the same bytes.

use thiserror::Error;

/// Result alias for protocol parsing.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while decoding server data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Status body is not one of the known status strings.
    #[error("unknown session status: {0:?}")]
    UnknownStatus(String),

    /// Guess response carried a code outside `1..=5`.
    #[error("unknown guess outcome code: {0}")]
    UnknownOutcome(i64),

    /// Registration response carried an unknown result code.
    #[error("unknown registration result code: {0}")]
    UnknownRegistration(u8),

    /// Registration was accepted but no session token was returned.
    #[error("registration accepted without a session token")]
    MissingToken,

    /// Session tokens must be non-empty.
    #[error("session token must not be empty")]
    EmptyToken,

    /// Turn positions are `0` or `1`.
    #[error("invalid turn position: {0}")]
    InvalidTurnPosition(u8),

    /// A text or JSON field did not have the expected shape.
    #[error("malformed {field}: {value:?}")]
    Malformed {
        /// Which field failed to parse.
        field: &'static str,
        /// The offending raw value.
        value: String,
    },

    /// Push event body is not valid event JSON.
    #[error("malformed push event: {0}")]
    MalformedEvent(String),

    /// Push event kind is not recognised.
    #[error("unknown push event kind: {0:?}")]
    UnknownEvent(String),
}

impl ProtocolError {
    pub(crate) fn malformed(field: &'static str, value: impl Into<String>) -> Self {
        Self::Malformed { field, value: value.into() }
    }
}
