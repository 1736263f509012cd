//! Session identity manager.
//!
//! Decides, once per start, whether a persisted token can be resumed or a new
//! registration is needed. A token the server no longer knows is dropped from
//! the store so the next start does not ask again.

use gallows_client::{ApiError, GameApi, PlayerSession, SessionStatus, Transport};
use gallows_proto::{RegistrationReply, Rejection};
use thiserror::Error;

use crate::store::{SessionRecord, StoreError, TokenStore};

/// Display name refused. Shown to the user for correction, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// Name is empty after trimming. Rejected without asking the server.
    #[error("display name must not be empty")]
    EmptyName,

    /// Server refused the name.
    #[error("display name {name:?} was rejected")]
    NameRejected {
        /// Name as submitted.
        name: String,
    },

    /// Name belongs to a player in a running game.
    #[error("display name {name:?} is already playing")]
    NameTaken {
        /// Name as submitted.
        name: String,
    },
}

/// Identity manager errors.
#[derive(Debug, Error)]
pub enum SessionError<E>
where
    E: std::error::Error + 'static,
{
    /// Status or registration call failed.
    #[error(transparent)]
    Api(#[from] ApiError<E>),

    /// Display name refused.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// Token could not be persisted or forgotten.
    #[error("session store: {0}")]
    Store(#[from] StoreError),
}

/// A session ready to hand to a [`gallows_client::Client`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restored {
    /// Identity.
    pub session: PlayerSession,
    /// Server-side status, fed in as the client's first event.
    pub status: SessionStatus,
}

/// Establishes or restores the player identity.
pub struct SessionManager<S: TokenStore> {
    store: S,
}

impl<S: TokenStore> SessionManager<S> {
    /// Manager over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resume the persisted session, if the server still knows it.
    ///
    /// No record means no network call. An `unregistered` answer clears the
    /// record and yields `None`, same as having none.
    pub async fn restore<T: Transport>(
        &mut self,
        api: &GameApi<T>,
    ) -> Result<Option<Restored>, SessionError<T::Error>> {
        let Some(record) = self.store.load()? else {
            tracing::debug!("no persisted session");
            return Ok(None);
        };

        let status = api.status(&record.token).await?;
        if status == SessionStatus::Unregistered {
            tracing::info!(game_id = record.game_id, "server no longer knows persisted session");
            self.store.clear()?;
            return Ok(None);
        }

        tracing::info!(game_id = record.game_id, %status, "resuming session");
        Ok(Some(Restored { session: record.into(), status }))
    }

    /// Register `name` and persist the new token.
    pub async fn register<T: Transport>(
        &mut self,
        api: &GameApi<T>,
        name: &str,
    ) -> Result<Restored, SessionError<T::Error>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistrationError::EmptyName.into());
        }

        let registration = match api.register(name).await? {
            RegistrationReply::Accepted(registration) => registration,
            RegistrationReply::Rejected(Rejection::InvalidName) => {
                return Err(RegistrationError::NameRejected { name: name.to_string() }.into());
            },
            RegistrationReply::Rejected(Rejection::NameTaken) => {
                return Err(RegistrationError::NameTaken { name: name.to_string() }.into());
            },
        };

        let status = registration.initial_status();
        let session = PlayerSession::from(registration);
        self.store.save(&SessionRecord::from(&session))?;

        tracing::info!(
            game_id = session.game_id(),
            turn_position = %session.turn_position(),
            "registered"
        );
        Ok(Restored { session, status })
    }

    /// Resume if possible, otherwise register `name`.
    pub async fn establish<T: Transport>(
        &mut self,
        api: &GameApi<T>,
        name: &str,
    ) -> Result<Restored, SessionError<T::Error>> {
        match self.restore(api).await? {
            Some(restored) => Ok(restored),
            None => self.register(api, name).await,
        }
    }

    /// Forget the persisted session.
    pub fn discard(&mut self) -> Result<(), StoreError> {
        tracing::info!("discarding persisted session");
        self.store.clear()
    }
}
