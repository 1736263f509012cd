//! Persisted session identity.
//!
//! The only client state that survives a restart is the [`SessionRecord`]:
//! the token plus the game and turn position it was issued for. Everything
//! else is re-derived from the server on the next start.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use gallows_client::{GameId, PlayerSession, SessionToken, TurnPosition};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Persistence errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// File system failure.
    #[error("I/O error: {0}")]
    Io(String),
}

/// What is written to disk between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Token issued at registration.
    pub token: SessionToken,
    /// Game the token belongs to.
    pub game_id: GameId,
    /// Turn position assigned at registration.
    pub turn_position: TurnPosition,
}

impl From<&PlayerSession> for SessionRecord {
    fn from(session: &PlayerSession) -> Self {
        Self {
            token: session.token().clone(),
            game_id: session.game_id(),
            turn_position: session.turn_position(),
        }
    }
}

impl From<SessionRecord> for PlayerSession {
    fn from(record: SessionRecord) -> Self {
        Self::new(record.token, record.game_id, record.turn_position)
    }
}

/// Storage for at most one [`SessionRecord`].
///
/// Synchronous: a record is a few dozen bytes and is touched only at session
/// boundaries.
pub trait TokenStore: Send {
    /// Stored record. `None` if nothing usable is stored.
    fn load(&self) -> Result<Option<SessionRecord>, StoreError>;

    /// Replace the stored record.
    fn save(&mut self, record: &SessionRecord) -> Result<(), StoreError>;

    /// Forget the stored record. Clearing an empty store is not an error.
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// In-memory store for tests and simulation.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    record: Option<SessionRecord>,
}

impl MemoryTokenStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `record`.
    pub fn with_record(record: SessionRecord) -> Self {
        Self { record: Some(record) }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.record.clone())
    }

    fn save(&mut self, record: &SessionRecord) -> Result<(), StoreError> {
        self.record = Some(record.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.record = None;
        Ok(())
    }
}

/// CBOR file store.
///
/// Writes go to a sibling temp file which is then renamed over the target, so
/// a crash mid-write leaves either the old record or the new one. A file that
/// does not decode is treated as absent.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store backed by `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(ToOwned::to_owned).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<SessionRecord>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };

        match ciborium::de::from_reader::<SessionRecord, _>(bytes.as_slice()) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "ignoring unreadable session file"
                );
                Ok(None)
            },
        }
    }

    fn save(&mut self, record: &SessionRecord) -> Result<(), StoreError> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(record, &mut bytes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let temp = self.temp_path();
        fs::write(&temp, &bytes).map_err(|e| StoreError::Io(e.to_string()))?;
        fs::rename(&temp, &self.path).map_err(|e| StoreError::Io(e.to_string()))
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }
}
