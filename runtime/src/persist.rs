//! Snapshot persistence: the single durable JSON document.
//!
//! The whole model is rewritten on every mutation. Writes never touch the
//! live file in place: the document goes to a sibling temp file first and
//! is then swapped in with an atomic rename, so a crash mid-write leaves
//! the previous snapshot intact.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tombola_core::RaffleState;

/// A snapshot could not be read or written.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Filesystem failure.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// The document could not be encoded or decoded.
    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable storage of the raffle snapshot.
///
/// The store runtime calls `save` while holding its mutation lock, which is
/// what makes every mutation all-or-nothing: a failed save rolls the
/// in-memory model back before the lock is released.
#[async_trait]
pub trait Persister: Send + Sync {
    /// Loads the last successfully written snapshot.
    ///
    /// Returns `None` when no snapshot exists yet; the store then starts
    /// with a fresh pool.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] on unreadable or undecodable documents.
    async fn load(&self) -> Result<Option<RaffleState>, PersistError>;

    /// Durably writes a snapshot, replacing the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the write did not complete; the
    /// previous snapshot must still be intact in that case.
    async fn save(&self, state: &RaffleState) -> Result<(), PersistError>;
}

/// Persister backed by one pretty-printed JSON file.
#[derive(Clone, Debug)]
pub struct JsonFilePersister {
    path: PathBuf,
}

impl JsonFilePersister {
    /// Creates a persister writing to `path`. Parent directories are
    /// created on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The snapshot file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Persister for JsonFilePersister {
    async fn load(&self) -> Result<Option<RaffleState>, PersistError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        let state = serde_json::from_slice(&bytes)?;
        Ok(Some(state))
    }

    async fn save(&self, state: &RaffleState) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let bytes = serde_json::to_vec_pretty(state)?;
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &bytes).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}
