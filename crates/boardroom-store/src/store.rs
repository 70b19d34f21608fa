//! The [`StateStore`]: atomic load/save of the two persisted documents
//! under one exclusive lock.
//!
//! # Contract
//!
//! - [`StateStore::lock`] acquires the single process-wide lock and hands
//!   back a [`StoreGuard`]. The lock is released when the guard drops, on
//!   every exit path.
//! - Loads degrade: an absent or corrupt document is treated as absent and
//!   replaced by the supplied default. Malformed persisted data never
//!   raises past this boundary.
//! - Saves replace the whole document via a temp file + rename, so an
//!   out-of-band reader bypassing the lock never observes a torn write.
//! - Lock-held sections must stay fast (memory plus small file I/O); the
//!   slow generation calls happen elsewhere, off-lock.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, MutexGuard};
use tracing::warn;

use boardroom_types::{CompanyState, EventRecord};

/// Errors that can occur while persisting a document.
///
/// Only the save path can fail; loads degrade to the default instead.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Writing the document to disk failed.
    #[error("failed to write {path}: {source}")]
    Io {
        /// The document path.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Serializing the document failed.
    #[error("failed to serialize {path}: {source}")]
    Serialize {
        /// The document path.
        path: String,
        /// The underlying serde error.
        source: serde_json::Error,
    },
}

/// Locations of the two persisted documents.
#[derive(Debug, Clone)]
pub struct StorePaths {
    /// Path of the company state document.
    pub state: PathBuf,
    /// Path of the event history document.
    pub history: PathBuf,
}

/// The durable keyed state with atomic load and atomic save.
///
/// There is exactly one logical lock shared by all readers and writers of
/// persisted documents in the process; no per-document or reader/writer
/// distinction.
#[derive(Debug)]
pub struct StateStore {
    paths: StorePaths,
    initial: CompanyState,
    lock: Mutex<()>,
}

impl StateStore {
    /// Create a store over the given document paths.
    ///
    /// `initial` is the fixed state a missing or corrupt state document
    /// degrades to, and the value a reset restores.
    pub fn new(paths: StorePaths, initial: CompanyState) -> Self {
        Self {
            paths,
            initial,
            lock: Mutex::new(()),
        }
    }

    /// The fixed initial state this store was created with.
    pub const fn initial_state(&self) -> &CompanyState {
        &self.initial
    }

    /// Acquire the exclusive lock, blocking until it is available.
    ///
    /// No acquisition timeout: contention is expected and brief, since
    /// every lock-held section is fast by contract.
    pub async fn lock(&self) -> StoreGuard<'_> {
        StoreGuard {
            _held: self.lock.lock().await,
            store: self,
        }
    }

    /// Take a point-in-time read-only copy of the state.
    ///
    /// Locks, loads, and releases immediately. The caller may hold the
    /// snapshot across an arbitrarily long generation call without
    /// touching the lock again.
    pub async fn snapshot(&self) -> CompanyState {
        self.lock().await.load_state()
    }

    /// Create both documents on first run if neither exists yet.
    ///
    /// Writes the initial state and a single founding history entry.
    /// Existing documents (even corrupt ones) are left untouched.
    pub async fn initialize_if_missing(
        &self,
        founding: EventRecord,
    ) -> Result<(), StoreError> {
        let guard = self.lock().await;
        if !self.paths.state.exists() {
            let initial = self.initial.clone();
            guard.save_state(&initial)?;
        }
        if !self.paths.history.exists() {
            guard.save_history(&[founding])?;
        }
        Ok(())
    }
}

/// Scoped access to the persisted documents while the lock is held.
///
/// Dropping the guard releases the lock on every exit path, including
/// early returns and errors.
#[derive(Debug)]
pub struct StoreGuard<'a> {
    _held: MutexGuard<'a, ()>,
    store: &'a StateStore,
}

impl StoreGuard<'_> {
    /// Load the state document, degrading to the initial state if it is
    /// absent or corrupt.
    pub fn load_state(&self) -> CompanyState {
        load_or_default(&self.store.paths.state, || self.store.initial.clone())
    }

    /// Load the history document, degrading to an empty history.
    pub fn load_history(&self) -> Vec<EventRecord> {
        load_or_default(&self.store.paths.history, Vec::new)
    }

    /// Persist the state document, replacing any prior content in full.
    pub fn save_state(&self, state: &CompanyState) -> Result<(), StoreError> {
        save_document(&self.store.paths.state, state)
    }

    /// Persist the history document, replacing any prior content in full.
    pub fn save_history(&self, history: &[EventRecord]) -> Result<(), StoreError> {
        save_document(&self.store.paths.history, &history)
    }
}

/// Read and deserialize a document, substituting the default when the
/// file is missing or its contents do not parse.
fn load_or_default<T, F>(path: &Path, default: F) -> T
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "document unreadable, using default");
            }
            return default();
        }
    };

    match serde_json::from_str(&contents) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "document corrupt, using default");
            default()
        }
    }
}

/// Serialize and write a document via temp file + rename.
///
/// The rename is atomic on the same filesystem, so a concurrent reader
/// that bypasses the lock sees either the old document or the new one,
/// never a partial write.
fn save_document<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let display = path.display().to_string();

    let json = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Serialize {
        path: display.clone(),
        source,
    })?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &json).map_err(|source| StoreError::Io {
        path: display.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| StoreError::Io {
        path: display,
        source,
    })
}
