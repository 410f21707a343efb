//! Storage backends for the durable store.
//!
//! Backends are **opaque snapshot stores**: they hold the latest encoded
//! store image and know nothing about records, queues, or the schema.
//! The store owns all format interpretation.

use crate::error::{StoreError, StoreResult};
use fs2::FileExt;
use parking_lot::RwLock;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A low-level storage backend.
///
/// # Invariants
///
/// - `load` returns exactly the bytes most recently passed to a
///   successful `persist`, or `None` if nothing was ever persisted
/// - `persist` is atomic: a crash mid-persist leaves the previous
///   snapshot intact
/// - Backends must be `Send + Sync` for concurrent access
pub trait StorageBackend: Send + Sync {
    /// Loads the current snapshot, if one exists.
    fn load(&self) -> StoreResult<Option<Vec<u8>>>;

    /// Durably replaces the snapshot.
    fn persist(&self, snapshot: &[u8]) -> StoreResult<()>;
}

/// An in-memory backend for tests and ephemeral stores.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    snapshot: RwLock<Option<Vec<u8>>>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend pre-seeded with a snapshot.
    ///
    /// Useful for testing restart and migration scenarios.
    #[must_use]
    pub fn with_snapshot(snapshot: Vec<u8>) -> Self {
        Self {
            snapshot: RwLock::new(Some(snapshot)),
        }
    }

    /// Returns a copy of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Option<Vec<u8>> {
        self.snapshot.read().clone()
    }
}

impl StorageBackend for InMemoryBackend {
    fn load(&self) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.snapshot.read().clone())
    }

    fn persist(&self, snapshot: &[u8]) -> StoreResult<()> {
        *self.snapshot.write() = Some(snapshot.to_vec());
        Ok(())
    }
}

/// A file-based backend providing persistence across process restarts.
///
/// # Durability
///
/// `persist` writes to a sibling temp file, calls `sync_all`, then
/// renames over the snapshot path, so the snapshot is replaced atomically.
///
/// # Exclusivity
///
/// An exclusive `fs2` lock on a sibling lock file is held for the
/// lifetime of the backend. A second open of the same path fails with
/// `StorageUnavailable`.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    lock_file: File,
}

impl FileBackend {
    /// Opens a file backend at the given path, creating parent
    /// directories if needed.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` when the path cannot be prepared or
    /// another process holds the store lock.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                StoreError::storage_unavailable(format!(
                    "cannot create store directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let lock_path = path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| {
                StoreError::storage_unavailable(format!(
                    "cannot open lock file {}: {e}",
                    lock_path.display()
                ))
            })?;

        lock_file.try_lock_exclusive().map_err(|e| {
            StoreError::storage_unavailable(format!(
                "another process holds the store lock at {}: {e}",
                lock_path.display()
            ))
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            lock_file,
        })
    }

    /// Returns the snapshot path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileBackend {
    fn load(&self) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn persist(&self, snapshot: &[u8]) -> StoreResult<()> {
        let tmp_path = self.path.with_extension("tmp");

        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(snapshot)?;
        tmp.sync_all()?;
        drop(tmp);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl Drop for FileBackend {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.lock_file);
    }
}
