//! Store configuration.

use crate::backend::{FileBackend, InMemoryBackend, StorageBackend};
use crate::error::StoreResult;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
enum Location {
    Memory,
    File(PathBuf),
}

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    location: Location,
}

impl StoreConfig {
    /// Configures an ephemeral in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            location: Location::Memory,
        }
    }

    /// Configures a persistent store backed by the given file path.
    #[must_use]
    pub fn at_path(path: impl AsRef<Path>) -> Self {
        Self {
            location: Location::File(path.as_ref().to_path_buf()),
        }
    }

    /// Returns the file path, if this configuration is file-backed.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path.as_path()),
            Location::Memory => None,
        }
    }

    pub(crate) fn open_backend(&self) -> StoreResult<Box<dyn StorageBackend>> {
        match &self.location {
            Location::Memory => Ok(Box::new(InMemoryBackend::new())),
            Location::File(path) => Ok(Box::new(FileBackend::open(path)?)),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_paths() {
        assert_eq!(StoreConfig::in_memory().path(), None);
        assert_eq!(
            StoreConfig::at_path("/tmp/storyhub.bin").path(),
            Some(Path::new("/tmp/storyhub.bin"))
        );
    }
}
