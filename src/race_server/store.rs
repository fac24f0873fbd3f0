//! Store - Whole-collection persistence for races
//!
//! Every operation reads the full collection and writes it back after a
//! mutation. There are no partial updates.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::race_server::error::StoreError;
use crate::race_server::race::Race;

/// Persistence for the full race collection
pub trait RaceStore: Send + Sync {
    /// Read every stored race, in store order
    fn load_all(&self) -> Result<Vec<Race>, StoreError>;

    /// Replace the stored collection
    fn save_all(&self, races: &[Race]) -> Result<(), StoreError>;
}

impl<T: RaceStore + ?Sized> RaceStore for Box<T> {
    fn load_all(&self) -> Result<Vec<Race>, StoreError> {
        (**self).load_all()
    }

    fn save_all(&self, races: &[Race]) -> Result<(), StoreError> {
        (**self).save_all(races)
    }
}

/// Flat JSON file holding an array of races
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl RaceStore for JsonFileStore {
    fn load_all(&self) -> Result<Vec<Race>, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::debug!("No race store at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(err) => return Err(self.io_error(err)),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn save_all(&self, races: &[Race]) -> Result<(), StoreError> {
        // Rewritten once per simulated tick; compact output keeps that cheap
        let json = serde_json::to_string(races).map_err(StoreError::Encode)?;
        std::fs::write(&self.path, json).map_err(|err| self.io_error(err))?;
        log::trace!("Saved {} races to {}", races.len(), self.path.display());
        Ok(())
    }
}

/// In-process store, mostly for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryStore {
    races: Mutex<Vec<Race>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing collection
    pub fn with_races(races: Vec<Race>) -> Self {
        Self {
            races: Mutex::new(races),
        }
    }
}

impl RaceStore for MemoryStore {
    fn load_all(&self) -> Result<Vec<Race>, StoreError> {
        let races = self
            .races
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(races.clone())
    }

    fn save_all(&self, races: &[Race]) -> Result<(), StoreError> {
        let mut stored = self
            .races
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        *stored = races.to_vec();
        Ok(())
    }
}
