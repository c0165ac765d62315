// src/session.rs
//! Who is signed in, plus the optional "remember me" record on disk.
//!
//! Persistence is advisory: a missing or unreadable record means signed out,
//! and failed writes are logged and otherwise ignored.
use std::{fs, io::ErrorKind, path::PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::SessionError;

pub trait SessionStorage: Send + Sync {
    fn load(&self) -> Result<Option<String>, SessionError>;
    fn save(&self, identity: &str) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

#[derive(Serialize, Deserialize)]
struct Remembered {
    identity: String,
}

/// Keeps the remembered identity in a small JSON file.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<Option<String>, SessionError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: Remembered = serde_json::from_str(&raw)?;
        Ok(Some(record.identity))
    }

    fn save(&self, identity: &str) -> Result<(), SessionError> {
        let record = Remembered { identity: identity.to_string() };
        fs::write(&self.path, serde_json::to_vec(&record)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<String>>,
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>, SessionError> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, identity: &str) -> Result<(), SessionError> {
        *self.slot.lock() = Some(identity.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.slot.lock() = None;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remember {
    Yes,
    No,
}

pub struct Session {
    identity: Option<String>,
    storage: Box<dyn SessionStorage>,
}

impl Session {
    /// Start from whatever identity was remembered last time, if any.
    pub fn restore(storage: Box<dyn SessionStorage>) -> Self {
        let identity = match storage.load() {
            Ok(identity) => identity.filter(|i| !i.is_empty()),
            Err(e) => {
                warn!("ignoring saved session: {e}");
                None
            }
        };
        if let Some(identity) = &identity {
            info!(identity = %identity, "session restored");
        }
        Self { identity, storage }
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.identity.is_some()
    }

    pub fn login(&mut self, identity: impl Into<String>, remember: Remember) {
        let identity = identity.into();
        let persisted = match remember {
            Remember::Yes => self.storage.save(&identity),
            Remember::No => self.storage.clear(),
        };
        if let Err(e) = persisted {
            warn!("could not update saved session: {e}");
        }
        self.identity = Some(identity);
    }

    pub fn logout(&mut self) {
        if let Err(e) = self.storage.clear() {
            warn!("could not clear saved session: {e}");
        }
        self.identity = None;
    }
}
