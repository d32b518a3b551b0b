use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::client::{LogEntry, Theme};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session state IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Session state JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported session store type: {0}")]
    UnsupportedKind(String),
}

/// Everything the browser client keeps in local storage, under the same
/// keys: the message log, the theme flag, and the selected voice.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedState {
    pub session_id: Uuid,
    #[serde(rename = "moxie_messages")]
    pub messages: Vec<LogEntry>,
    #[serde(rename = "moxie_theme")]
    pub theme: Theme,
    #[serde(rename = "moxie_voice_index")]
    pub voice_index: usize,
}

/// Read once at session startup, written on every change.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<PersistedState>, StoreError>;
    fn save(&self, state: &PersistedState) -> Result<(), StoreError>;
}

pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<PersistedState>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(state)?)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    state: Mutex<Option<PersistedState>>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<PersistedState>, StoreError> {
        Ok(self.state.lock().unwrap().clone())
    }

    fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        *self.state.lock().unwrap() = Some(state.clone());
        Ok(())
    }
}

pub fn create_session_store(
    kind: &str,
    path: &Path,
) -> Result<Arc<dyn SessionStore>, StoreError> {
    match kind.to_lowercase().as_str() {
        "file" => Ok(Arc::new(FileSessionStore::new(path))),
        "memory" => Ok(Arc::new(MemorySessionStore::default())),
        other => Err(StoreError::UnsupportedKind(other.to_string())),
    }
}
