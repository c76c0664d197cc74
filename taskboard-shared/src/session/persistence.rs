/// Session persistence boundary
///
/// The session store serializes its whole state through this trait on every
/// mutation and deserializes it once at startup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::SessionState;

/// Error type for session persistence
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Reading or writing the backing file failed
    #[error("Session storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// Persisted state could not be (de)serialized
    #[error("Session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Where session state is kept between runs
pub trait SessionPersistence: Send + Sync {
    /// Loads the persisted state, `None` if nothing was saved yet
    fn load(&self) -> Result<Option<SessionState>, SessionError>;

    /// Saves the full state
    fn save(&self, state: &SessionState) -> Result<(), SessionError>;
}

/// JSON file persistence
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FilePersistence { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionPersistence for FilePersistence {
    fn load(&self) -> Result<Option<SessionState>, SessionError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, state: &SessionState) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Atomic replace via a sibling temp file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-memory persistence, for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    stored: Mutex<Option<SessionState>>,
}

impl MemoryPersistence {
    pub fn with_state(state: SessionState) -> Self {
        MemoryPersistence {
            stored: Mutex::new(Some(state)),
        }
    }

    /// Last saved state
    pub fn stored(&self) -> Option<SessionState> {
        self.stored
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl SessionPersistence for MemoryPersistence {
    fn load(&self) -> Result<Option<SessionState>, SessionError> {
        Ok(self.stored())
    }

    fn save(&self, state: &SessionState) -> Result<(), SessionError> {
        *self
            .stored
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(state.clone());
        Ok(())
    }
}
