use std::path::PathBuf;

use eventhub_core::types::Role;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// The signed-in identity and its bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: SessionUser,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub role: Role,
}

/// JSON file holding at most one session; survives process restarts.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `None` when nobody is signed in. A corrupt file counts as signed out.
    pub fn load(&self) -> Result<Option<Session>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(session)?)?;
        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    /// Remove the stored session. Clearing an empty store is not an error.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
