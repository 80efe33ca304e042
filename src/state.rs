//! JSON state file used by the CLI between runs
//!
//! Holds the session history, the feedback log and a performance snapshot.
//! Writes go to a temporary sibling file first and are renamed into place.

use crate::error::{Result, RouterError};
use crate::performance::PerformanceSnapshot;
use crate::types::{Feedback, Session};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Current on-disk format version
pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,

    #[serde(default)]
    pub sessions: Vec<Session>,

    #[serde(default)]
    pub feedback: Vec<Feedback>,

    #[serde(default)]
    pub performance: PerformanceSnapshot,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            sessions: Vec::new(),
            feedback: Vec::new(),
            performance: PerformanceSnapshot::empty(),
        }
    }
}

impl StateFile {
    /// Load state, or start empty if the file does not exist yet
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No state file at {}, starting fresh", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let state: StateFile = serde_json::from_str(&contents)?;
        if state.version != STATE_VERSION {
            return Err(RouterError::UnsupportedStateVersion {
                found: state.version,
                expected: STATE_VERSION,
            });
        }
        info!(
            "Loaded state: {} sessions, {} feedback entries",
            state.sessions.len(),
            state.feedback.len()
        );
        Ok(state)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;

        debug!("Saved state to {}", path.display());
        Ok(())
    }
}
