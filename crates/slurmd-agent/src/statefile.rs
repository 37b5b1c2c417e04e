//! Durable agent state.
//!
//! The dispatcher persists its state after every dispatch so that parked
//! deferrals, the synchronized configuration, and the secret latch survive
//! process restarts. The file is plain pretty-printed JSON; a missing file
//! means a fresh agent, a file that exists but does not parse is an error
//! the operator has to look at.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use slurmd_protocol::{ProtocolState, Trigger};
use slurmd_types::{SecretMaterial, UnitStatus};

/// Everything the agent needs to remember between invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    /// The pure protocol state (publish bookkeeping + synchronized config).
    pub protocol: ProtocolState,
    /// Triggers parked for re-delivery, in arrival order.
    pub deferred: Vec<Trigger>,
    /// The last secret value delivered to the node, if any.
    ///
    /// The dispatcher compares incoming `munge_key` databag values against
    /// this latch and raises [`Trigger::SecretAvailable`] only on change.
    pub secret_seen: Option<SecretMaterial>,
    /// The most recent operator-visible status.
    pub last_status: Option<UnitStatus>,
}

impl AgentState {
    /// Loads agent state from `path`.
    ///
    /// A missing file yields the default (fresh) state; any other failure
    /// is surfaced so a corrupt file is never silently discarded.
    pub fn load(path: &Path) -> Result<Self, StateFileError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(err.into()),
        };

        serde_json::from_str(&contents).map_err(|source| StateFileError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Saves agent state to `path` atomically.
    pub fn save(&self, path: &Path) -> Result<(), StateFileError> {
        let contents =
            serde_json::to_string_pretty(self).map_err(|source| StateFileError::Encode {
                path: path.to_path_buf(),
                source,
            })?;
        write_atomic(path, contents.as_bytes())?;
        Ok(())
    }
}

/// Writes a file atomically (temp file, then rename).
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let tmp = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;

    Ok(())
}

/// Errors loading or saving the agent state file.
#[derive(Debug, Error)]
pub enum StateFileError {
    /// Filesystem I/O error.
    #[error("state file i/o error: {0}")]
    Io(#[from] io::Error),

    /// The state file exists but does not parse.
    #[error("corrupt agent state at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The state could not be encoded for writing.
    #[error("failed to encode agent state for {path}: {source}")]
    Encode {
        path: PathBuf,
        source: serde_json::Error,
    },
}
