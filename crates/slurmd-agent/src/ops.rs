//! Node operations abstraction.
//!
//! This module defines the [`NodeOperations`] trait that abstracts over the
//! machinery which actually mutates a compute node:
//!
//! - [`FileNodeOps`]: stages everything under the agent data directory
//! - [`ScriptedNodeOps`]: scripted facts and recorded calls, for testing
//!
//! # Design
//!
//! The protocol decides *when* to prepare, write secrets, or apply
//! configuration; implementations of this trait decide *how*. All operations
//! are idempotent so the reconciliation loop can repeat them freely.

use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use slurmd_types::{SecretMaterial, SlurmConfig};

use crate::statefile::write_atomic;

// ============================================================================
// NodeOperations Trait
// ============================================================================

/// Abstraction over the machinery that mutates a compute node.
///
/// # FCIS Pattern
///
/// Node operations are part of the imperative shell. The pure state machine
/// produces effects as output; the dispatcher feeds them here.
pub trait NodeOperations: Debug + Send {
    /// Whether system preparation has completed on this node.
    fn installed(&self) -> bool;

    /// The hostname compute jobs will reach this node under.
    fn hostname(&self) -> String;

    /// Hardware inventory advertised to the controller, as JSON text.
    fn inventory(&self) -> String;

    /// Prepares the node to run slurmd.
    ///
    /// Idempotent: preparing an already-prepared node is a no-op. May be
    /// slow on first run (package installation, user creation).
    fn prepare_system(&mut self) -> Result<(), OpsError>;

    /// Writes the munge key onto the node, replacing any previous key.
    fn write_secret(&mut self, material: &SecretMaterial) -> Result<(), OpsError>;

    /// Renders the configuration and restarts the slurmd daemon.
    ///
    /// Re-applying an unchanged configuration is safe.
    fn apply_config_and_restart(&mut self, config: &SlurmConfig) -> Result<(), OpsError>;
}

/// Errors raised by node operations.
#[derive(Debug, Error)]
pub enum OpsError {
    /// I/O failure while mutating the node.
    #[error("node operation `{action}` failed: {source}")]
    Io {
        action: &'static str,
        #[source]
        source: io::Error,
    },
}

impl OpsError {
    fn io(action: &'static str, source: io::Error) -> Self {
        Self::Io { action, source }
    }
}

// ============================================================================
// File Node Ops (for the binary)
// ============================================================================

/// Node operations backed by the agent data directory.
///
/// Install state is a marker file; the munge key and the configuration
/// document are staged as files for the system integration to pick up:
///
/// ```text
/// {root}/
/// ├── slurmd.installed     <- marker, presence means prepared
/// ├── munge.key            <- raw secret bytes
/// └── slurm-config.json    <- last applied configuration document
/// ```
#[derive(Debug, Clone)]
pub struct FileNodeOps {
    root: PathBuf,
}

impl FileNodeOps {
    /// Creates node operations rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn marker_path(&self) -> PathBuf {
        self.root.join("slurmd.installed")
    }

    fn secret_path(&self) -> PathBuf {
        self.root.join("munge.key")
    }

    fn config_path(&self) -> PathBuf {
        self.root.join("slurm-config.json")
    }
}

impl NodeOperations for FileNodeOps {
    fn installed(&self) -> bool {
        self.marker_path().exists()
    }

    fn hostname(&self) -> String {
        fs::read_to_string("/proc/sys/kernel/hostname")
            .map(|raw| raw.trim().to_string())
            .unwrap_or_else(|_| "localhost".to_string())
    }

    fn inventory(&self) -> String {
        let cpus = std::thread::available_parallelism().map_or(1, usize::from);
        serde_json::json!({ "cpus": cpus }).to_string()
    }

    fn prepare_system(&mut self) -> Result<(), OpsError> {
        if self.installed() {
            return Ok(());
        }
        tracing::info!(root = %self.root.display(), "preparing node");
        write_atomic(&self.marker_path(), b"")
            .map_err(|source| OpsError::io("prepare system", source))?;
        Ok(())
    }

    fn write_secret(&mut self, material: &SecretMaterial) -> Result<(), OpsError> {
        write_atomic(&self.secret_path(), material.as_bytes())
            .map_err(|source| OpsError::io("write munge key", source))?;
        tracing::info!(path = %self.secret_path().display(), "munge key staged");
        Ok(())
    }

    fn apply_config_and_restart(&mut self, config: &SlurmConfig) -> Result<(), OpsError> {
        write_atomic(&self.config_path(), config.to_string().as_bytes())
            .map_err(|source| OpsError::io("write slurm config", source))?;
        tracing::debug!(
            path = %self.config_path().display(),
            "slurmd restart requested (service manager integration not yet implemented)"
        );
        Ok(())
    }
}

// ============================================================================
// Scripted Node Ops (for testing)
// ============================================================================

/// Node operations with scripted facts and recorded calls.
///
/// Facts (`installed`, hostname, inventory) are plain fields the test sets
/// up; every mutating call is recorded for later inspection.
#[derive(Debug, Clone, Default)]
pub struct ScriptedNodeOps {
    /// Whether the node reports itself installed.
    pub installed: bool,
    /// Hostname reported to the protocol.
    pub hostname: String,
    /// Inventory reported to the protocol.
    pub inventory: String,
    /// When set, `prepare_system` fails instead of installing.
    pub fail_prepare: bool,
    /// Number of `prepare_system` calls so far.
    pub prepare_calls: usize,
    /// Every secret written, in order.
    pub secrets: Vec<SecretMaterial>,
    /// Every configuration applied, in order.
    pub applied: Vec<SlurmConfig>,
}

impl ScriptedNodeOps {
    /// Creates scripted operations for a node that is not yet installed.
    pub fn new(hostname: impl Into<String>, inventory: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            inventory: inventory.into(),
            ..Self::default()
        }
    }

    /// Marks the node as already installed.
    pub fn with_installed(mut self) -> Self {
        self.installed = true;
        self
    }
}

impl NodeOperations for ScriptedNodeOps {
    fn installed(&self) -> bool {
        self.installed
    }

    fn hostname(&self) -> String {
        self.hostname.clone()
    }

    fn inventory(&self) -> String {
        self.inventory.clone()
    }

    fn prepare_system(&mut self) -> Result<(), OpsError> {
        if self.fail_prepare {
            return Err(OpsError::io(
                "prepare system",
                io::Error::new(io::ErrorKind::Other, "scripted failure"),
            ));
        }
        self.prepare_calls += 1;
        self.installed = true;
        Ok(())
    }

    fn write_secret(&mut self, material: &SecretMaterial) -> Result<(), OpsError> {
        self.secrets.push(material.clone());
        Ok(())
    }

    fn apply_config_and_restart(&mut self, config: &SlurmConfig) -> Result<(), OpsError> {
        self.applied.push(config.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_ops_marker_tracks_preparation() {
        let dir = tempfile::tempdir().unwrap();
        let mut ops = FileNodeOps::new(dir.path());

        assert!(!ops.installed());
        ops.prepare_system().unwrap();
        assert!(ops.installed());

        // Preparing again is a no-op.
        ops.prepare_system().unwrap();
        assert!(ops.installed());
    }

    #[test]
    fn file_ops_stage_secret_and_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut ops = FileNodeOps::new(dir.path());

        ops.write_secret(&SecretMaterial::from("munge-material")).unwrap();
        assert_eq!(
            fs::read(dir.path().join("munge.key")).unwrap(),
            b"munge-material"
        );

        let config = SlurmConfig::parse(br#"{"cluster_name": "camelot"}"#).unwrap();
        ops.apply_config_and_restart(&config).unwrap();
        let staged = fs::read_to_string(dir.path().join("slurm-config.json")).unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&staged).unwrap(),
            *config.as_value()
        );
    }

    #[test]
    fn scripted_ops_record_calls() {
        let mut ops = ScriptedNodeOps::new("node-0", "{}");

        assert!(!ops.installed());
        ops.prepare_system().unwrap();
        assert!(ops.installed());
        assert_eq!(ops.prepare_calls, 1);

        ops.write_secret(&SecretMaterial::from("key")).unwrap();
        assert_eq!(ops.secrets.len(), 1);
    }

    #[test]
    fn scripted_ops_injected_failure() {
        let mut ops = ScriptedNodeOps::new("node-0", "{}");
        ops.fail_prepare = true;

        assert!(ops.prepare_system().is_err());
        assert!(!ops.installed());
    }
}
