//! Protocol state.
//!
//! [`ProtocolState`] is everything the state machine remembers between
//! triggers: which relations it has published (or still owes) a node record
//! to, and the synchronized configuration. It is serializable so the
//! dispatcher can persist it across process invocations, and cloneable so
//! tests can fork histories.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use slurmd_types::RelationId;

// ============================================================================
// Publish bookkeeping
// ============================================================================

/// Where a relation stands in the node-record publication handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishState {
    /// The relation exists but publication waits on system preparation.
    AwaitingInstall,
    /// The node record has been published into the relation.
    Published,
}

// ============================================================================
// ConfigSync
// ============================================================================

/// The synchronized controller configuration.
///
/// `available` is true only once a payload has decoded successfully, and
/// from then on `raw` always holds the most recent payload that did.
/// A later malformed payload degrades the reported status but never this
/// state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSync {
    raw: Bytes,
    available: bool,
}

impl ConfigSync {
    /// Returns true once a configuration has been stored.
    pub fn available(&self) -> bool {
        self.available
    }

    /// Returns the stored payload, or `None` while nothing is available.
    pub fn raw(&self) -> Option<&Bytes> {
        self.available.then_some(&self.raw)
    }

    /// Stores a validated payload and marks the configuration available.
    ///
    /// Callers must have decoded `raw` successfully first.
    pub(crate) fn store(&mut self, raw: Bytes) {
        debug_assert!(!raw.is_empty(), "validated payload cannot be empty");
        self.raw = raw;
        self.available = true;
    }
}

// ============================================================================
// NodeReadiness
// ============================================================================

/// How far along the node is toward serving the cluster.
///
/// Readiness is derived on demand from the install fact and the
/// synchronized configuration; it is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeReadiness {
    /// System preparation has not completed.
    NotInstalled,
    /// Prepared, but no configuration has arrived yet.
    AwaitingConfig,
    /// Prepared and configured.
    Ready,
}

impl NodeReadiness {
    /// Derives readiness from the two facts that define it.
    ///
    /// `NotInstalled` wins over `AwaitingConfig` when both apply.
    pub fn derive(installed: bool, config_available: bool) -> Self {
        match (installed, config_available) {
            (false, _) => Self::NotInstalled,
            (true, false) => Self::AwaitingConfig,
            (true, true) => Self::Ready,
        }
    }
}

impl std::fmt::Display for NodeReadiness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInstalled => write!(f, "not-installed"),
            Self::AwaitingConfig => write!(f, "awaiting-config"),
            Self::Ready => write!(f, "ready"),
        }
    }
}

// ============================================================================
// ProtocolState
// ============================================================================

/// The state machine's memory between triggers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolState {
    /// Publication bookkeeping per live relation.
    pub(crate) relations: BTreeMap<RelationId, PublishState>,

    /// The synchronized controller configuration.
    pub(crate) config: ConfigSync,
}

impl ProtocolState {
    /// Creates the state of a node that has seen nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored configuration payload, or `None` while no
    /// configuration is available.
    pub fn config(&self) -> Option<&Bytes> {
        self.config.raw()
    }

    /// Returns true once a configuration has been synchronized.
    pub fn config_available(&self) -> bool {
        self.config.available()
    }

    /// Returns the publication state of a relation, if it is tracked.
    pub fn publish_state(&self, relation: RelationId) -> Option<PublishState> {
        self.relations.get(&relation).copied()
    }

    /// Returns the number of tracked relations.
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }
}
