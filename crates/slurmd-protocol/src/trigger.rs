//! Triggers that drive the state machine, and the facts they are
//! evaluated against.

use serde::{Deserialize, Serialize};
use slurmd_types::{LocalNode, RelationId, RemoteView, SecretMaterial, UnitName};

use crate::effects::Signal;

// ============================================================================
// Trigger
// ============================================================================

/// An occurrence the state machine reacts to.
///
/// Triggers carry identity only; the data they are evaluated against lives
/// in the [`Snapshot`] built at dispatch time. This is what makes deferral
/// safe: a re-delivered trigger observes current data, not the data that
/// existed when it was first raised.
///
/// Triggers are serializable so the dispatcher can park deferred ones
/// across process invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// The node should prepare itself to run slurmd.
    Install,
    /// System preparation finished (raised via [`Signal::InstallComplete`]).
    InstallComplete,
    /// The agent started; reconcile against whatever is known.
    Start,
    /// A configuration became available (raised via
    /// [`Signal::ConfigAvailable`]).
    ConfigAvailable,
    /// A relation with a remote application came into existence.
    RelationCreated { relation: RelationId },
    /// A remote unit joined an existing relation.
    RelationJoined { relation: RelationId, unit: UnitName },
    /// A remote unit (re)wrote data on the relation.
    RelationChanged { relation: RelationId },
    /// A remote unit left the relation.
    RelationDeparted { relation: RelationId, unit: UnitName },
    /// The relation ceased to exist.
    RelationBroken { relation: RelationId },
    /// Secret material arrived from the controller.
    SecretAvailable { material: SecretMaterial },
}

impl Trigger {
    /// The relation this trigger belongs to, if any.
    ///
    /// Used by the dispatcher to cancel deferrals when their relation goes
    /// away.
    pub fn relation(&self) -> Option<RelationId> {
        match self {
            Self::RelationCreated { relation }
            | Self::RelationJoined { relation, .. }
            | Self::RelationChanged { relation }
            | Self::RelationDeparted { relation, .. }
            | Self::RelationBroken { relation } => Some(*relation),
            Self::Install
            | Self::InstallComplete
            | Self::Start
            | Self::ConfigAvailable
            | Self::SecretAvailable { .. } => None,
        }
    }

    /// Short name for structured logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::InstallComplete => "install-complete",
            Self::Start => "start",
            Self::ConfigAvailable => "config-available",
            Self::RelationCreated { .. } => "relation-created",
            Self::RelationJoined { .. } => "relation-joined",
            Self::RelationChanged { .. } => "relation-changed",
            Self::RelationDeparted { .. } => "relation-departed",
            Self::RelationBroken { .. } => "relation-broken",
            Self::SecretAvailable { .. } => "secret-available",
        }
    }
}

impl From<Signal> for Trigger {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::InstallComplete => Self::InstallComplete,
            Signal::ConfigAvailable => Self::ConfigAvailable,
        }
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Local and remote facts gathered immediately before a dispatch.
///
/// A trigger is always evaluated against a snapshot taken at dispatch time,
/// never against data captured when the trigger was raised.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Facts about the local node.
    pub node: LocalNode,
    /// The controller application's databag, if a relation with it exists
    /// and the dispatcher could read it.
    pub remote: Option<RemoteView>,
}

impl Snapshot {
    pub fn new(node: LocalNode, remote: Option<RemoteView>) -> Self {
        Self { node, remote }
    }

    /// Reads a non-empty value from the remote application databag.
    ///
    /// Returns `None` when no remote view exists, the key is absent, or the
    /// value is empty; the three cases are indistinguishable to the
    /// protocol and all mean "not yet available".
    pub fn remote_value(&self, key: &str) -> Option<&str> {
        self.remote.as_ref().and_then(|view| view.non_empty(key))
    }
}
