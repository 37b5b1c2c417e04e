//! # slurmd-types: Core types for the slurmd agent
//!
//! This crate contains shared types used across the slurmd agent:
//! - Entity IDs ([`RelationId`], [`UnitName`], [`AppName`], [`PartitionName`])
//! - Operator-visible status ([`UnitStatus`])
//! - The published node record ([`PeerRecord`])
//! - The controller configuration document ([`SlurmConfig`])
//! - Secret material ([`SecretMaterial`])
//! - Dispatch-time snapshots ([`LocalNode`], [`RemoteView`])

use std::{collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

// ============================================================================
// Well-known exchange keys
// ============================================================================

/// Application-scoped databag keys written by the controller.
pub mod keys {
    /// JSON configuration document authored by the controller.
    pub const SLURM_CONFIG: &str = "slurm_config";
    /// Shared authentication key distributed by the controller.
    pub const MUNGE_KEY: &str = "munge_key";
}

// ============================================================================
// Entity IDs
// ============================================================================

/// Unique identifier for a relation instance with a remote application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationId(u64);

impl RelationId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl Display for RelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RelationId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<RelationId> for u64 {
    fn from(id: RelationId) -> Self {
        id.0
    }
}

/// Name of a unit (one running instance of an application).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitName(String);

impl UnitName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UnitName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UnitName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for UnitName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Name of an application (a set of units running the same workload).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AppName(String);

impl AppName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AppName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AppName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for AppName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Name of the scheduler partition a node enlists in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartitionName(String);

impl PartitionName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PartitionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PartitionName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

// ============================================================================
// Unit status - operator-visible, advisory only
// ============================================================================

/// Operator-visible status of the local unit.
///
/// Statuses are advisory: they report progress and faults to a human but
/// carry no control-flow weight of their own. The agent recomputes them
/// freely; the most recent write wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum UnitStatus {
    /// The unit is operating normally.
    Active(String),
    /// The unit needs operator or remote-application intervention.
    Blocked(String),
    /// The unit is waiting on work it will finish on its own.
    Waiting(String),
}

impl UnitStatus {
    pub fn active(message: impl Into<String>) -> Self {
        Self::Active(message.into())
    }

    pub fn blocked(message: impl Into<String>) -> Self {
        Self::Blocked(message.into())
    }

    pub fn waiting(message: impl Into<String>) -> Self {
        Self::Waiting(message.into())
    }

    /// Status after system preparation has completed.
    pub fn slurm_installed() -> Self {
        Self::active("Slurm Installed")
    }

    /// Status after a stored configuration has been applied.
    pub fn config_available() -> Self {
        Self::active("config available")
    }

    /// Status after the munge key has been written out.
    pub fn munge_key_written() -> Self {
        Self::active("munge key written")
    }

    /// Status when the controller payload fails to decode as JSON.
    pub fn json_decode_error() -> Self {
        Self::blocked("Error decoding JSON, please debug.")
    }

    /// Status while no configuration has arrived from the controller.
    pub fn need_controller(controller: &AppName) -> Self {
        Self::blocked(format!("Blocked need relation to {controller}."))
    }

    /// Status while system preparation has not yet run.
    pub fn waiting_on_install() -> Self {
        Self::waiting("Waiting on install to complete...")
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Active(_) => "active",
            Self::Blocked(_) => "blocked",
            Self::Waiting(_) => "waiting",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Active(m) | Self::Blocked(m) | Self::Waiting(m) => m,
        }
    }
}

impl Display for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

// ============================================================================
// PeerRecord - the node record published toward the controller
// ============================================================================

/// The record a compute node publishes into its unit-scoped databag so the
/// controller can enlist it.
///
/// Publication is idempotent: the record is derived from local facts and
/// re-publishing an identical record is always safe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRecord {
    /// The unit whose databag slot this record occupies.
    pub unit: UnitName,
    pub hostname: String,
    /// Hardware inventory description, opaque to the agent.
    pub inventory: String,
    pub partition: PartitionName,
    /// Whether `partition` is the cluster's default partition.
    pub default_partition: bool,
}

impl PeerRecord {
    /// Renders the record into databag form.
    ///
    /// The wire keys are `hostname`, `inventory`, `partition`, and `default`;
    /// the default flag is encoded as the lowercase string `"true"` or
    /// `"false"`. The unit name addresses the databag slot and is not itself
    /// a key.
    pub fn to_bag(&self) -> BTreeMap<String, String> {
        let mut bag = BTreeMap::new();
        bag.insert("hostname".to_string(), self.hostname.clone());
        bag.insert("inventory".to_string(), self.inventory.clone());
        bag.insert("partition".to_string(), self.partition.as_str().to_string());
        bag.insert(
            "default".to_string(),
            if self.default_partition { "true" } else { "false" }.to_string(),
        );
        bag
    }
}

// ============================================================================
// SlurmConfig - the controller-authored configuration document
// ============================================================================

/// Error raised when a controller payload cannot be decoded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The payload was not well-formed JSON.
    #[error("configuration is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The cluster configuration document authored by the controller.
///
/// The agent treats the document as opaque beyond well-formedness: any JSON
/// value the controller writes is accepted and handed to the node operations
/// layer verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlurmConfig(serde_json::Value);

impl SlurmConfig {
    /// Decodes a raw controller payload.
    pub fn parse(raw: &[u8]) -> Result<Self, ConfigError> {
        Ok(Self(serde_json::from_slice(raw)?))
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl Display for SlurmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// SecretMaterial - the munge key
// ============================================================================

/// Opaque secret bytes delivered by the controller (the munge key).
///
/// The agent performs no validation beyond presence and no decoding; each
/// delivery overwrites the previous key. The buffer is zeroed on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SecretMaterial(Vec<u8>);

impl SecretMaterial {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the key bytes.
        write!(f, "SecretMaterial({} bytes)", self.0.len())
    }
}

impl From<&str> for SecretMaterial {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

// ============================================================================
// LocalNode - snapshot of local facts at dispatch time
// ============================================================================

/// A point-in-time snapshot of the local node, gathered immediately before
/// an event is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalNode {
    /// Whether system preparation has completed on this node.
    pub installed: bool,
    pub unit: UnitName,
    pub hostname: String,
    pub inventory: String,
    pub partition: PartitionName,
    pub default_partition: bool,
    /// The controller application this node expects configuration from.
    pub controller: AppName,
}

impl LocalNode {
    /// Builds the record this node publishes toward the controller.
    pub fn peer_record(&self) -> PeerRecord {
        PeerRecord {
            unit: self.unit.clone(),
            hostname: self.hostname.clone(),
            inventory: self.inventory.clone(),
            partition: self.partition.clone(),
            default_partition: self.default_partition,
        }
    }
}

// ============================================================================
// RemoteView - snapshot of a remote application databag
// ============================================================================

/// A point-in-time snapshot of a remote application's databag.
///
/// Views are read-only: the agent never writes into application scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteView(BTreeMap<String, String>);

impl RemoteView {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Like [`get`](Self::get), but treats an empty value as absent.
    ///
    /// Databags cannot distinguish "key never written" from "key written
    /// empty", so both read as missing data.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|value| !value.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, String>> for RemoteView {
    fn from(bag: BTreeMap<String, String>) -> Self {
        Self(bag)
    }
}

impl FromIterator<(String, String)> for RemoteView {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests;
