//! Agent configuration.

use std::path::PathBuf;

use slurmd_types::{AppName, PartitionName, UnitName};

/// Agent configuration.
///
/// Identity and placement facts that do not change while the agent runs.
/// Node facts that CAN change (hostname, install state, hardware inventory)
/// come from [`NodeOperations`](crate::NodeOperations) instead, so every
/// dispatch observes them fresh.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Unit identity of this agent (e.g. `slurmd/0`).
    pub unit: UnitName,
    /// The controller application configuration is expected from.
    pub controller: AppName,
    /// Partition this node serves.
    pub partition: PartitionName,
    /// Whether the partition is advertised as the cluster default.
    pub default_partition: bool,
    /// Directory for durable agent state.
    pub data_dir: PathBuf,
}

impl AgentConfig {
    /// Creates a new agent configuration.
    pub fn new(unit: impl Into<UnitName>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            unit: unit.into(),
            controller: AppName::new("slurmctld"),
            partition: PartitionName::new("slurmd"),
            default_partition: false,
            data_dir: data_dir.into(),
        }
    }

    /// Sets the controller application name.
    pub fn with_controller(mut self, controller: impl Into<AppName>) -> Self {
        self.controller = controller.into();
        self
    }

    /// Sets the partition this node serves.
    pub fn with_partition(mut self, partition: impl Into<PartitionName>) -> Self {
        self.partition = partition.into();
        self
    }

    /// Advertises the partition as the cluster default.
    pub fn with_default_partition(mut self) -> Self {
        self.default_partition = true;
        self
    }

    /// Path of the durable agent state file.
    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join("agent-state.json")
    }

    /// Root directory of the file-backed exchange.
    pub fn exchange_dir(&self) -> PathBuf {
        self.data_dir.join("relations")
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::new("slurmd/0", "./data")
    }
}
