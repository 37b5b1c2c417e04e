//! Protocol handlers.
//!
//! This module implements the handlers behind [`ProtocolState::process`]:
//! - Install and the install-complete cascade
//! - Relation lifecycle (created / joined / changed / departed / broken)
//! - Reconciliation (start, install-complete, config-available)
//! - Secret propagation

use bytes::Bytes;
use slurmd_types::{keys, RelationId, SecretMaterial, SlurmConfig, UnitName, UnitStatus};

use crate::effects::{Effect, Output, Signal};
use crate::state::{NodeReadiness, ProtocolState, PublishState};
use crate::trigger::{Snapshot, Trigger};

impl ProtocolState {
    // ========================================================================
    // Event Processing (Main Entry Point)
    // ========================================================================

    /// Processes a trigger and returns the new state and output.
    ///
    /// This is the only entry point of the state machine; every transition
    /// goes through it. The method is pure: it takes ownership of `self`,
    /// evaluates the trigger against the snapshot, and returns a new state
    /// plus the [`Output`] for the caller to execute.
    pub fn process(self, snapshot: &Snapshot, trigger: Trigger) -> (Self, Output) {
        match trigger {
            Trigger::Install => self.on_install(snapshot),
            Trigger::Start | Trigger::InstallComplete | Trigger::ConfigAvailable => {
                self.reconcile(snapshot)
            }
            Trigger::RelationCreated { relation } => self.on_relation_created(snapshot, relation),
            Trigger::RelationJoined { relation, unit } => self.on_relation_joined(relation, &unit),
            Trigger::RelationChanged { relation } => self.on_relation_changed(snapshot, relation),
            Trigger::RelationDeparted { relation, unit } => {
                self.on_relation_departed(relation, &unit)
            }
            Trigger::RelationBroken { relation } => self.on_relation_broken(relation),
            Trigger::SecretAvailable { material } => self.on_secret_available(material),
        }
    }

    // ========================================================================
    // Install
    // ========================================================================

    /// Prepares the node and announces completion.
    ///
    /// Preparation is idempotent at the operations layer, so repeat
    /// deliveries are harmless. The [`Signal::InstallComplete`] cascade is
    /// what re-delivers work that deferred while preparation was pending.
    pub(crate) fn on_install(self, snapshot: &Snapshot) -> (Self, Output) {
        tracing::info!(unit = %snapshot.node.unit, "preparing node for slurmd");

        let output = Output::with_effects(vec![
            Effect::PrepareSystem,
            Effect::SetStatus(UnitStatus::slurm_installed()),
        ])
        .with_signal(Signal::InstallComplete);

        (self, output)
    }

    // ========================================================================
    // Relation Lifecycle
    // ========================================================================

    /// Handles a relation coming into existence.
    ///
    /// The node record can only be published once system preparation has
    /// run, because the record carries the gathered hardware inventory.
    /// Until then the trigger defers and the relation is parked in
    /// [`PublishState::AwaitingInstall`].
    pub(crate) fn on_relation_created(
        mut self,
        snapshot: &Snapshot,
        relation: RelationId,
    ) -> (Self, Output) {
        if !snapshot.node.installed {
            tracing::debug!(
                relation = %relation,
                "node not yet prepared, deferring record publication"
            );
            self.relations.insert(relation, PublishState::AwaitingInstall);
            return (self, Output::deferred());
        }

        let record = snapshot.node.peer_record();
        tracing::info!(
            relation = %relation,
            unit = %record.unit,
            partition = %record.partition,
            "publishing node record"
        );
        self.relations.insert(relation, PublishState::Published);

        (
            self,
            Output::with_effect(Effect::PublishPeerRecord { relation, record }),
        )
    }

    /// Handles a remote unit joining a relation. Observability only.
    pub(crate) fn on_relation_joined(self, relation: RelationId, unit: &UnitName) -> (Self, Output) {
        tracing::debug!(relation = %relation, unit = %unit, "remote unit joined");
        (self, Output::empty())
    }

    /// Handles a change to the remote application databag.
    ///
    /// A missing or empty `slurm_config` value means the controller has not
    /// written yet; the trigger defers without touching state. A payload
    /// that fails to decode blocks the unit but is otherwise ignored; the
    /// previously synchronized configuration, if any, stays authoritative.
    pub(crate) fn on_relation_changed(
        mut self,
        snapshot: &Snapshot,
        relation: RelationId,
    ) -> (Self, Output) {
        let Some(value) = snapshot.remote_value(keys::SLURM_CONFIG) else {
            tracing::debug!(
                relation = %relation,
                key = keys::SLURM_CONFIG,
                "controller has not published a configuration, deferring"
            );
            return (self, Output::deferred());
        };

        match SlurmConfig::parse(value.as_bytes()) {
            Ok(_) => {
                let raw = Bytes::copy_from_slice(value.as_bytes());
                tracing::info!(
                    relation = %relation,
                    bytes = raw.len(),
                    "synchronized controller configuration"
                );
                self.config.store(raw);
                (self, Output::empty().with_signal(Signal::ConfigAvailable))
            }
            Err(error) => {
                tracing::debug!(relation = %relation, %error, "configuration failed to decode");
                (
                    self,
                    Output::with_effect(Effect::SetStatus(UnitStatus::json_decode_error())),
                )
            }
        }
    }

    /// Handles a remote unit leaving a relation. Observability only.
    pub(crate) fn on_relation_departed(
        self,
        relation: RelationId,
        unit: &UnitName,
    ) -> (Self, Output) {
        tracing::debug!(relation = %relation, unit = %unit, "remote unit departed");
        (self, Output::empty())
    }

    /// Handles a relation ceasing to exist.
    ///
    /// Publication bookkeeping for the relation is dropped; the last
    /// synchronized configuration is retained so the node stays serviceable
    /// across a controller bounce.
    pub(crate) fn on_relation_broken(mut self, relation: RelationId) -> (Self, Output) {
        self.relations.remove(&relation);
        tracing::info!(
            relation = %relation,
            config_retained = self.config.available(),
            "relation broken"
        );
        (self, Output::empty())
    }

    // ========================================================================
    // Reconciliation
    // ========================================================================

    /// Converges the node toward its readiness target.
    ///
    /// Runs on start, after install completes, and whenever a configuration
    /// becomes available. Applying an unchanged configuration again is safe;
    /// the loop never diffs old against new.
    pub(crate) fn reconcile(self, snapshot: &Snapshot) -> (Self, Output) {
        let readiness = NodeReadiness::derive(snapshot.node.installed, self.config.available());
        tracing::debug!(%readiness, "reconciling");

        match readiness {
            NodeReadiness::Ready => self.apply_stored_config(),
            NodeReadiness::AwaitingConfig => {
                let status = UnitStatus::need_controller(&snapshot.node.controller);
                (self, Output::with_effect(Effect::SetStatus(status)).and_defer())
            }
            NodeReadiness::NotInstalled => (
                self,
                Output::with_effect(Effect::SetStatus(UnitStatus::waiting_on_install()))
                    .and_defer(),
            ),
        }
    }

    /// Decodes and applies the stored configuration.
    ///
    /// Only reachable through `NodeReadiness::Ready`, so a payload is
    /// always stored by the time this runs.
    fn apply_stored_config(self) -> (Self, Output) {
        debug_assert!(self.config.available(), "Ready implies a stored payload");
        let Some(raw) = self.config.raw().cloned() else {
            return (self, Output::empty());
        };

        match SlurmConfig::parse(&raw) {
            Ok(config) => {
                tracing::info!(bytes = raw.len(), "applying synchronized configuration");
                (
                    self,
                    Output::with_effects(vec![
                        Effect::ApplyConfig { config },
                        Effect::SetStatus(UnitStatus::config_available()),
                    ]),
                )
            }
            Err(error) => {
                // Possible if the persisted state file was hand-edited.
                tracing::warn!(%error, "stored configuration no longer decodes");
                (
                    self,
                    Output::with_effect(Effect::SetStatus(UnitStatus::json_decode_error())),
                )
            }
        }
    }

    // ========================================================================
    // Secret Propagation
    // ========================================================================

    /// Handles secret material arriving from the controller.
    ///
    /// The material is opaque: no decoding, no validation beyond presence.
    /// Each delivery overwrites whatever key the node held before.
    pub(crate) fn on_secret_available(self, material: SecretMaterial) -> (Self, Output) {
        tracing::info!(bytes = material.as_bytes().len(), "munge key received");

        let output = Output::with_effects(vec![
            Effect::WriteSecret { material },
            Effect::SetStatus(UnitStatus::munge_key_written()),
        ]);

        (self, output)
    }
}

#[cfg(test)]
impl ProtocolState {
    /// Test hook: a state with a configuration already synchronized.
    pub(crate) fn with_synchronized_config(mut self, raw: &[u8]) -> Self {
        self.config.store(Bytes::copy_from_slice(raw));
        self
    }
}
