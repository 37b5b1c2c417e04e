//! The agent dispatcher.
//!
//! One [`Agent::dispatch`] call delivers one external trigger and runs to
//! completion: parked deferrals are re-attempted, the pure state machine is
//! consulted, effects are executed in order, and signals fan out into
//! further evaluation cycles. Nothing here inspects databag contents or
//! decides protocol questions; that all lives in `slurmd-protocol`.

use std::mem;
use std::path::PathBuf;

use slurmd_exchange::Exchange;
use slurmd_protocol::{Effect, NodeReadiness, Output, Signal, Snapshot, Trigger};
use slurmd_types::{keys, LocalNode, RelationId, SecretMaterial};

use crate::config::AgentConfig;
use crate::error::AgentResult;
use crate::ops::NodeOperations;
use crate::statefile::AgentState;
use crate::status::StatusSink;

/// The compute-node agent.
///
/// Generic over its collaborators so the binary can run against the
/// filesystem while tests script every seam:
///
/// - `E`: the relation databag exchange
/// - `O`: the machinery that mutates the node
/// - `S`: the operator-visible status sink
#[derive(Debug)]
pub struct Agent<E: Exchange, O: NodeOperations, S: StatusSink> {
    /// Identity and placement facts.
    pub config: AgentConfig,
    /// Relation databag exchange.
    pub exchange: E,
    /// Machinery that mutates the node.
    pub ops: O,
    /// Operator-visible status sink.
    pub status: S,
    /// Durable agent state (protocol state, deferrals, secret latch).
    pub state: AgentState,
    state_path: Option<PathBuf>,
}

impl<E, O, S> Agent<E, O, S>
where
    E: Exchange,
    O: NodeOperations,
    S: StatusSink,
{
    /// Creates an agent with in-memory state. Nothing is persisted.
    pub fn new(config: AgentConfig, exchange: E, ops: O, status: S) -> Self {
        Self {
            config,
            exchange,
            ops,
            status,
            state: AgentState::default(),
            state_path: None,
        }
    }

    /// Opens an agent with durable state under `config.data_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`](crate::AgentError) if an existing state file
    /// cannot be read or parsed. A missing file is a fresh agent, not an
    /// error.
    pub fn open(config: AgentConfig, exchange: E, ops: O, status: S) -> AgentResult<Self> {
        let state_path = config.state_path();
        let state = AgentState::load(&state_path)?;
        Ok(Self {
            config,
            exchange,
            ops,
            status,
            state,
            state_path: Some(state_path),
        })
    }

    /// Delivers one trigger to the agent.
    ///
    /// This will:
    /// 1. Cancel deferrals belonging to a relation that just broke
    /// 2. Re-deliver parked triggers, one attempt each
    /// 3. Run the trigger's own evaluation cycle
    /// 4. Persist the agent state
    ///
    /// Every relation-changed evaluation, fresh or re-delivered, starts
    /// with a munge-key check that can inject a secret delivery cycle.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`](crate::AgentError) when a collaborator fails
    /// (exchange I/O, node operation, state file). Protocol conditions such
    /// as missing or malformed remote data are not errors.
    pub fn dispatch(&mut self, trigger: Trigger) -> AgentResult<()> {
        tracing::debug!(event = trigger.name(), "dispatching");

        // A broken relation takes its parked triggers with it.
        if let Trigger::RelationBroken { relation } = &trigger {
            self.cancel_deferred(*relation);
        }

        self.redeliver_deferred()?;
        self.run_cycle(trigger)?;

        self.persist()
    }

    /// Derived readiness of the node right now.
    pub fn readiness(&self) -> NodeReadiness {
        NodeReadiness::derive(self.ops.installed(), self.state.protocol.config_available())
    }

    fn cancel_deferred(&mut self, relation: RelationId) {
        let before = self.state.deferred.len();
        self.state
            .deferred
            .retain(|parked| parked.relation() != Some(relation));
        let cancelled = before - self.state.deferred.len();
        if cancelled > 0 {
            tracing::info!(relation = %relation, cancelled, "cancelled deferred triggers");
        }
    }

    /// Re-delivers parked triggers, one attempt each, in arrival order.
    ///
    /// Triggers that defer again go back to the queue.
    fn redeliver_deferred(&mut self) -> AgentResult<()> {
        if self.state.deferred.is_empty() {
            return Ok(());
        }
        let parked = mem::take(&mut self.state.deferred);
        tracing::debug!(count = parked.len(), "re-delivering deferred triggers");
        for trigger in parked {
            self.run_cycle(trigger)?;
        }
        Ok(())
    }

    /// One evaluation cycle: secret check, snapshot, process, execute.
    fn run_cycle(&mut self, trigger: Trigger) -> AgentResult<()> {
        // The munge key goes out before the changed cycle runs, so the key
        // is in place before any restart this cycle triggers. Re-delivered
        // triggers take the same path as fresh ones.
        if let Some(material) = self.secret_follow_up(&trigger)? {
            self.run_cycle(Trigger::SecretAvailable { material })?;
        }

        let snapshot = self.snapshot(&trigger)?;
        tracing::trace!(event = trigger.name(), "processing trigger");

        let state = mem::take(&mut self.state.protocol);
        let (next, output) = state.process(&snapshot, trigger.clone());
        self.state.protocol = next;

        self.handle_output(trigger, output)
    }

    fn handle_output(&mut self, trigger: Trigger, output: Output) -> AgentResult<()> {
        for effect in output.effects {
            self.execute_effect(effect)?;
        }

        if output.defer {
            // Identical parked triggers collapse into one delivery.
            if !self.state.deferred.contains(&trigger) {
                tracing::debug!(event = trigger.name(), "deferred for re-delivery");
                self.state.deferred.push(trigger);
            }
        }

        for signal in output.signals {
            self.dispatch_signal(signal)?;
        }
        Ok(())
    }

    /// Runs a signal as its own evaluation cycle.
    ///
    /// Deferred triggers drain first, so a relation-created parked behind
    /// installation publishes before the post-install reconcile runs.
    fn dispatch_signal(&mut self, signal: Signal) -> AgentResult<()> {
        tracing::debug!(signal = ?signal, "dispatching signal");
        self.redeliver_deferred()?;
        self.run_cycle(Trigger::from(signal))
    }

    fn execute_effect(&mut self, effect: Effect) -> AgentResult<()> {
        match effect {
            Effect::PrepareSystem => self.ops.prepare_system()?,
            Effect::PublishPeerRecord { relation, record } => {
                self.exchange
                    .publish_unit_record(relation, &record.unit, &record)?;
            }
            Effect::WriteSecret { material } => self.ops.write_secret(&material)?,
            Effect::ApplyConfig { config } => self.ops.apply_config_and_restart(&config)?,
            Effect::SetStatus(status) => {
                self.state.last_status = Some(status.clone());
                self.status.set(status);
            }
        }
        Ok(())
    }

    /// Gathers local and remote facts for one cycle.
    ///
    /// Deferred triggers are stored bare and re-enriched here at every
    /// delivery, so a retry always observes current data.
    fn snapshot(&self, trigger: &Trigger) -> AgentResult<Snapshot> {
        let remote = match trigger.relation() {
            Some(relation) => self
                .exchange
                .remote_app_view(relation, &self.config.controller)?,
            None => None,
        };
        Ok(Snapshot::new(self.local_node(), remote))
    }

    fn local_node(&self) -> LocalNode {
        LocalNode {
            installed: self.ops.installed(),
            unit: self.config.unit.clone(),
            hostname: self.ops.hostname(),
            inventory: self.ops.inventory(),
            partition: self.config.partition.clone(),
            default_partition: self.config.default_partition,
            controller: self.config.controller.clone(),
        }
    }

    /// Detects a new munge key on a changed relation.
    ///
    /// The latch keeps secret delivery one-shot per distinct value while
    /// every overwrite from the controller still reaches the node.
    fn secret_follow_up(&mut self, trigger: &Trigger) -> AgentResult<Option<SecretMaterial>> {
        let Trigger::RelationChanged { relation } = trigger else {
            return Ok(None);
        };
        let Some(view) = self
            .exchange
            .remote_app_view(*relation, &self.config.controller)?
        else {
            return Ok(None);
        };
        let Some(value) = view.non_empty(keys::MUNGE_KEY) else {
            return Ok(None);
        };

        let material = SecretMaterial::from(value);
        if self.state.secret_seen.as_ref() == Some(&material) {
            return Ok(None);
        }
        tracing::info!(relation = %relation, "new munge key on relation");
        self.state.secret_seen = Some(material.clone());
        Ok(Some(material))
    }

    fn persist(&self) -> AgentResult<()> {
        if let Some(path) = &self.state_path {
            self.state.save(path)?;
        }
        Ok(())
    }
}
