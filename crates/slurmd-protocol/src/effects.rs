//! Effects and signals produced by the state machine.

use slurmd_types::{PeerRecord, RelationId, SecretMaterial, SlurmConfig, UnitStatus};

// ============================================================================
// Effect
// ============================================================================

/// An action the shell must execute on behalf of the state machine.
///
/// Effects are executed in emission order. The state machine never performs
/// them itself; it only describes them.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Prepare the node to run slurmd (package install, directories, users).
    PrepareSystem,
    /// Publish the node record into the unit-scoped databag of `relation`.
    PublishPeerRecord {
        relation: RelationId,
        record: PeerRecord,
    },
    /// Write the munge key out to the node.
    WriteSecret { material: SecretMaterial },
    /// Render the configuration and restart the slurmd daemon.
    ApplyConfig { config: SlurmConfig },
    /// Report operator-visible status.
    SetStatus(UnitStatus),
}

// ============================================================================
// Signal
// ============================================================================

/// A protocol-internal occurrence the dispatcher turns back into a trigger.
///
/// Signals let one evaluation cycle schedule another without the state
/// machine ever calling itself: the dispatcher re-enters `process` with a
/// fresh snapshot for each signal, draining deferred triggers first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// System preparation has run; deferred work may now proceed.
    InstallComplete,
    /// A configuration payload was stored; the node should reconcile.
    ConfigAvailable,
}

// ============================================================================
// Output
// ============================================================================

/// Output produced by one evaluation cycle of the state machine.
///
/// The caller (the dispatcher) is responsible for:
/// 1. Executing the effects in order
/// 2. Re-dispatching each signal as its own evaluation cycle
/// 3. Parking the trigger for re-delivery if `defer` is set
#[derive(Debug, Default, PartialEq)]
pub struct Output {
    /// Actions for the shell to execute.
    pub effects: Vec<Effect>,

    /// Follow-on occurrences to dispatch after the effects have run.
    pub signals: Vec<Signal>,

    /// Whether the trigger should be re-delivered once conditions change.
    pub defer: bool,
}

impl Output {
    /// Creates an empty output (no effects, no signals, no deferral).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates output with a single effect.
    pub fn with_effect(effect: Effect) -> Self {
        Self::with_effects(vec![effect])
    }

    /// Creates output with effects only.
    pub fn with_effects(effects: Vec<Effect>) -> Self {
        Self {
            effects,
            signals: Vec::new(),
            defer: false,
        }
    }

    /// Creates output that only asks for the trigger to be re-delivered.
    pub fn deferred() -> Self {
        Self {
            effects: Vec::new(),
            signals: Vec::new(),
            defer: true,
        }
    }

    /// Adds a signal to the output.
    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signals.push(signal);
        self
    }

    /// Marks the trigger for re-delivery.
    pub fn and_defer(mut self) -> Self {
        self.defer = true;
        self
    }

    /// Returns true if there is nothing to execute, signal, or re-deliver.
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty() && self.signals.is_empty() && !self.defer
    }
}
