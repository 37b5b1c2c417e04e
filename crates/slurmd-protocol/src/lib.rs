//! # slurmd-protocol: Configuration synchronization state machine
//!
//! This crate implements the core protocol of the slurmd agent as a pure,
//! deterministic state machine following the FCIS pattern.
//!
//! ## Key Principles
//!
//! - **No IO**: the state machine never touches disk, network, or databags
//! - **No clocks**: retry timing belongs to the dispatcher, not the machine
//! - **Pure functions**: `process(state, snapshot, trigger) -> (state, output)`
//!
//! ## Architecture
//!
//! - [`trigger`]: Triggers that drive transitions, plus the [`Snapshot`]
//!   of local and remote facts gathered at dispatch time
//! - [`effects`]: Effects for the shell to execute, signals for it to
//!   re-dispatch, and the defer marker
//! - [`state`]: Per-relation publish bookkeeping and the synchronized
//!   configuration ([`ConfigSync`])
//! - [`protocol`]: The `process` entry point and per-trigger handlers
//!
//! ## Dispatch contract
//!
//! The caller (the agent dispatcher) is responsible for:
//! 1. Building a fresh [`Snapshot`] immediately before each dispatch
//! 2. Executing the effects in order
//! 3. Re-dispatching each signal as its own evaluation cycle
//! 4. Parking the trigger for re-delivery when `defer` is set

pub mod effects;
pub mod protocol;
pub mod state;
pub mod trigger;


// Re-export commonly used items
pub use effects::{Effect, Output, Signal};
pub use state::{ConfigSync, NodeReadiness, ProtocolState, PublishState};
pub use trigger::{Snapshot, Trigger};
