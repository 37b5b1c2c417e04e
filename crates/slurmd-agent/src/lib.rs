//! # slurmd-agent: compute-node agent for the Slurm workload manager
//!
//! This crate is the imperative shell around the pure protocol in
//! `slurmd-protocol`. It delivers lifecycle and relation triggers, executes
//! the effects the state machine asks for, parks deferred triggers for
//! re-delivery, and keeps everything durable across process invocations.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                            Agent                               │
//! │  ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌────────────┐  │
//! │  │ Triggers │ → │ Deferral  │ → │ Protocol │ → │   Effect   │  │
//! │  │ (events) │   │ queue     │   │  (pure)  │   │  executor  │  │
//! │  └──────────┘   └───────────┘   └──────────┘   └────────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Effects fan out to the collaborator seams: [`NodeOperations`] mutates
//! the node, the exchange publishes databags, [`StatusSink`] reports
//! operator-visible status. Each seam has a file-backed implementation for
//! the binary and a scripted one for tests.
//!
//! ## Usage
//!
//! ```ignore
//! use slurmd_agent::{Agent, AgentConfig, FileNodeOps, TracingStatus};
//! use slurmd_exchange::FileExchange;
//! use slurmd_protocol::Trigger;
//!
//! let config = AgentConfig::new("slurmd/0", "/var/lib/slurmd-agent");
//! let exchange = FileExchange::new(config.exchange_dir());
//! let ops = FileNodeOps::new(&config.data_dir);
//! let mut agent = Agent::open(config, exchange, ops, TracingStatus::new())?;
//! agent.dispatch(Trigger::Install)?;
//! ```

mod agent;
mod config;
mod error;
pub mod ops;
mod statefile;
pub mod status;

pub use agent::Agent;
pub use config::AgentConfig;
pub use error::{AgentError, AgentResult};
pub use ops::{FileNodeOps, NodeOperations, OpsError, ScriptedNodeOps};
pub use statefile::{AgentState, StateFileError};
pub use status::{StatusRecorder, StatusSink, TracingStatus};
