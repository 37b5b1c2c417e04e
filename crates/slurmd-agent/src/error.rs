//! Agent error types.

use thiserror::Error;

use crate::ops::OpsError;
use crate::statefile::StateFileError;
use slurmd_exchange::ExchangeError;

/// Result type for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that can occur while dispatching events.
///
/// All of these are local operation failures. Protocol-level conditions
/// (missing remote data, malformed configuration) never surface here; the
/// state machine absorbs them as deferrals or status changes.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Error from the exchange (e.g., unreadable databag).
    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    /// Error from node operations (e.g., write to the data directory failed).
    #[error(transparent)]
    Ops(#[from] OpsError),

    /// Error loading or saving the durable agent state.
    #[error(transparent)]
    StateFile(#[from] StateFileError),
}
