//! # slurmd-exchange: Relation databag access
//!
//! This crate defines the [`Exchange`] trait that abstracts over how the
//! agent reads and writes relation databags:
//!
//! - [`MemoryExchange`]: in-process bags for tests and simulation
//! - [`FileExchange`]: directory-backed bags used by the agent binary
//!
//! # Design
//!
//! The exchange is eventually consistent and intentionally simple:
//! - Reads return a point-in-time snapshot; concurrent remote writes may
//!   not be visible yet
//! - Writes are last-write-wins per key
//! - A writer always observes its own completed writes
//!
//! Delivery timing is the dispatcher's problem: the protocol defers when a
//! snapshot is missing data and re-reads on re-delivery.
//!
//! # FCIS Pattern
//!
//! The exchange is part of the imperative shell. The pure protocol state
//! machine consumes snapshots and emits publish effects; the exchange
//! performs the actual reads and writes.

use std::fmt::Debug;
use std::path::PathBuf;

use slurmd_types::{AppName, PeerRecord, RelationId, RemoteView, UnitName};

mod file;
mod memory;

#[cfg(test)]
mod tests;

pub use file::FileExchange;
pub use memory::MemoryExchange;

// ============================================================================
// Exchange Trait
// ============================================================================

/// Abstraction for reading and writing relation databags.
///
/// Application-scoped data is remote-authored and read-only to the agent;
/// the agent writes only its own unit-scoped record.
pub trait Exchange: Debug + Send {
    /// Takes a snapshot of a remote application's databag.
    ///
    /// Returns `Ok(None)` when no databag exists for the relation. An empty
    /// view is a live relation whose remote side has not written yet.
    fn remote_app_view(
        &self,
        relation: RelationId,
        app: &AppName,
    ) -> Result<Option<RemoteView>, ExchangeError>;

    /// Publishes the local unit's node record into a relation.
    ///
    /// Overwrites any previously published record; publication is
    /// idempotent.
    fn publish_unit_record(
        &mut self,
        relation: RelationId,
        unit: &UnitName,
        record: &PeerRecord,
    ) -> Result<(), ExchangeError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by exchange implementations.
///
/// These are local operation failures: the databag medium itself broke.
/// "The remote side has not written yet" is not an error; it surfaces as an
/// absent key in the snapshot.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// Filesystem I/O error.
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    /// A databag file exists but does not parse.
    #[error("malformed databag at {path}: {source}")]
    MalformedBag {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A databag could not be encoded for writing.
    #[error("failed to encode databag for {path}: {source}")]
    Encode {
        path: PathBuf,
        source: serde_json::Error,
    },
}
