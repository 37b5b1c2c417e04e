//! Operator-visible status reporting.
//!
//! Status strings are advisory: nothing in the protocol branches on them.
//! The dispatcher still records the most recent one durably so `status` can
//! answer without replaying events.

use std::fmt::Debug;

use slurmd_types::UnitStatus;

/// Sink for operator-visible status transitions.
pub trait StatusSink: Debug {
    /// Reports a new status. Repeat reports of the same status are allowed.
    fn set(&mut self, status: UnitStatus);
}

/// A sink that logs transitions through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingStatus {
    current: Option<UnitStatus>,
}

impl TracingStatus {
    /// Creates a new tracing status sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently reported status.
    pub fn current(&self) -> Option<&UnitStatus> {
        self.current.as_ref()
    }
}

impl StatusSink for TracingStatus {
    fn set(&mut self, status: UnitStatus) {
        tracing::info!(kind = status.kind(), message = status.message(), "unit status");
        self.current = Some(status);
    }
}

/// A sink that collects every reported status, for testing.
#[derive(Debug, Clone, Default)]
pub struct StatusRecorder {
    /// All reported statuses, in order.
    pub history: Vec<UnitStatus>,
}

impl StatusRecorder {
    /// Creates a new status recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently reported status.
    pub fn last(&self) -> Option<&UnitStatus> {
        self.history.last()
    }
}

impl StatusSink for StatusRecorder {
    fn set(&mut self, status: UnitStatus) {
        self.history.push(status);
    }
}
