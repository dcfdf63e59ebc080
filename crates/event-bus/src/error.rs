//! Error types for the event bus

use thiserror::Error;

/// Result type for event bus operations
pub type BusResult<T> = Result<T, BusError>;

/// Errors surfaced by the event bus
#[derive(Debug, Error)]
pub enum BusError {
    /// A pending wait elapsed before a matching event was emitted
    #[error("timed out after {timeout_ms} ms waiting for event")]
    Timeout { timeout_ms: u64 },

    /// The pending wait was dropped before an event arrived, e.g. because the
    /// registration was removed out from under it
    #[error("event bus dropped the pending wait")]
    Closed,
}
