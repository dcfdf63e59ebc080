//! Error types for the call-control layer
//!
//! The taxonomy is deliberately small: every operation in this crate fails
//! with one of these variants, and no operation retries on its own. Where a
//! transfer record exists, the failure text is also mirrored into the record
//! so passive observers see it without catching errors.

use thiserror::Error;

use crate::call::CallId;
use sipline_event_bus::BusError;

/// Result type for call-control operations
pub type CallControlResult<T> = Result<T, CallControlError>;

/// Errors that can occur in the call-control layer
#[derive(Debug, Error)]
pub enum CallControlError {
    /// A required collaborator or input was missing or invalid
    #[error("precondition failed: {message}")]
    Precondition { message: String },

    /// The call is not present in the call registry
    #[error("call not found: {call_id}")]
    CallNotFound { call_id: CallId },

    /// The transport session does not implement a required capability
    #[error("{capability} is not implemented")]
    NotImplemented { capability: String },

    /// A single-flight guarantee was violated
    #[error("{message}")]
    TransferConflict { message: String },

    /// The transport accepted the request but reported failure
    #[error("operation failed: {reason}")]
    OperationFailure { reason: String },

    /// An awaited event did not arrive in time
    #[error("operation timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
}

impl CallControlError {
    /// Create a precondition error
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    /// Create a call-not-found error
    pub fn call_not_found(call_id: CallId) -> Self {
        Self::CallNotFound { call_id }
    }

    /// Create a not-implemented error naming the missing capability,
    /// e.g. `"CallSession.transfer()"`
    pub fn not_implemented(capability: impl Into<String>) -> Self {
        Self::NotImplemented {
            capability: capability.into(),
        }
    }

    /// Create a transfer-conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::TransferConflict {
            message: message.into(),
        }
    }

    /// Create an operation-failure error
    pub fn operation_failure(reason: impl Into<String>) -> Self {
        Self::OperationFailure {
            reason: reason.into(),
        }
    }
}

impl From<BusError> for CallControlError {
    fn from(err: BusError) -> Self {
        match err {
            BusError::Timeout { timeout_ms } => Self::Timeout { timeout_ms },
            BusError::Closed => Self::OperationFailure {
                reason: err.to_string(),
            },
        }
    }
}
