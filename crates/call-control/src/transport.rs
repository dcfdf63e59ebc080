//! Transport seam
//!
//! Everything below the call-control layer - SIP signaling, SDP/ICE, media -
//! lives behind [`SessionTransport`]. The trait is deliberately loose: every
//! operation is optional, advertised through [`TransportCapabilities`], and
//! the facade checks the flag before delegating so a partially-capable or
//! mocked transport fails with a typed error instead of a surprise.

use async_trait::async_trait;
use thiserror::Error;

use crate::call::CallId;

/// Error surfaced by a transport-level session operation
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    /// Create a transport error from a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for TransportError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Which optional operations a transport session implements.
///
/// Defaults to nothing; transports opt in to exactly what they support.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportCapabilities {
    /// `hold()` / `unhold()` are available
    pub can_hold: bool,
    /// `set_muted()` is available
    pub can_mute: bool,
    /// `send_dtmf()` is available
    pub can_send_dtmf: bool,
    /// `transfer()` (blind) is available
    pub can_transfer: bool,
    /// `attended_transfer()` is available
    pub can_attended_transfer: bool,
    /// `terminate()` is available
    pub can_terminate: bool,
}

impl TransportCapabilities {
    /// Capabilities with every operation available
    pub fn full() -> Self {
        Self {
            can_hold: true,
            can_mute: true,
            can_send_dtmf: true,
            can_transfer: true,
            can_attended_transfer: true,
            can_terminate: true,
        }
    }
}

/// A transport-level call session.
///
/// Implementations advertise what they support via [`capabilities`]; the
/// default method bodies reject, so a transport only implements the
/// operations it advertises.
///
/// [`capabilities`]: SessionTransport::capabilities
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Stable identifier of the underlying session
    fn id(&self) -> &str;

    /// Which optional operations this transport implements
    fn capabilities(&self) -> TransportCapabilities;

    /// Place the call on hold
    async fn hold(&self) -> TransportResult<()> {
        Err(TransportError::new("hold is not supported by this transport"))
    }

    /// Resume the call from hold
    async fn unhold(&self) -> TransportResult<()> {
        Err(TransportError::new("unhold is not supported by this transport"))
    }

    /// Mute or unmute the local audio path. Synchronous by contract: muting
    /// requires no network round-trip.
    fn set_muted(&self, _muted: bool) -> TransportResult<()> {
        Err(TransportError::new("mute is not supported by this transport"))
    }

    /// Send DTMF tones on the call
    async fn send_dtmf(&self, _tones: &str) -> TransportResult<()> {
        Err(TransportError::new("DTMF is not supported by this transport"))
    }

    /// Redirect the call to `target` (blind transfer). The session may or
    /// may not terminate as a side effect, depending on the transport.
    async fn transfer(&self, _target: &str, _extra_headers: &[(String, String)]) -> TransportResult<()> {
        Err(TransportError::new("transfer is not supported by this transport"))
    }

    /// Complete a three-way handoff to `target` using an already-established
    /// consultation call
    async fn attended_transfer(&self, _target: &str, _consultation_call_id: &CallId) -> TransportResult<()> {
        Err(TransportError::new(
            "attended transfer is not supported by this transport",
        ))
    }

    /// End the call
    async fn terminate(&self) -> TransportResult<()> {
        Err(TransportError::new(
            "terminate is not supported by this transport",
        ))
    }
}

/// Lifecycle notification from the transport, translated by the session
/// facade into a [`CallState`](crate::call::CallState) transition
#[derive(Debug, Clone)]
pub enum TransportSessionEvent {
    /// Remote party is being alerted
    Ringing,
    /// Early media started flowing
    EarlyMedia,
    /// Call was answered
    Answered,
    /// Remote party placed the call on hold
    RemoteHold,
    /// Remote party resumed the call
    RemoteResume,
    /// Teardown started
    Terminating,
    /// Call ended
    Terminated {
        /// Why the call ended, when the transport knows
        reason: Option<String>,
    },
    /// Call failed
    Failed {
        /// Failure description from the transport
        reason: String,
    },
}
