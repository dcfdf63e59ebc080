//! Call event family published on the shared event bus
//!
//! Every state transition a [`CallSession`](crate::session::CallSession)
//! goes through is republished here so any number of independent observers
//! (UI, transfer controller, logging) converge on the same truth without
//! polling. Errors travel as their own variant rather than being folded
//! into state changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::call::{CallId, CallState};
use sipline_event_bus::{BusEvent, EventBus};

/// Discriminants of [`CallEvent`], used for subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallEventKind {
    /// A call changed lifecycle state
    StateChanged,
    /// Local hold was engaged or released
    HoldStateChanged,
    /// Local mute was engaged or released
    MuteStateChanged,
    /// DTMF tones were sent
    DtmfSent,
    /// A transfer was requested on a call
    TransferRequested,
    /// An operation on a call failed
    Error,
}

/// Events emitted by call sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CallEvent {
    /// A call changed lifecycle state
    StateChanged {
        /// Call that changed state
        call_id: CallId,
        /// State before the transition, if known
        previous_state: Option<CallState>,
        /// State after the transition
        new_state: CallState,
        /// Why the transition happened
        reason: Option<String>,
        /// When the transition happened
        timestamp: DateTime<Utc>,
    },

    /// Local hold was engaged or released
    HoldStateChanged {
        /// Call affected
        call_id: CallId,
        /// New hold flag
        on_hold: bool,
        /// When the flag flipped
        timestamp: DateTime<Utc>,
    },

    /// Local mute was engaged or released
    MuteStateChanged {
        /// Call affected
        call_id: CallId,
        /// New mute flag
        muted: bool,
        /// When the flag flipped
        timestamp: DateTime<Utc>,
    },

    /// DTMF tones were sent on a call
    DtmfSent {
        /// Call the tones were sent on
        call_id: CallId,
        /// The tones, e.g. `"123#"`
        tones: String,
        /// When they were sent
        timestamp: DateTime<Utc>,
    },

    /// A transfer was requested on a call
    TransferRequested {
        /// Call being transferred
        call_id: CallId,
        /// Target URI of the transfer
        target: String,
        /// When the request was issued
        timestamp: DateTime<Utc>,
    },

    /// An operation on a call failed
    Error {
        /// Call the failure relates to
        call_id: CallId,
        /// Failure description
        message: String,
        /// When the failure occurred
        timestamp: DateTime<Utc>,
    },
}

impl BusEvent for CallEvent {
    type Kind = CallEventKind;

    fn kind(&self) -> CallEventKind {
        match self {
            CallEvent::StateChanged { .. } => CallEventKind::StateChanged,
            CallEvent::HoldStateChanged { .. } => CallEventKind::HoldStateChanged,
            CallEvent::MuteStateChanged { .. } => CallEventKind::MuteStateChanged,
            CallEvent::DtmfSent { .. } => CallEventKind::DtmfSent,
            CallEvent::TransferRequested { .. } => CallEventKind::TransferRequested,
            CallEvent::Error { .. } => CallEventKind::Error,
        }
    }
}

/// Bus instantiated over the call event family
pub type CallEventBus = EventBus<CallEvent>;
