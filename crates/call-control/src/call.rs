//! Call identity and state types
//!
//! These types are shared by the session facade, the transfer controller and
//! every event payload in the crate.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a call tracked by the call registry.
///
/// Opaque string newtype; generated ids are `call-<uuid>`, but any string a
/// registry hands out is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(pub String);

impl CallId {
    /// Generate a fresh call id
    pub fn new() -> Self {
        Self(format!("call-{}", uuid::Uuid::new_v4()))
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CallId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CallId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Direction of a call relative to the local party
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallDirection {
    /// Call received from a remote party
    Incoming,
    /// Call placed by the local party
    Outgoing,
}

/// Lifecycle state of a call session.
///
/// Transitions are linear with no back-edges, except that `Active` and the
/// two held states flip back and forth. `Terminated` and `Failed` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallState {
    /// Session object exists but dialing has not started
    Idle,
    /// Outgoing invitation sent, no response yet
    Calling,
    /// Remote party is being alerted
    Ringing,
    /// Media flowing before the call is answered
    EarlyMedia,
    /// Call is established
    Active,
    /// Placed on hold by the local party
    Held,
    /// Placed on hold by the remote party
    RemoteHeld,
    /// Teardown in progress
    Terminating,
    /// Call ended normally (terminal)
    Terminated,
    /// Call ended with an error (terminal)
    Failed,
}

impl CallState {
    /// Whether no further transitions leave this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Terminated | CallState::Failed)
    }

    /// Whether the call has started and not yet reached a terminal state
    pub fn is_in_progress(&self) -> bool {
        !self.is_terminal() && !matches!(self, CallState::Idle)
    }

    /// Whether the state machine permits moving from `self` to `next`
    pub fn can_transition_to(&self, next: CallState) -> bool {
        use CallState::*;
        if self.is_terminal() {
            return false;
        }
        match next {
            Idle => false,
            Calling => matches!(self, Idle),
            Ringing => matches!(self, Idle | Calling),
            EarlyMedia => matches!(self, Idle | Calling | Ringing),
            Active => matches!(self, Idle | Calling | Ringing | EarlyMedia | Held | RemoteHeld),
            Held | RemoteHeld => matches!(self, Active),
            // teardown may start from any live state; remote hangup or a
            // transport error may also skip straight past Terminating
            Terminating | Terminated | Failed => true,
        }
    }
}

impl Default for CallState {
    fn default() -> Self {
        CallState::Idle
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Timestamps collected over a call's lifetime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallTiming {
    /// When the session was created
    pub started_at: DateTime<Utc>,
    /// When the call was answered, if it ever was
    pub answered_at: Option<DateTime<Utc>>,
    /// When the call reached a terminal state
    pub ended_at: Option<DateTime<Utc>>,
}

impl CallTiming {
    pub(crate) fn new() -> Self {
        Self {
            started_at: Utc::now(),
            answered_at: None,
            ended_at: None,
        }
    }
}

/// Point-in-time snapshot of a call session for observers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSessionInfo {
    /// Identifier of the call
    pub call_id: CallId,
    /// Current lifecycle state
    pub state: CallState,
    /// Direction relative to the local party
    pub direction: CallDirection,
    /// Local party URI
    pub local_uri: String,
    /// Remote party URI
    pub remote_uri: String,
    /// Whether the local party has the call on hold
    pub is_on_hold: bool,
    /// Whether the local microphone is muted
    pub is_muted: bool,
    /// Lifetime timestamps
    pub timing: CallTiming,
}

/// Operations currently possible for a specific call.
///
/// Unlike the transport's static capability flags, this reflects both what
/// the transport implements and what the call's current state allows.
#[derive(Debug, Clone)]
pub struct CallCapabilities {
    /// Whether this call can be placed on hold
    pub can_hold: bool,
    /// Whether this call can be resumed from hold
    pub can_resume: bool,
    /// Whether this call can be transferred
    pub can_transfer: bool,
    /// Whether DTMF tones can be sent for this call
    pub can_send_dtmf: bool,
    /// Whether the microphone can be muted for this call
    pub can_mute: bool,
    /// Whether this call can be terminated (hung up)
    pub can_hangup: bool,
}

impl Default for CallCapabilities {
    fn default() -> Self {
        Self {
            can_hold: false,
            can_resume: false,
            can_transfer: false,
            can_send_dtmf: false,
            can_mute: false,
            can_hangup: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_call_ids_are_prefixed_and_unique() {
        let a = CallId::new();
        let b = CallId::new();
        assert!(a.as_str().starts_with("call-"));
        assert_ne!(a, b);
    }

    #[test]
    fn terminal_states_admit_no_transitions() {
        for state in [CallState::Terminated, CallState::Failed] {
            assert!(state.is_terminal());
            assert!(!state.can_transition_to(CallState::Active));
            assert!(!state.can_transition_to(CallState::Terminating));
        }
    }

    #[test]
    fn hold_is_the_only_back_edge() {
        assert!(CallState::Active.can_transition_to(CallState::Held));
        assert!(CallState::Held.can_transition_to(CallState::Active));
        assert!(CallState::Active.can_transition_to(CallState::RemoteHeld));
        assert!(CallState::RemoteHeld.can_transition_to(CallState::Active));
        // no skipping backwards
        assert!(!CallState::Active.can_transition_to(CallState::Ringing));
        assert!(!CallState::Ringing.can_transition_to(CallState::Calling));
    }

    #[test]
    fn teardown_is_reachable_from_any_live_state() {
        for state in [
            CallState::Idle,
            CallState::Calling,
            CallState::Ringing,
            CallState::EarlyMedia,
            CallState::Active,
            CallState::Held,
            CallState::RemoteHeld,
        ] {
            assert!(state.can_transition_to(CallState::Terminating));
            assert!(state.can_transition_to(CallState::Terminated));
            assert!(state.can_transition_to(CallState::Failed));
        }
    }
}
