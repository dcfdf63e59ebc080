//! Per-call capability facade
//!
//! [`CallSession`] presents a uniform surface over a heterogeneous
//! transport-level session object. Every operation checks the transport's
//! advertised capabilities before delegating, so partially-capable or
//! mocked transports fail with a typed
//! [`NotImplemented`](crate::error::CallControlError::NotImplemented) error
//! naming the missing operation. Native transport notifications are
//! translated into guarded state transitions, and every success or failure
//! is republished on the shared event bus.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use crate::call::{CallCapabilities, CallDirection, CallId, CallSessionInfo, CallState, CallTiming};
use crate::error::{CallControlError, CallControlResult};
use crate::events::{CallEvent, CallEventBus};
use crate::transport::{SessionTransport, TransportSessionEvent};

/// State-machine facade wrapping a transport-level call session.
///
/// Owned by the call registry; other components borrow `Arc` references by
/// id for the duration of one operation. All interior state is updated only
/// by this type's methods, either directly or in response to transport
/// events fed through [`apply_transport_event`](Self::apply_transport_event).
pub struct CallSession {
    id: CallId,
    direction: CallDirection,
    local_uri: String,
    remote_uri: String,
    state: RwLock<CallState>,
    is_on_hold: AtomicBool,
    is_muted: AtomicBool,
    timing: RwLock<CallTiming>,
    transport: Arc<dyn SessionTransport>,
    events: CallEventBus,
}

impl std::fmt::Debug for CallSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallSession")
            .field("id", &self.id)
            .field("direction", &self.direction)
            .field("state", &*self.state.read())
            .field("local_uri", &self.local_uri)
            .field("remote_uri", &self.remote_uri)
            .finish()
    }
}

impl CallSession {
    /// Wrap a transport session. The session starts in
    /// [`CallState::Idle`]; transport events drive it forward from there.
    pub fn new(
        direction: CallDirection,
        local_uri: impl Into<String>,
        remote_uri: impl Into<String>,
        transport: Arc<dyn SessionTransport>,
        events: CallEventBus,
    ) -> Self {
        Self {
            id: CallId::from(transport.id()),
            direction,
            local_uri: local_uri.into(),
            remote_uri: remote_uri.into(),
            state: RwLock::new(CallState::Idle),
            is_on_hold: AtomicBool::new(false),
            is_muted: AtomicBool::new(false),
            timing: RwLock::new(CallTiming::new()),
            transport,
            events,
        }
    }

    /// Identifier of this call
    pub fn id(&self) -> &CallId {
        &self.id
    }

    /// Direction relative to the local party
    pub fn direction(&self) -> CallDirection {
        self.direction
    }

    /// Local party URI
    pub fn local_uri(&self) -> &str {
        &self.local_uri
    }

    /// Remote party URI
    pub fn remote_uri(&self) -> &str {
        &self.remote_uri
    }

    /// Current lifecycle state
    pub fn state(&self) -> CallState {
        *self.state.read()
    }

    /// Whether the local party has the call on hold
    pub fn is_on_hold(&self) -> bool {
        self.is_on_hold.load(Ordering::SeqCst)
    }

    /// Whether the local microphone is muted
    pub fn is_muted(&self) -> bool {
        self.is_muted.load(Ordering::SeqCst)
    }

    /// Lifetime timestamps of this call
    pub fn timing(&self) -> CallTiming {
        self.timing.read().clone()
    }

    /// Point-in-time snapshot for observers
    pub fn info(&self) -> CallSessionInfo {
        CallSessionInfo {
            call_id: self.id.clone(),
            state: self.state(),
            direction: self.direction,
            local_uri: self.local_uri.clone(),
            remote_uri: self.remote_uri.clone(),
            is_on_hold: self.is_on_hold(),
            is_muted: self.is_muted(),
            timing: self.timing(),
        }
    }

    /// Operations currently possible for this call, combining the
    /// transport's advertised capabilities with the current state
    pub fn capabilities(&self) -> CallCapabilities {
        let transport = self.transport.capabilities();
        let state = self.state();
        let live = state.is_in_progress();
        CallCapabilities {
            can_hold: transport.can_hold && state == CallState::Active,
            can_resume: transport.can_hold && state == CallState::Held,
            can_transfer: transport.can_transfer && matches!(state, CallState::Active | CallState::Held),
            can_send_dtmf: transport.can_send_dtmf && state == CallState::Active,
            can_mute: transport.can_mute && live,
            can_hangup: transport.can_terminate && live,
        }
    }

    /// Place the call on hold. Flips the hold flag and moves the call to
    /// [`CallState::Held`] on success.
    pub async fn hold(&self) -> CallControlResult<()> {
        self.require(self.transport.capabilities().can_hold, "CallSession.hold()")?;
        self.transport.hold().await.map_err(|e| {
            self.operation_failed(format!("Failed to hold call {}: {}", self.id, e))
        })?;
        self.is_on_hold.store(true, Ordering::SeqCst);
        self.set_state(CallState::Held, Some("Call placed on hold".to_string()));
        self.events.emit(&CallEvent::HoldStateChanged {
            call_id: self.id.clone(),
            on_hold: true,
            timestamp: Utc::now(),
        });
        tracing::info!(call = %self.id, "call placed on hold");
        Ok(())
    }

    /// Resume the call from hold
    pub async fn unhold(&self) -> CallControlResult<()> {
        self.require(self.transport.capabilities().can_hold, "CallSession.unhold()")?;
        self.transport.unhold().await.map_err(|e| {
            self.operation_failed(format!("Failed to resume call {}: {}", self.id, e))
        })?;
        self.is_on_hold.store(false, Ordering::SeqCst);
        self.set_state(CallState::Active, Some("Call resumed from hold".to_string()));
        self.events.emit(&CallEvent::HoldStateChanged {
            call_id: self.id.clone(),
            on_hold: false,
            timestamp: Utc::now(),
        });
        tracing::info!(call = %self.id, "call resumed from hold");
        Ok(())
    }

    /// Mute the local microphone. Synchronous by contract: no network
    /// round-trip is involved.
    pub fn mute(&self) -> CallControlResult<()> {
        self.set_muted(true, "CallSession.mute()")
    }

    /// Unmute the local microphone
    pub fn unmute(&self) -> CallControlResult<()> {
        self.set_muted(false, "CallSession.unmute()")
    }

    fn set_muted(&self, muted: bool, capability: &str) -> CallControlResult<()> {
        self.require(self.transport.capabilities().can_mute, capability)?;
        self.transport.set_muted(muted).map_err(|e| {
            self.operation_failed(format!("Failed to set mute on call {}: {}", self.id, e))
        })?;
        self.is_muted.store(muted, Ordering::SeqCst);
        self.events.emit(&CallEvent::MuteStateChanged {
            call_id: self.id.clone(),
            muted,
            timestamp: Utc::now(),
        });
        tracing::debug!(call = %self.id, muted, "mute state changed");
        Ok(())
    }

    /// Send DTMF tones on the call. Valid tones are `0-9`, `A-D`, `*`
    /// and `#`.
    pub async fn send_dtmf(&self, tones: &str) -> CallControlResult<()> {
        if tones.is_empty() {
            return Err(CallControlError::precondition("DTMF tones must not be empty"));
        }
        if !tones
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c.to_ascii_uppercase(), 'A'..='D' | '*' | '#'))
        {
            return Err(CallControlError::precondition(format!(
                "Invalid DTMF tones: {}",
                tones
            )));
        }
        self.require(self.transport.capabilities().can_send_dtmf, "CallSession.send_dtmf()")?;
        self.transport.send_dtmf(tones).await.map_err(|e| {
            self.operation_failed(format!("Failed to send DTMF on call {}: {}", self.id, e))
        })?;
        self.events.emit(&CallEvent::DtmfSent {
            call_id: self.id.clone(),
            tones: tones.to_string(),
            timestamp: Utc::now(),
        });
        tracing::debug!(call = %self.id, tones, "sent DTMF");
        Ok(())
    }

    /// Redirect the call to `target` (blind transfer).
    ///
    /// Whether this session terminates as a side effect is up to the
    /// transport; any resulting teardown arrives as a transport event.
    pub async fn transfer(&self, target: &str, extra_headers: &[(String, String)]) -> CallControlResult<()> {
        self.require(self.transport.capabilities().can_transfer, "CallSession.transfer()")?;
        self.transport.transfer(target, extra_headers).await.map_err(|e| {
            self.operation_failed(format!("Failed to transfer call {}: {}", self.id, e))
        })?;
        self.events.emit(&CallEvent::TransferRequested {
            call_id: self.id.clone(),
            target: target.to_string(),
            timestamp: Utc::now(),
        });
        tracing::info!(call = %self.id, %target, "blind transfer requested");
        Ok(())
    }

    /// Complete a three-way handoff to `target` using the established
    /// consultation call
    pub async fn attended_transfer(&self, target: &str, consultation_call_id: &CallId) -> CallControlResult<()> {
        self.require(
            self.transport.capabilities().can_attended_transfer,
            "CallSession.attended_transfer()",
        )?;
        self.transport
            .attended_transfer(target, consultation_call_id)
            .await
            .map_err(|e| {
                self.operation_failed(format!(
                    "Failed to complete attended transfer of call {}: {}",
                    self.id, e
                ))
            })?;
        self.events.emit(&CallEvent::TransferRequested {
            call_id: self.id.clone(),
            target: target.to_string(),
            timestamp: Utc::now(),
        });
        tracing::info!(call = %self.id, %target, consultation = %consultation_call_id, "attended transfer requested");
        Ok(())
    }

    /// End the call unconditionally.
    ///
    /// The session always moves through `Terminating` to `Terminated`,
    /// even when the transport reports a teardown failure; the failure is
    /// still returned to the caller.
    pub async fn terminate(&self) -> CallControlResult<()> {
        self.require(self.transport.capabilities().can_terminate, "CallSession.terminate()")?;
        self.set_state(CallState::Terminating, Some("Hangup requested".to_string()));
        let result = self.transport.terminate().await;
        match result {
            Ok(()) => {
                self.set_state(CallState::Terminated, Some("Call ended".to_string()));
                tracing::info!(call = %self.id, "call terminated");
                Ok(())
            }
            Err(e) => {
                let err = self.operation_failed(format!("Failed to terminate call {}: {}", self.id, e));
                self.set_state(CallState::Terminated, Some("Call ended after teardown failure".to_string()));
                Err(err)
            }
        }
    }

    /// Translate a transport-native notification into a state transition.
    ///
    /// Transitions the state machine does not permit are logged and
    /// ignored rather than corrupting the session.
    pub fn apply_transport_event(&self, event: TransportSessionEvent) {
        match event {
            TransportSessionEvent::Ringing => {
                self.set_state(CallState::Ringing, Some("Remote party ringing".to_string()));
            }
            TransportSessionEvent::EarlyMedia => {
                self.set_state(CallState::EarlyMedia, Some("Early media".to_string()));
            }
            TransportSessionEvent::Answered => {
                self.set_state(CallState::Active, Some("Call answered".to_string()));
            }
            TransportSessionEvent::RemoteHold => {
                self.set_state(CallState::RemoteHeld, Some("Held by remote party".to_string()));
            }
            TransportSessionEvent::RemoteResume => {
                self.set_state(CallState::Active, Some("Resumed by remote party".to_string()));
            }
            TransportSessionEvent::Terminating => {
                self.set_state(CallState::Terminating, Some("Teardown started".to_string()));
            }
            TransportSessionEvent::Terminated { reason } => {
                self.set_state(CallState::Terminated, reason.or_else(|| Some("Call ended".to_string())));
            }
            TransportSessionEvent::Failed { reason } => {
                self.emit_error(reason.clone());
                self.set_state(CallState::Failed, Some(reason));
            }
        }
    }

    /// Centralized capability check. Missing capabilities surface as a
    /// `NotImplemented` error naming the operation, and the failure is
    /// published like any other.
    fn require(&self, supported: bool, capability: &str) -> CallControlResult<()> {
        if supported {
            return Ok(());
        }
        let err = CallControlError::not_implemented(capability);
        self.emit_error(err.to_string());
        Err(err)
    }

    fn operation_failed(&self, reason: String) -> CallControlError {
        self.emit_error(reason.clone());
        CallControlError::OperationFailure { reason }
    }

    fn emit_error(&self, message: String) {
        self.events.emit(&CallEvent::Error {
            call_id: self.id.clone(),
            message,
            timestamp: Utc::now(),
        });
    }

    fn set_state(&self, new_state: CallState, reason: Option<String>) {
        let previous = {
            let mut state = self.state.write();
            if *state == new_state {
                return;
            }
            if !state.can_transition_to(new_state) {
                tracing::warn!(
                    call = %self.id,
                    from = %state,
                    to = %new_state,
                    "ignoring state transition the call state machine does not permit"
                );
                return;
            }
            let previous = *state;
            *state = new_state;
            previous
        };

        {
            let mut timing = self.timing.write();
            match new_state {
                CallState::Active if timing.answered_at.is_none() => {
                    timing.answered_at = Some(Utc::now());
                }
                CallState::Terminated | CallState::Failed => {
                    timing.ended_at = Some(Utc::now());
                }
                _ => {}
            }
        }

        tracing::debug!(call = %self.id, from = %previous, to = %new_state, "call state changed");
        self.events.emit(&CallEvent::StateChanged {
            call_id: self.id.clone(),
            previous_state: Some(previous),
            new_state,
            reason,
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CallEventKind;
    use crate::transport::{TransportCapabilities, TransportError, TransportResult};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use sipline_event_bus::EventBus;

    struct FakeTransport {
        id: String,
        capabilities: TransportCapabilities,
        fail_ops: bool,
        log: Mutex<Vec<String>>,
    }

    impl FakeTransport {
        fn new(id: &str, capabilities: TransportCapabilities) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                capabilities,
                fail_ops: false,
                log: Mutex::new(Vec::new()),
            })
        }

        fn failing(id: &str) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                capabilities: TransportCapabilities::full(),
                fail_ops: true,
                log: Mutex::new(Vec::new()),
            })
        }

        fn record(&self, op: &str) -> TransportResult<()> {
            self.log.lock().push(op.to_string());
            if self.fail_ops {
                Err(TransportError::new(format!("{} rejected", op)))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl SessionTransport for FakeTransport {
        fn id(&self) -> &str {
            &self.id
        }

        fn capabilities(&self) -> TransportCapabilities {
            self.capabilities
        }

        async fn hold(&self) -> TransportResult<()> {
            self.record("hold")
        }

        async fn unhold(&self) -> TransportResult<()> {
            self.record("unhold")
        }

        fn set_muted(&self, _muted: bool) -> TransportResult<()> {
            self.record("set_muted")
        }

        async fn send_dtmf(&self, _tones: &str) -> TransportResult<()> {
            self.record("send_dtmf")
        }

        async fn transfer(&self, _target: &str, _extra_headers: &[(String, String)]) -> TransportResult<()> {
            self.record("transfer")
        }

        async fn attended_transfer(&self, _target: &str, _consultation: &CallId) -> TransportResult<()> {
            self.record("attended_transfer")
        }

        async fn terminate(&self) -> TransportResult<()> {
            self.record("terminate")
        }
    }

    fn active_session(transport: Arc<FakeTransport>) -> (CallSession, CallEventBus) {
        let bus = EventBus::new();
        let session = CallSession::new(
            CallDirection::Outgoing,
            "sip:alice@example.com",
            "sip:bob@example.com",
            transport,
            bus.clone(),
        );
        session.apply_transport_event(TransportSessionEvent::Answered);
        (session, bus)
    }

    #[tokio::test]
    async fn missing_capability_names_the_operation() {
        let transport = FakeTransport::new("call-1", TransportCapabilities::default());
        let (session, _bus) = active_session(transport);

        let err = session
            .transfer("sip:carol@example.com", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, CallControlError::NotImplemented { .. }));
        assert_eq!(err.to_string(), "CallSession.transfer() is not implemented");

        let err = session.hold().await.unwrap_err();
        assert_eq!(err.to_string(), "CallSession.hold() is not implemented");
    }

    #[tokio::test]
    async fn hold_flips_flag_and_state() {
        let transport = FakeTransport::new("call-1", TransportCapabilities::full());
        let (session, _bus) = active_session(Arc::clone(&transport));

        session.hold().await.unwrap();
        assert!(session.is_on_hold());
        assert_eq!(session.state(), CallState::Held);

        session.unhold().await.unwrap();
        assert!(!session.is_on_hold());
        assert_eq!(session.state(), CallState::Active);
        assert_eq!(*transport.log.lock(), vec!["hold", "unhold"]);
    }

    #[tokio::test]
    async fn hold_failure_leaves_flag_untouched() {
        let transport = FakeTransport::failing("call-1");
        let (session, _bus) = active_session(transport);

        let err = session.hold().await.unwrap_err();
        assert!(matches!(err, CallControlError::OperationFailure { .. }));
        assert!(!session.is_on_hold());
        assert_eq!(session.state(), CallState::Active);
    }

    #[test]
    fn mute_is_a_synchronous_side_effect() {
        let transport = FakeTransport::new("call-1", TransportCapabilities::full());
        let bus = EventBus::new();
        let session = CallSession::new(
            CallDirection::Incoming,
            "sip:alice@example.com",
            "sip:bob@example.com",
            transport,
            bus,
        );

        session.mute().unwrap();
        assert!(session.is_muted());
        session.unmute().unwrap();
        assert!(!session.is_muted());
    }

    #[tokio::test]
    async fn dtmf_tones_are_validated() {
        let transport = FakeTransport::new("call-1", TransportCapabilities::full());
        let (session, _bus) = active_session(Arc::clone(&transport));

        session.send_dtmf("123*#abcd").await.unwrap();

        let err = session.send_dtmf("xyz").await.unwrap_err();
        assert!(matches!(err, CallControlError::Precondition { .. }));
        let err = session.send_dtmf("").await.unwrap_err();
        assert!(matches!(err, CallControlError::Precondition { .. }));
        // invalid tones never reach the transport
        assert_eq!(*transport.log.lock(), vec!["send_dtmf"]);
    }

    #[tokio::test]
    async fn terminate_always_reaches_terminated() {
        let transport = FakeTransport::failing("call-1");
        let (session, _bus) = active_session(transport);

        let err = session.terminate().await.unwrap_err();
        assert!(matches!(err, CallControlError::OperationFailure { .. }));
        assert_eq!(session.state(), CallState::Terminated);
        assert!(session.timing().ended_at.is_some());
    }

    #[tokio::test]
    async fn invalid_transport_transitions_are_ignored() {
        let transport = FakeTransport::new("call-1", TransportCapabilities::full());
        let (session, _bus) = active_session(transport);

        session.apply_transport_event(TransportSessionEvent::Terminated { reason: None });
        assert_eq!(session.state(), CallState::Terminated);

        // a late answer must not resurrect a terminated call
        session.apply_transport_event(TransportSessionEvent::Answered);
        assert_eq!(session.state(), CallState::Terminated);
    }

    #[tokio::test]
    async fn operations_publish_to_the_shared_bus() {
        let transport = FakeTransport::new("call-1", TransportCapabilities::full());
        let (session, bus) = active_session(transport);

        let waiter = bus.clone();
        let wait = tokio::spawn(async move {
            waiter
                .wait_for(CallEventKind::HoldStateChanged, Some(std::time::Duration::from_secs(1)))
                .await
        });
        // give the waiter a chance to register before emitting
        tokio::task::yield_now().await;
        session.hold().await.unwrap();

        let event = wait.await.unwrap().unwrap();
        match event {
            CallEvent::HoldStateChanged { call_id, on_hold, .. } => {
                assert_eq!(call_id.as_str(), "call-1");
                assert!(on_hold);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
