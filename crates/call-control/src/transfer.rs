//! Blind and attended transfer orchestration
//!
//! # Transfer state machine
//!
//! ```text
//!                    ┌──────────────────────────────────────────┐
//!                    │                TransferController        │
//!                    │                                          │
//!  blind_transfer ───┼──► CallSession.transfer() ──► Completed  │
//!                    │                                          │
//!  initiate_attended ┼──► hold() ──► make_call() ──► InProgress │
//!                    │                  │                │      │
//!                    │                  ▼                ▼      │
//!                    │          consultation call   Accepted    │
//!                    │                                  │       │
//!  complete_attended ┼──► attended_transfer() ──► Completed     │
//!  cancel_transfer ──┼──► hangup + unhold    ──► Canceled       │
//!                    └──────────────────────────────────────────┘
//! ```
//!
//! The controller owns exactly one mutable "active transfer" slot. At most
//! one non-terminal [`TransferRecord`] exists at any time; a second attempt
//! while one is in flight fails with
//! [`TransferConflict`](crate::error::CallControlError::TransferConflict).
//! Terminal records stay readable for a configured window before an owned,
//! cancellable delayed task resets the slot, so passive observers are
//! guaranteed to see the terminal state.
//!
//! Cancellation is compensating, never preemptive: it hangs up the
//! consultation call and resumes the original, but it cannot abort a
//! transfer request the transport has already issued.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::call::CallId;
use crate::client::{CallMediaOptions, SipClient};
use crate::config::TransferConfig;
use crate::error::{CallControlError, CallControlResult};
use crate::session::CallSession;

/// Unique identifier for a transfer attempt, generated as `transfer-<uuid>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferId(String);

impl TransferId {
    /// Generate a fresh transfer id
    pub fn new() -> Self {
        Self(format!("transfer-{}", uuid::Uuid::new_v4()))
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of transfer being performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferType {
    /// Immediate redirect without verifying the target first
    Blind,
    /// Hold, consult, then hand off
    Attended,
}

/// State of a transfer attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferState {
    /// No transfer underway
    Idle,
    /// Transfer requested, nothing confirmed yet
    Initiated,
    /// Consultation established, awaiting completion
    InProgress,
    /// Target accepted the transfer
    Accepted,
    /// Transfer finished successfully (terminal)
    Completed,
    /// Transfer failed (terminal)
    Failed,
    /// Transfer canceled by the local party (terminal)
    Canceled,
}

impl TransferState {
    /// Whether no further transitions leave this state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Completed | TransferState::Failed | TransferState::Canceled
        )
    }

    /// Progress percentage reported to observers
    pub fn progress(&self) -> u8 {
        match self {
            TransferState::Idle | TransferState::Failed | TransferState::Canceled => 0,
            TransferState::Initiated => 25,
            TransferState::InProgress => 50,
            TransferState::Accepted => 75,
            TransferState::Completed => 100,
        }
    }
}

/// Bookkeeping for one transfer attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Identifier of this attempt
    pub id: TransferId,
    /// Blind or attended
    pub transfer_type: TransferType,
    /// The call being transferred
    pub call_id: CallId,
    /// The consultation call, only while an attended transfer is active
    pub consultation_call_id: Option<CallId>,
    /// Destination URI
    pub target: String,
    /// Current state of the attempt
    pub state: TransferState,
    /// When the attempt started
    pub initiated_at: DateTime<Utc>,
    /// When the attempt completed, if it did
    pub completed_at: Option<DateTime<Utc>>,
    /// Failure text, preserved for passive readers
    pub error: Option<String>,
}

/// What a transfer lifecycle event reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferEventType {
    /// An attended transfer entered `InProgress`
    Initiated,
    /// The target accepted the transfer
    Accepted,
    /// The transfer completed
    Completed,
    /// The transfer failed
    Failed,
    /// The transfer was canceled locally
    Canceled,
    /// The terminal record was cleared after its visibility window
    Cleared,
}

/// Payload delivered to [`TransferController::on_transfer_event`] listeners
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferEvent {
    /// What happened
    pub event_type: TransferEventType,
    /// Identifier of the transfer attempt
    pub transfer_id: TransferId,
    /// State of the record when the event fired
    pub state: TransferState,
    /// Blind or attended
    pub transfer_type: TransferType,
    /// Destination URI
    pub target: String,
    /// The call being transferred
    pub call_id: CallId,
    /// The consultation call, for attended transfers
    pub consultation_call_id: Option<CallId>,
    /// When the event fired
    pub timestamp: DateTime<Utc>,
    /// Failure text, for failure events
    pub error: Option<String>,
}

/// Progress notification forwarded from the transport's transfer
/// signaling (REFER NOTIFY or equivalent)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferProgressUpdate {
    /// Target accepted the transfer and is being called
    Accepted,
    /// Target is ringing
    Ringing,
    /// Transfer completed successfully
    Completed,
    /// Transfer failed
    Failed(String),
}

/// Snapshot returned by [`TransferController::get_transfer_progress`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferProgress {
    /// Blind or attended
    pub transfer_type: TransferType,
    /// Current record state
    pub state: TransferState,
    /// Progress percentage derived from the state
    pub progress: u8,
}

/// Handle for removing a transfer event listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferListenerId(u64);

type TransferListener = Arc<dyn Fn(&TransferEvent) + Send + Sync>;

struct ControllerInner {
    client: RwLock<Option<Arc<dyn SipClient>>>,
    config: TransferConfig,
    active: Mutex<Option<TransferRecord>>,
    consultation: Mutex<Option<Arc<CallSession>>>,
    listeners: DashMap<u64, TransferListener>,
    next_listener_id: AtomicU64,
    clear_task: Mutex<Option<JoinHandle<()>>>,
}

impl ControllerInner {
    fn emit_event(&self, event_type: TransferEventType, record: &TransferRecord) {
        let event = TransferEvent {
            event_type,
            transfer_id: record.id.clone(),
            state: record.state,
            transfer_type: record.transfer_type,
            target: record.target.clone(),
            call_id: record.call_id.clone(),
            consultation_call_id: record.consultation_call_id.clone(),
            timestamp: Utc::now(),
            error: record.error.clone(),
        };
        let listeners: Vec<(u64, TransferListener)> = self
            .listeners
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        for (id, listener) in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                tracing::error!(listener = id, event = ?event.event_type, "transfer event listener panicked; continuing");
            }
        }
    }

    fn abort_clear_task(&self) {
        if let Some(task) = self.clear_task.lock().take() {
            task.abort();
        }
    }
}

impl Drop for ControllerInner {
    fn drop(&mut self) {
        if let Some(task) = self.clear_task.get_mut().take() {
            task.abort();
        }
    }
}

/// Orchestrates blind and attended transfers across call sessions.
///
/// The controller borrows [`CallSession`]s by id from its [`SipClient`]
/// collaborator for the duration of one operation; the only session
/// reference it retains is the transient consultation call of an attended
/// transfer. Cheap to clone; clones share the same state.
///
/// All failures reject the calling operation. For operations that run with
/// an existing record (`blind_transfer`, `complete_attended_transfer`) the
/// record is additionally left in [`TransferState::Failed`] with the error
/// text preserved, so readers of
/// [`get_transfer_progress`](Self::get_transfer_progress) observe failures
/// without catching errors. Failures in `initiate_attended_transfer` that
/// occur before any record exists leave the controller in `Idle` and are
/// visible only through the rejected operation.
#[derive(Clone)]
pub struct TransferController {
    inner: Arc<ControllerInner>,
}

impl TransferController {
    /// Create a controller with no client wired yet. Every operation fails
    /// with a precondition error until [`set_client`](Self::set_client) is
    /// called.
    pub fn new(config: TransferConfig) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                client: RwLock::new(None),
                config,
                active: Mutex::new(None),
                consultation: Mutex::new(None),
                listeners: DashMap::new(),
                next_listener_id: AtomicU64::new(0),
                clear_task: Mutex::new(None),
            }),
        }
    }

    /// Create a controller wired to a client
    pub fn with_client(client: Arc<dyn SipClient>, config: TransferConfig) -> Self {
        let controller = Self::new(config);
        controller.set_client(client);
        controller
    }

    /// Wire (or replace) the client collaborator
    pub fn set_client(&self, client: Arc<dyn SipClient>) {
        *self.inner.client.write() = Some(client);
    }

    /// Redirect `call_id` to `target` without consulting first.
    ///
    /// On success the record is created directly in
    /// [`TransferState::Completed`]; blind transfers never expose an
    /// intermediate `InProgress` state. On failure the record is left in
    /// `Failed` with the error text and the error is returned.
    ///
    /// # Errors
    ///
    /// * `TransferConflict` - another transfer is already in flight
    /// * `Precondition` - no client configured
    /// * `CallNotFound` - the call is not in the registry
    /// * `NotImplemented` - the transport cannot transfer
    /// * `OperationFailure` - the transport rejected the request
    pub async fn blind_transfer(
        &self,
        call_id: &CallId,
        target: &str,
        extra_headers: Option<Vec<(String, String)>>,
    ) -> CallControlResult<()> {
        self.check_single_flight()?;
        let session = self.resolve_call(call_id)?;
        tracing::info!(call = %call_id, %target, "starting blind transfer");

        let headers = extra_headers.unwrap_or_default();
        match session.transfer(target, &headers).await {
            Ok(()) => {
                let record = TransferRecord {
                    id: TransferId::new(),
                    transfer_type: TransferType::Blind,
                    call_id: call_id.clone(),
                    consultation_call_id: None,
                    target: target.to_string(),
                    state: TransferState::Completed,
                    initiated_at: Utc::now(),
                    completed_at: Some(Utc::now()),
                    error: None,
                };
                self.install_record(record.clone());
                self.inner.emit_event(TransferEventType::Completed, &record);
                self.schedule_clear(record.id, self.inner.config.completion_clear_delay);
                tracing::info!(call = %call_id, %target, "blind transfer completed");
                Ok(())
            }
            Err(err) => {
                let record = TransferRecord {
                    id: TransferId::new(),
                    transfer_type: TransferType::Blind,
                    call_id: call_id.clone(),
                    consultation_call_id: None,
                    target: target.to_string(),
                    state: TransferState::Failed,
                    initiated_at: Utc::now(),
                    completed_at: None,
                    error: Some(err.to_string()),
                };
                self.install_record(record.clone());
                self.inner.emit_event(TransferEventType::Failed, &record);
                self.schedule_clear(record.id, self.inner.config.completion_clear_delay);
                tracing::warn!(call = %call_id, %target, error = %err, "blind transfer failed");
                Err(err)
            }
        }
    }

    /// Start an attended transfer: hold `call_id`, then place an audio-only
    /// consultation call to `target`.
    ///
    /// Returns the consultation call id. Failures of the hold or of the
    /// consultation dial happen before any record exists: they reject the
    /// operation but leave the controller in `Idle`, invisible to
    /// [`get_transfer_progress`](Self::get_transfer_progress) readers.
    ///
    /// # Errors
    ///
    /// * `TransferConflict` - another transfer is already in flight
    /// * `Precondition` - no client configured
    /// * `CallNotFound` - the call is not in the registry
    /// * `NotImplemented` / `OperationFailure` - hold or dial failed
    pub async fn initiate_attended_transfer(
        &self,
        call_id: &CallId,
        target: &str,
    ) -> CallControlResult<CallId> {
        self.check_single_flight()?;
        let session = self.resolve_call(call_id)?;
        tracing::info!(call = %call_id, %target, "starting attended transfer");

        // No record exists yet: a failure here rejects the operation and
        // leaves the controller Idle.
        session.hold().await?;

        let client = self.client()?;
        let consultation_id = client
            .make_call(target, CallMediaOptions { video: false })
            .await?;
        *self.inner.consultation.lock() = client.get_active_call(&consultation_id);

        let record = TransferRecord {
            id: TransferId::new(),
            transfer_type: TransferType::Attended,
            call_id: call_id.clone(),
            consultation_call_id: Some(consultation_id.clone()),
            target: target.to_string(),
            state: TransferState::InProgress,
            initiated_at: Utc::now(),
            completed_at: None,
            error: None,
        };
        self.install_record(record.clone());
        self.inner.emit_event(TransferEventType::Initiated, &record);
        tracing::info!(call = %call_id, consultation = %consultation_id, "attended transfer in progress");
        Ok(consultation_id)
    }

    /// Hand the original call off to the target of the active attended
    /// transfer.
    ///
    /// The original call is re-resolved by id; if it has disappeared from
    /// the registry since the transfer started, this fails with
    /// `CallNotFound` even though the transfer was in progress.
    ///
    /// # Errors
    ///
    /// * `Precondition` - no active attended transfer, or the consultation
    ///   reference is gone
    /// * `CallNotFound` - the original call vanished from the registry
    /// * `NotImplemented` / `OperationFailure` - the handoff failed
    ///
    /// Any failure leaves the record in `Failed` with the error text.
    pub async fn complete_attended_transfer(&self) -> CallControlResult<()> {
        let record = {
            let active = self.inner.active.lock();
            match active.as_ref() {
                Some(record)
                    if record.transfer_type == TransferType::Attended
                        && !record.state.is_terminal() =>
                {
                    record.clone()
                }
                _ => return Err(CallControlError::precondition("No active attended transfer")),
            }
        };

        match self.complete_attended_inner(&record).await {
            Ok(()) => {
                let updated = self.update_record(|r| {
                    r.state = TransferState::Completed;
                    r.completed_at = Some(Utc::now());
                });
                if let Some(record) = updated {
                    self.inner.emit_event(TransferEventType::Completed, &record);
                    self.schedule_clear(record.id, self.inner.config.completion_clear_delay);
                }
                tracing::info!(call = %record.call_id, "attended transfer completed");
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                let updated = self.update_record(|r| {
                    r.state = TransferState::Failed;
                    r.error = Some(message.clone());
                });
                if let Some(record) = updated {
                    self.inner.emit_event(TransferEventType::Failed, &record);
                    self.schedule_clear(record.id, self.inner.config.completion_clear_delay);
                }
                tracing::warn!(call = %record.call_id, error = %message, "attended transfer failed");
                Err(err)
            }
        }
    }

    async fn complete_attended_inner(&self, record: &TransferRecord) -> CallControlResult<()> {
        let consultation = self
            .inner
            .consultation
            .lock()
            .clone()
            .ok_or_else(|| CallControlError::precondition("No consultation call found"))?;
        let session = self.resolve_call(&record.call_id)?;
        session
            .attended_transfer(&record.target, consultation.id())
            .await
    }

    /// Cancel the active transfer.
    ///
    /// For an attended transfer, hangs up the consultation call (when its
    /// reference still exists) and then unconditionally resumes the
    /// original call; both compensations are best-effort and logged on
    /// failure. A blind transfer request already issued to the transport
    /// cannot be aborted - cancellation then only updates local
    /// bookkeeping. The `Canceled` record stays visible for the
    /// cancellation delay.
    ///
    /// # Errors
    ///
    /// * `Precondition` - no active transfer to cancel
    pub async fn cancel_transfer(&self) -> CallControlResult<()> {
        let record = self
            .inner
            .active
            .lock()
            .clone()
            .ok_or_else(|| CallControlError::precondition("No active transfer to cancel"))?;
        tracing::info!(transfer = %record.id, "canceling transfer");

        if record.transfer_type == TransferType::Attended {
            let consultation = self.inner.consultation.lock().take();
            if let Some(consultation) = consultation {
                if let Err(err) = consultation.terminate().await {
                    tracing::warn!(consultation = %consultation.id(), error = %err, "failed to hang up consultation call during cancel");
                }
            }
            // unhold runs even when the consultation reference was already
            // cleared out from under us
            match self.resolve_call(&record.call_id) {
                Ok(session) => {
                    if let Err(err) = session.unhold().await {
                        tracing::warn!(call = %record.call_id, error = %err, "failed to resume original call during cancel");
                    }
                }
                Err(err) => {
                    tracing::warn!(call = %record.call_id, error = %err, "original call not found during cancel");
                }
            }
        }

        let updated = self.update_record(|r| r.state = TransferState::Canceled);
        if let Some(record) = updated {
            self.inner.emit_event(TransferEventType::Canceled, &record);
            self.schedule_clear(record.id, self.inner.config.cancel_clear_delay);
        }
        Ok(())
    }

    /// Forward `call_id` to `target`: a blind transfer carrying a
    /// `Diversion` header identifying the forwarding party
    pub async fn forward_call(&self, call_id: &CallId, target: &str) -> CallControlResult<()> {
        let session = self.resolve_call(call_id)?;
        let headers = vec![(
            "Diversion".to_string(),
            format!("<{}>;reason=unconditional", session.local_uri()),
        )];
        self.blind_transfer(call_id, target, Some(headers)).await
    }

    /// Apply a transport-side progress notification to the active record.
    ///
    /// Updates with no active record, or with a record already terminal
    /// (blind records are born `Completed`), are ignored.
    pub fn handle_transfer_progress(&self, update: TransferProgressUpdate) {
        let outcome = {
            let mut active = self.inner.active.lock();
            let record = match active.as_mut() {
                Some(record) if !record.state.is_terminal() => record,
                _ => {
                    tracing::debug!(?update, "transfer progress with no live record ignored");
                    return;
                }
            };
            match update {
                TransferProgressUpdate::Accepted => {
                    record.state = TransferState::Accepted;
                    Some((TransferEventType::Accepted, record.clone(), None))
                }
                TransferProgressUpdate::Ringing => {
                    tracing::debug!(transfer = %record.id, "transfer target ringing");
                    None
                }
                TransferProgressUpdate::Completed => {
                    record.state = TransferState::Completed;
                    record.completed_at = Some(Utc::now());
                    Some((
                        TransferEventType::Completed,
                        record.clone(),
                        Some(self.inner.config.completion_clear_delay),
                    ))
                }
                TransferProgressUpdate::Failed(reason) => {
                    record.state = TransferState::Failed;
                    record.error = Some(reason);
                    Some((
                        TransferEventType::Failed,
                        record.clone(),
                        Some(self.inner.config.completion_clear_delay),
                    ))
                }
            }
        };

        if let Some((event_type, record, clear_after)) = outcome {
            self.inner.emit_event(event_type, &record);
            if let Some(delay) = clear_after {
                self.schedule_clear(record.id, delay);
            }
        }
    }

    /// Progress of the active transfer, or `None` when the controller is
    /// idle. States map to percentages as `Initiated` 25, `InProgress` 50,
    /// `Accepted` 75, `Completed` 100, everything else 0.
    pub fn get_transfer_progress(&self) -> Option<TransferProgress> {
        self.inner.active.lock().as_ref().map(|record| TransferProgress {
            transfer_type: record.transfer_type,
            state: record.state,
            progress: record.state.progress(),
        })
    }

    /// Snapshot of the active transfer record, if any
    pub fn active_transfer(&self) -> Option<TransferRecord> {
        self.inner.active.lock().clone()
    }

    /// Register a listener for transfer lifecycle events.
    ///
    /// Listeners are independent: one panicking listener is caught and
    /// logged without suppressing the others.
    pub fn on_transfer_event(
        &self,
        listener: impl Fn(&TransferEvent) + Send + Sync + 'static,
    ) -> TransferListenerId {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.insert(id, Arc::new(listener));
        TransferListenerId(id)
    }

    /// Remove a transfer event listener. Idempotent; returns whether a
    /// listener was actually removed.
    pub fn remove_transfer_listener(&self, id: TransferListenerId) -> bool {
        self.inner.listeners.remove(&id.0).is_some()
    }

    /// Release the controller's resources: cancels the pending clear task
    /// so no state is mutated after teardown. Also runs on drop of the
    /// last clone.
    pub fn close(&self) {
        self.inner.abort_clear_task();
    }

    fn client(&self) -> CallControlResult<Arc<dyn SipClient>> {
        self.inner
            .client
            .read()
            .clone()
            .ok_or_else(|| CallControlError::precondition("No SIP client configured"))
    }

    fn resolve_call(&self, call_id: &CallId) -> CallControlResult<Arc<CallSession>> {
        self.client()?
            .get_active_call(call_id)
            .ok_or_else(|| CallControlError::call_not_found(call_id.clone()))
    }

    /// Single-flight guard, checked synchronously before any suspension
    /// point of the operations that create records
    fn check_single_flight(&self) -> CallControlResult<()> {
        let active = self.inner.active.lock();
        if let Some(record) = active.as_ref() {
            if !record.state.is_terminal() {
                return Err(CallControlError::conflict(
                    "Another transfer is already in progress",
                ));
            }
        }
        Ok(())
    }

    /// Install a new record, superseding any terminal one still in its
    /// visibility window; the pending clear task for the old record is
    /// canceled so it cannot wipe the new one.
    fn install_record(&self, record: TransferRecord) {
        self.inner.abort_clear_task();
        *self.inner.active.lock() = Some(record);
    }

    fn update_record(&self, f: impl FnOnce(&mut TransferRecord)) -> Option<TransferRecord> {
        let mut active = self.inner.active.lock();
        let record = active.as_mut()?;
        f(record);
        Some(record.clone())
    }

    /// Schedule the owned delayed task that clears `transfer_id` after
    /// `delay`, giving observers a bounded window to read the terminal
    /// state. Replaces (and aborts) any previously scheduled clear.
    fn schedule_clear(&self, transfer_id: TransferId, delay: Duration) {
        let inner = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let inner = match inner.upgrade() {
                Some(inner) => inner,
                // controller was dropped while we slept
                None => return,
            };
            let cleared = {
                let mut active = inner.active.lock();
                match active.as_ref() {
                    Some(record) if record.id == transfer_id => active.take(),
                    _ => None,
                }
            };
            if let Some(record) = cleared {
                *inner.consultation.lock() = None;
                inner.emit_event(TransferEventType::Cleared, &record);
                tracing::debug!(transfer = %record.id, "transfer record cleared");
            }
        });
        let mut task = self.inner.clear_task.lock();
        if let Some(previous) = task.replace(handle) {
            previous.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_table_is_exact() {
        assert_eq!(TransferState::Idle.progress(), 0);
        assert_eq!(TransferState::Initiated.progress(), 25);
        assert_eq!(TransferState::InProgress.progress(), 50);
        assert_eq!(TransferState::Accepted.progress(), 75);
        assert_eq!(TransferState::Completed.progress(), 100);
        assert_eq!(TransferState::Failed.progress(), 0);
        assert_eq!(TransferState::Canceled.progress(), 0);
    }

    #[test]
    fn terminal_states_are_exactly_the_three() {
        for state in [
            TransferState::Completed,
            TransferState::Failed,
            TransferState::Canceled,
        ] {
            assert!(state.is_terminal());
        }
        for state in [
            TransferState::Idle,
            TransferState::Initiated,
            TransferState::InProgress,
            TransferState::Accepted,
        ] {
            assert!(!state.is_terminal());
        }
    }

    #[test]
    fn transfer_ids_are_prefixed() {
        let id = TransferId::new();
        assert!(id.as_str().starts_with("transfer-"));
    }

    #[test]
    fn transfer_event_serializes_for_external_consumers() {
        let event = TransferEvent {
            event_type: TransferEventType::Completed,
            transfer_id: TransferId::new(),
            state: TransferState::Completed,
            transfer_type: TransferType::Blind,
            target: "sip:carol@example.com".to_string(),
            call_id: CallId::from("call-123"),
            consultation_call_id: None,
            timestamp: Utc::now(),
            error: None,
        };
        let json = serde_json::to_value(&event).expect("event should serialize");
        assert_eq!(json["state"], "Completed");
        assert_eq!(json["target"], "sip:carol@example.com");
    }
}
