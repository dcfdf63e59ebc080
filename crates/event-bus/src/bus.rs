//! The typed event dispatcher
//!
//! Registrations live in a handle-indexed map so that removal by id is O(1)
//! regardless of how many handlers an event kind has accumulated. Ordering
//! across handlers of the same kind is priority (descending) first, then
//! registration order, tracked with a monotonic sequence counter.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::{BusError, BusResult};

/// A closed event family dispatched through an [`EventBus`].
///
/// `Kind` is the discriminant handlers subscribe to; the event values carry
/// the payload. Implementations are plain enums, one variant per event.
pub trait BusEvent: Clone + Send + Sync + 'static {
    /// Discriminant type identifying each event variant
    type Kind: Copy + Eq + std::hash::Hash + fmt::Debug + Send + Sync + 'static;

    /// The discriminant of this event value
    fn kind(&self) -> Self::Kind;
}

/// Stable handle for a registered handler.
///
/// Generated handles are UUID-backed; callers may also supply their own
/// stable ids at registration time. Handles are never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerId(String);

impl HandlerId {
    /// Create a handler id from a caller-chosen string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh unique handler id
    pub fn generate() -> Self {
        Self(format!("handler-{}", uuid::Uuid::new_v4()))
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Options for [`EventBus::register`]
#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
    /// Handlers with higher priority run first; default 0
    pub priority: i32,
    /// Remove the handler after its first invocation
    pub once: bool,
    /// Caller-supplied id; a fresh one is generated when absent
    pub id: Option<HandlerId>,
}

impl RegisterOptions {
    /// Default options: priority 0, repeat delivery, generated id
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dispatch priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Remove the handler after its first invocation
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    /// Use a caller-chosen handler id
    pub fn with_id(mut self, id: HandlerId) -> Self {
        self.id = Some(id);
        self
    }
}

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Registration<E: BusEvent> {
    kind: E::Kind,
    priority: i32,
    once: bool,
    seq: u64,
    handler: Handler<E>,
}

struct BusInner<E: BusEvent> {
    registrations: DashMap<HandlerId, Registration<E>>,
    next_seq: AtomicU64,
}

/// Typed publish/subscribe dispatcher.
///
/// Cheap to clone; clones share the same registrations.
pub struct EventBus<E: BusEvent> {
    inner: Arc<BusInner<E>>,
}

impl<E: BusEvent> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BusEvent> EventBus<E> {
    /// Create an empty bus
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                registrations: DashMap::new(),
                next_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Register a handler for one event kind.
    ///
    /// Returns a stable [`HandlerId`] for later removal. When
    /// `options.id` is supplied it is honored verbatim, replacing any
    /// previous registration under the same id.
    pub fn register(
        &self,
        kind: E::Kind,
        handler: impl Fn(&E) + Send + Sync + 'static,
        options: RegisterOptions,
    ) -> HandlerId {
        let id = options.id.unwrap_or_else(HandlerId::generate);
        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
        self.inner.registrations.insert(
            id.clone(),
            Registration {
                kind,
                priority: options.priority,
                once: options.once,
                seq,
                handler: Arc::new(handler),
            },
        );
        tracing::debug!(handler = %id, event = ?kind, priority = options.priority, once = options.once, "registered event handler");
        id
    }

    /// Register a handler with default options
    pub fn subscribe(&self, kind: E::Kind, handler: impl Fn(&E) + Send + Sync + 'static) -> HandlerId {
        self.register(kind, handler, RegisterOptions::new())
    }

    /// Register a handler that fires at most once
    pub fn subscribe_once(&self, kind: E::Kind, handler: impl Fn(&E) + Send + Sync + 'static) -> HandlerId {
        self.register(kind, handler, RegisterOptions::new().once())
    }

    /// Remove a registration by id.
    ///
    /// Idempotent; returns whether a registration was actually removed.
    pub fn unregister(&self, id: &HandlerId) -> bool {
        let removed = self.inner.registrations.remove(id).is_some();
        if removed {
            tracing::debug!(handler = %id, "unregistered event handler");
        }
        removed
    }

    /// Remove all registrations for one event kind, or every registration
    /// when `kind` is `None`
    pub fn remove_all_listeners(&self, kind: Option<E::Kind>) {
        match kind {
            Some(kind) => self.inner.registrations.retain(|_, reg| reg.kind != kind),
            None => self.inner.registrations.clear(),
        }
    }

    /// Number of handlers currently registered for an event kind
    pub fn listener_count(&self, kind: E::Kind) -> usize {
        self.inner
            .registrations
            .iter()
            .filter(|entry| entry.value().kind == kind)
            .count()
    }

    /// Synchronously dispatch an event to every handler registered for its
    /// kind.
    ///
    /// Handlers run ordered by descending priority, then registration order.
    /// `once` handlers are removed before invocation so a re-entrant emit
    /// cannot fire them twice. A panicking handler is caught and logged and
    /// does not prevent the remaining handlers from running.
    pub fn emit(&self, event: &E) {
        let kind = event.kind();
        let mut matched: Vec<(HandlerId, i32, u64, bool, Handler<E>)> = self
            .inner
            .registrations
            .iter()
            .filter(|entry| entry.value().kind == kind)
            .map(|entry| {
                let reg = entry.value();
                (entry.key().clone(), reg.priority, reg.seq, reg.once, Arc::clone(&reg.handler))
            })
            .collect();
        matched.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        for (id, _, _, once, handler) in matched {
            if once {
                // Removal before invocation; if a re-entrant emit won the
                // race the handler has already fired.
                if self.inner.registrations.remove(&id).is_none() {
                    continue;
                }
            }
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                tracing::error!(handler = %id, event = ?kind, "event handler panicked; continuing dispatch");
            }
        }
    }

    /// Wait for the next event of one kind.
    ///
    /// Resolves with a clone of the next matching payload. With a timeout,
    /// returns [`BusError::Timeout`] once it elapses. The pending
    /// registration is removed on both paths, so abandoned waits do not
    /// leak handlers.
    pub async fn wait_for(&self, kind: E::Kind, timeout: Option<Duration>) -> BusResult<E> {
        let (tx, rx) = tokio::sync::oneshot::channel::<E>();
        let slot = Mutex::new(Some(tx));
        let id = self.register(
            kind,
            move |event: &E| {
                if let Some(tx) = slot.lock().take() {
                    let _ = tx.send(event.clone());
                }
            },
            RegisterOptions::new().once(),
        );

        match timeout {
            Some(duration) => match tokio::time::timeout(duration, rx).await {
                Ok(Ok(event)) => Ok(event),
                Ok(Err(_)) => {
                    self.unregister(&id);
                    Err(BusError::Closed)
                }
                Err(_) => {
                    self.unregister(&id);
                    Err(BusError::Timeout {
                        timeout_ms: duration.as_millis() as u64,
                    })
                }
            },
            None => rx.await.map_err(|_| BusError::Closed),
        }
    }
}
