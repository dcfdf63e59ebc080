//! # sipline-call-control
//!
//! Client-side call-control layer for a SIP/WebRTC telephony client. This
//! crate tracks the lifecycle of individual calls and orchestrates blind and
//! attended call transfer on top of an externally-supplied call/session
//! transport.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │    Client Application    │
//! └────────────┬─────────────┘
//!              │
//! ┌────────────▼─────────────┐     ┌───────────────────────┐
//! │    TransferController    │────►│  SipClient (registry  │
//! │  blind/attended transfer │     │  + dialer, external)  │
//! └────────────┬─────────────┘     └───────────┬───────────┘
//!              │ borrows by id                 │ owns
//! ┌────────────▼─────────────┐     ┌───────────▼───────────┐
//! │   CallSession (facade)   │────►│   SessionTransport    │
//! │  capability-checked ops  │     │  (SIP/SDP/media, ext) │
//! └────────────┬─────────────┘     └───────────────────────┘
//!              │ republishes
//! ┌────────────▼─────────────┐
//! │  EventBus<CallEvent>     │ ──► UI, logging, observers
//! └──────────────────────────┘
//! ```
//!
//! The wire protocol, SDP/ICE negotiation and media capture all live behind
//! the [`SessionTransport`] seam; device handling, presence and messaging
//! are the embedding client's business. What this crate guarantees is the
//! orchestration: single-flight transfers, capability-checked delegation,
//! compensating actions on cancellation, and time-bounded visibility of
//! terminal transfer states.
//!
//! ## Quick start
//!
//! ```rust
//! use sipline_call_control::{TransferConfig, TransferController};
//!
//! let controller = TransferController::new(TransferConfig::default());
//! // nothing in flight yet
//! assert!(controller.get_transfer_progress().is_none());
//! ```

pub mod call;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod session;
pub mod transfer;
pub mod transport;

// Re-export main types
pub use call::{CallCapabilities, CallDirection, CallId, CallSessionInfo, CallState, CallTiming};
pub use client::{CallMediaOptions, SipClient};
pub use config::TransferConfig;
pub use error::{CallControlError, CallControlResult};
pub use events::{CallEvent, CallEventBus, CallEventKind};
pub use session::CallSession;
pub use transfer::{
    TransferController, TransferEvent, TransferEventType, TransferId, TransferListenerId,
    TransferProgress, TransferProgressUpdate, TransferRecord, TransferState, TransferType,
};
pub use transport::{
    SessionTransport, TransportCapabilities, TransportError, TransportResult, TransportSessionEvent,
};

// Re-export the bus for embedders wiring their own event families
pub use sipline_event_bus as event_bus;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
