//! # sipline-event-bus
//!
//! Typed publish/subscribe dispatcher used across the sipline stack to decouple
//! producers (call sessions, transfer orchestration) from consumers (UI layers,
//! logging, other subsystems).
//!
//! Events form a closed family: an enum implementing [`BusEvent`] whose
//! [`BusEvent::Kind`] discriminant is what handlers subscribe to. Dispatch is
//! synchronous within [`EventBus::emit`], ordered by descending priority and
//! then registration order. A handler that panics is caught and logged; it
//! never takes down the emitter or the remaining handlers.
//!
//! ```rust
//! use sipline_event_bus::{BusEvent, EventBus};
//!
//! #[derive(Debug, Clone)]
//! enum LineEvent {
//!     Seized { line: u32 },
//!     Released { line: u32 },
//! }
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum LineEventKind {
//!     Seized,
//!     Released,
//! }
//!
//! impl BusEvent for LineEvent {
//!     type Kind = LineEventKind;
//!
//!     fn kind(&self) -> LineEventKind {
//!         match self {
//!             LineEvent::Seized { .. } => LineEventKind::Seized,
//!             LineEvent::Released { .. } => LineEventKind::Released,
//!         }
//!     }
//! }
//!
//! let bus = EventBus::<LineEvent>::new();
//! let id = bus.subscribe(LineEventKind::Seized, |event| {
//!     println!("observed: {:?}", event);
//! });
//! bus.emit(&LineEvent::Seized { line: 2 });
//! assert!(bus.unregister(&id));
//! ```

pub mod bus;
pub mod error;

pub use bus::{BusEvent, EventBus, HandlerId, RegisterOptions};
pub use error::{BusError, BusResult};
