//! SIP client collaborator surface
//!
//! The transfer controller never owns call sessions; it borrows them by id
//! from whatever registry the embedding client maintains, and asks the same
//! client to place the consultation call during an attended transfer.

use std::sync::Arc;

use async_trait::async_trait;

use crate::call::CallId;
use crate::error::CallControlResult;
use crate::session::CallSession;

/// Media options for an outgoing call placed on behalf of the controller
#[derive(Debug, Clone, Copy, Default)]
pub struct CallMediaOptions {
    /// Whether to offer video; consultation calls are always audio-only
    pub video: bool,
}

/// The client-side call registry and dialer the controller collaborates with
#[async_trait]
pub trait SipClient: Send + Sync {
    /// Look up a live call session by id. Returns `None` once a call has
    /// been terminated and removed from the registry.
    fn get_active_call(&self, call_id: &CallId) -> Option<Arc<CallSession>>;

    /// Place a new outgoing call to `uri` and return its id once the
    /// invitation has been issued
    async fn make_call(&self, uri: &str, options: CallMediaOptions) -> CallControlResult<CallId>;
}
