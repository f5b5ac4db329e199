//! Realtime channel trait.
//!
//! The browser client kept its transport as a process-wide singleton;
//! here it is an explicitly constructed, injected dependency so the
//! controller can be exercised without a live network connection.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::protocol::{ClientEvent, ServerEvent};

/// A persistent, bidirectional event transport to the support backend.
///
/// Implementations own their own reconnection policy; callers rely on the
/// same session identity across reconnects and do not re-send in-flight
/// messages.
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    /// Establishes the connection.
    async fn connect(&self) -> Result<()>;

    /// Tears the connection down.
    async fn disconnect(&self) -> Result<()>;

    /// Emits one outbound event.
    ///
    /// # Errors
    ///
    /// Returns a `Transport` error when the channel is disconnected or the
    /// write fails; callers decide whether that is fatal (the controller
    /// treats it as connectivity status, not an error).
    async fn send(&self, event: ClientEvent) -> Result<()>;

    /// Subscribes to inbound events.
    ///
    /// Each receiver gets every event delivered after subscription.
    fn subscribe(&self) -> broadcast::Receiver<ServerEvent>;

    /// Current connectivity status.
    fn is_connected(&self) -> bool;
}
