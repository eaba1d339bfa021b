//! EventSink trait - Receiver registry output interface
//!
//! Defines the delivery capability every destination implements.

use crate::{Event, SinkError};

/// Event delivery trait
///
/// All sink implementations must implement this trait. `send` may be called
/// concurrently for different events; `close` must be safe to call twice.
#[trait_variant::make(EventSink: Send)]
pub trait LocalEventSink {
    /// Sink kind (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver one event
    ///
    /// # Errors
    /// Returns delivery error (should include context)
    async fn send(&self, event: &Event) -> Result<(), SinkError>;

    /// Release the destination connection
    async fn close(&self) -> Result<(), SinkError>;
}
