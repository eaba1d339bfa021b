//! EventSource trait - Router input interface
//!
//! Pull-based stream of events; the pipeline asks for the next event only
//! after the previous one has been routed, which keeps dispatch in
//! ingestion order.

use crate::{ContractError, Event};

/// Event producer trait
#[trait_variant::make(EventSource: Send)]
pub trait LocalEventSource {
    /// Source name (used for logging)
    fn name(&self) -> &str;

    /// Next event, `None` once the source is exhausted
    ///
    /// A recoverable problem (one malformed record) is returned as
    /// `Some(Err(..))`; the caller counts it and keeps pulling.
    async fn next_event(&mut self) -> Option<Result<Event, ContractError>>;
}
