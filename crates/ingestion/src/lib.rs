//! # Ingestion Pipeline
//!
//! Event ingestion module.
//!
//! Responsibilities:
//! - Provide `EventSource` implementations (NDJSON file/stdin, Mock)
//! - Discard events older than the configured max age
//! - Stamp the cluster name onto every event
//! - Forward events in source order over a bounded channel
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{EventGate, IngestionPipeline, JsonLinesSource};
//!
//! let source = JsonLinesSource::open(Path::new("events.ndjson")).await?;
//! let pipeline = IngestionPipeline::new(EventGate::new(None, Some(300)), metrics, 256);
//! let (mut rx, handle) = pipeline.spawn(source, cancel.clone());
//! while let Some(event) = rx.recv().await {
//!     router.process_event(event).await;
//! }
//! ```

mod error;
mod gate;
mod mock;
mod ndjson;
mod pipeline;

// Re-exports
pub use contracts::{Event, EventSource};
pub use error::{IngestionError, Result};
pub use gate::EventGate;
pub use mock::{MockEventConfig, MockEventSource};
pub use ndjson::JsonLinesSource;
pub use pipeline::{IngestionPipeline, IngestionStats};
