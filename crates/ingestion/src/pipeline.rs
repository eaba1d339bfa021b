//! Ingestion Pipeline main entry

use std::sync::Arc;

use chrono::Utc;
use contracts::{Event, EventSource};
use observability::MetricsStore;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::IngestionError;
use crate::gate::EventGate;

/// Counters for one source run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionStats {
    /// Events read successfully
    pub read: u64,
    /// Events handed downstream
    pub admitted: u64,
    /// Events older than the max age
    pub too_old: u64,
    /// Malformed or unreadable input
    pub errors: u64,
}

/// Ingestion Pipeline
///
/// Pulls from one `EventSource` in a background task, applies the gate and
/// forwards events in source order over a bounded channel. The task ends
/// when the source is exhausted, the token is cancelled, or the receiver
/// is dropped.
pub struct IngestionPipeline {
    gate: EventGate,
    metrics: Arc<MetricsStore>,
    channel_capacity: usize,
}

impl IngestionPipeline {
    /// Create new Ingestion Pipeline
    pub fn new(gate: EventGate, metrics: Arc<MetricsStore>, channel_capacity: usize) -> Self {
        Self {
            gate,
            metrics,
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Start reading from `source`
    #[instrument(
        name = "ingestion_spawn",
        skip(self, source, cancel),
        fields(source = %source.name())
    )]
    pub fn spawn<S>(
        self,
        source: S,
        cancel: CancellationToken,
    ) -> (mpsc::Receiver<Arc<Event>>, JoinHandle<IngestionStats>)
    where
        S: EventSource + 'static,
    {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let handle = tokio::spawn(self.run(source, tx, cancel));
        (rx, handle)
    }

    async fn run<S: EventSource>(
        self,
        mut source: S,
        tx: mpsc::Sender<Arc<Event>>,
        cancel: CancellationToken,
    ) -> IngestionStats {
        let name = source.name().to_string();
        let mut stats = IngestionStats::default();
        info!(source = %name, "Event source started");

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(source = %name, "Event source cancelled");
                    break;
                }
                next = source.next_event() => next,
            };

            let event = match next {
                None => {
                    debug!(source = %name, "Event source exhausted");
                    break;
                }
                Some(Err(e)) => {
                    stats.errors += 1;
                    self.metrics.inc_watch_errors();
                    warn!(source = %name, error = %e, "Skipping unreadable event");
                    continue;
                }
                Some(Ok(event)) => event,
            };
            stats.read += 1;

            let Some(event) = self.gate.admit(event, Utc::now()) else {
                stats.too_old += 1;
                self.metrics.inc_events_discarded();
                debug!(source = %name, "Event older than max age, discarded");
                continue;
            };

            if tx.send(Arc::new(event)).await.is_err() {
                let err = IngestionError::ChannelClosed {
                    source_name: name.clone(),
                };
                debug!(error = %err, "Stopping event source");
                break;
            }
            stats.admitted += 1;
        }

        info!(
            source = %name,
            read = stats.read,
            admitted = stats.admitted,
            errors = stats.errors,
            "Event source stopped"
        );
        stats
    }
}
