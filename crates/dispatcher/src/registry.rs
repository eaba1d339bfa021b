//! ReceiverRegistry - receiver name to sinks, with isolated fan-out

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use contracts::{Event, EventSink, SinkError};
use futures::future::join_all;
use observability::MetricsStore;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::DispatcherError;
use crate::metrics::{MetricsSnapshot, SinkMetrics};
use crate::sinks::SinkKind;

/// A sink plus its delivery counters
struct RegisteredSink<S> {
    sink: Arc<S>,
    metrics: Arc<SinkMetrics>,
}

/// Result of one `send_event` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOutcome {
    pub delivered: usize,
    pub failed: usize,
}

/// Registry of named receivers
///
/// Registration happens at configuration time through `&mut self`; after
/// that the map is only read. `close` raises a barrier: sends that have not
/// started yet are refused, in-flight sends get the grace period and are
/// then cancelled.
pub struct ReceiverRegistry<S = SinkKind> {
    receivers: HashMap<String, Vec<RegisteredSink<S>>>,
    metrics: Arc<MetricsStore>,
    send_timeout: Duration,
    /// `true` once closed; readers are in-flight sends
    gate: RwLock<bool>,
    /// Set as soon as `close` starts, before the gate is taken
    closing: AtomicBool,
    cancel: CancellationToken,
}

impl<S> fmt::Debug for ReceiverRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.receivers.keys().collect();
        names.sort();
        f.debug_struct("ReceiverRegistry")
            .field("receivers", &names)
            .field("send_timeout", &self.send_timeout)
            .field("closing", &self.closing.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<S> ReceiverRegistry<S>
where
    S: EventSink + Sync + 'static,
{
    /// Create an empty registry
    pub fn new(metrics: Arc<MetricsStore>, send_timeout: Duration) -> Self {
        Self {
            receivers: HashMap::new(),
            metrics,
            send_timeout,
            gate: RwLock::new(false),
            closing: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    /// Bind one sink to a new receiver name
    ///
    /// # Errors
    /// `DuplicateReceiver` if the name is already registered.
    pub fn register(&mut self, name: impl Into<String>, sink: S) -> Result<(), DispatcherError> {
        self.register_all(name, vec![sink])
    }

    /// Bind several sinks to a new receiver name
    ///
    /// # Errors
    /// `DuplicateReceiver` if the name is already registered.
    pub fn register_all(
        &mut self,
        name: impl Into<String>,
        sinks: Vec<S>,
    ) -> Result<(), DispatcherError> {
        let name = name.into();
        if self.receivers.contains_key(&name) {
            return Err(DispatcherError::DuplicateReceiver { name });
        }

        debug!(receiver = %name, sinks = sinks.len(), "Registered receiver");
        let entries = sinks
            .into_iter()
            .map(|sink| RegisteredSink {
                sink: Arc::new(sink),
                metrics: Arc::new(SinkMetrics::new()),
            })
            .collect();
        self.receivers.insert(name, entries);
        Ok(())
    }

    /// Whether a receiver name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.receivers.contains_key(name)
    }

    /// Registered receiver names (unordered)
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.receivers.keys().map(String::as_str)
    }

    /// Shared metrics store
    pub fn metrics_store(&self) -> &Arc<MetricsStore> {
        &self.metrics
    }

    /// Per-sink counters as `(receiver, sink, snapshot)`
    pub fn sink_metrics(&self) -> Vec<(String, String, MetricsSnapshot)> {
        let mut out: Vec<_> = self
            .receivers
            .iter()
            .flat_map(|(name, sinks)| {
                sinks.iter().map(move |entry| {
                    (
                        name.clone(),
                        entry.sink.name().to_string(),
                        entry.metrics.snapshot(),
                    )
                })
            })
            .collect();
        out.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
        out
    }

    /// Deliver an event to every sink of a receiver
    ///
    /// One task per sink, all joined before returning. Failures are counted
    /// and logged here and never reach the caller. An unknown or empty
    /// receiver counts as a discard.
    #[instrument(
        name = "registry_send_event",
        skip(self, event),
        fields(receiver = %name, event = %event.identity())
    )]
    pub async fn send_event(&self, name: &str, event: &Arc<Event>) -> SendOutcome {
        if self.closing.load(Ordering::Acquire) {
            return self.discard_closed(name);
        }
        let gate = self.gate.read().await;
        if *gate || self.closing.load(Ordering::Acquire) {
            return self.discard_closed(name);
        }

        let sinks = match self.receivers.get(name) {
            Some(sinks) if !sinks.is_empty() => sinks,
            _ => {
                debug!(receiver = %name, "No sinks registered, event discarded");
                self.metrics.inc_events_discarded();
                return SendOutcome::default();
            }
        };

        let mut tasks = JoinSet::new();
        for entry in sinks {
            let sink = Arc::clone(&entry.sink);
            let sink_metrics = Arc::clone(&entry.metrics);
            let event = Arc::clone(event);
            let cancel = self.cancel.clone();
            let timeout = self.send_timeout;

            tasks.spawn(async move {
                let result = deliver(sink.as_ref(), &event, &cancel, timeout).await;
                (sink.name().to_string(), sink_metrics, result)
            });
        }

        let mut outcome = SendOutcome::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, sink_metrics, Ok(()))) => {
                    outcome.delivered += 1;
                    sink_metrics.inc_sent_count();
                    self.metrics.inc_events_sent();
                }
                Ok((sink_name, sink_metrics, Err(e))) => {
                    outcome.failed += 1;
                    self.record_failure(&sink_metrics, &e);
                    error!(
                        receiver = %name,
                        sink = %sink_name,
                        event = %event.identity(),
                        error = %e,
                        "Send event failed"
                    );
                }
                Err(e) => {
                    outcome.failed += 1;
                    self.metrics.inc_send_errors();
                    error!(
                        receiver = %name,
                        event = %event.identity(),
                        error = ?e,
                        "Sink task panicked"
                    );
                }
            }
        }

        drop(gate);
        outcome
    }

    fn discard_closed(&self, name: &str) -> SendOutcome {
        warn!(receiver = %name, "Registry closed, event discarded");
        self.metrics.inc_events_discarded();
        SendOutcome::default()
    }

    fn record_failure(&self, sink_metrics: &SinkMetrics, err: &SinkError) {
        self.metrics.inc_send_errors();
        match err {
            SinkError::Cancelled { .. } => sink_metrics.inc_cancelled_count(),
            SinkError::Render { .. } => {
                self.metrics.inc_render_errors();
                sink_metrics.inc_failure_count();
            }
            _ => sink_metrics.inc_failure_count(),
        }
    }

    /// Close every registered sink once
    ///
    /// Waits up to `grace` for in-flight sends, cancels the rest, then
    /// closes all sinks concurrently (each bounded by `grace`). Later calls
    /// are no-ops.
    #[instrument(name = "registry_close", skip(self))]
    pub async fn close(&self, grace: Duration) {
        self.closing.store(true, Ordering::Release);
        let mut gate = match tokio::time::timeout(grace, self.gate.write()).await {
            Ok(gate) => gate,
            Err(_) => {
                warn!(
                    grace_ms = grace.as_millis() as u64,
                    "Grace period elapsed, cancelling in-flight sends"
                );
                self.cancel.cancel();
                self.gate.write().await
            }
        };

        if *gate {
            debug!("Registry already closed");
            return;
        }
        *gate = true;

        let closing = self.receivers.iter().flat_map(|(name, sinks)| {
            sinks.iter().map(move |entry| async move {
                let sink = entry.sink.as_ref();
                match tokio::time::timeout(grace, sink.close()).await {
                    Ok(Ok(())) => debug!(receiver = %name, sink = %sink.name(), "Sink closed"),
                    Ok(Err(e)) => {
                        error!(receiver = %name, sink = %sink.name(), error = %e, "Close failed")
                    }
                    Err(_) => {
                        error!(receiver = %name, sink = %sink.name(), "Close timed out")
                    }
                }
            })
        });
        join_all(closing).await;

        info!(receivers = self.receivers.len(), "Receiver registry closed");
    }
}

/// Race one send against shutdown and the delivery timeout
async fn deliver<S: EventSink + Sync>(
    sink: &S,
    event: &Event,
    cancel: &CancellationToken,
    timeout: Duration,
) -> Result<(), SinkError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SinkError::Cancelled {
            sink: sink.name().to_string(),
        }),
        result = tokio::time::timeout(timeout, sink.send(event)) => {
            result.unwrap_or_else(|_| {
                Err(SinkError::TimedOut {
                    sink: sink.name().to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            })
        }
    }
}
