//! Pipeline orchestrator - coordinates all components.
//!
//! Startup: metrics server, metrics store, receiver registry, router, source.
//! Shutdown: stop source, drain router, close registry, stop metrics server,
//! destroy store.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{Event, EventSource, ExporterConfig};
use dispatcher::{build_registry, DispatcherConfig};
use ingestion::{
    EventGate, IngestionPipeline, IngestionStats, JsonLinesSource, MockEventConfig,
    MockEventSource,
};
use observability::{MetricsServer, MetricsStore};
use router::Router;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::PipelineStats;

/// Where events come from
#[derive(Debug, Clone)]
pub enum InputSource {
    /// NDJSON on standard input
    Stdin,
    /// NDJSON file
    File(PathBuf),
    /// Generated events
    Mock { count: u64, interval: Duration },
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated exporter configuration
    pub exporter: ExporterConfig,

    /// Event input
    pub input: InputSource,

    /// Channel buffer size between source and router
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

impl PipelineConfig {
    fn dispatcher(&self) -> DispatcherConfig {
        DispatcherConfig {
            send_timeout: Duration::from_secs(self.exporter.send_timeout_seconds),
            shutdown_grace: Duration::from_secs(self.exporter.shutdown_grace_seconds),
        }
    }
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until the source is exhausted or `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<PipelineStats> {
        // The recorder must exist before the store registers its counters
        let metrics_server = match self.config.metrics_port {
            Some(port) => Some(MetricsServer::spawn(port)?),
            None => None,
        };
        let store = Arc::new(MetricsStore::new(
            self.config.exporter.metrics_name_prefix.clone(),
        ));

        let result = self.run_with_store(Arc::clone(&store), shutdown).await;

        if let Some(server) = metrics_server {
            server.shutdown().await;
        }
        let metrics = match Arc::try_unwrap(store) {
            Ok(store) => store.destroy(),
            Err(shared) => {
                warn!("Metrics store still shared at shutdown");
                shared.snapshot()
            }
        };

        result.map(|mut stats| {
            stats.metrics = metrics;
            stats
        })
    }

    async fn run_with_store(
        self,
        store: Arc<MetricsStore>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let dispatcher_config = self.config.dispatcher();
        let exporter = &self.config.exporter;

        let registry = build_registry(&exporter.receivers, Arc::clone(&store), dispatcher_config)
            .await
            .context("Failed to build receivers")?;
        let registry = Arc::new(registry);

        let router = match Router::new(&exporter.route, Arc::clone(&registry), Arc::clone(&store)) {
            Ok(router) => router,
            Err(e) => {
                registry.close(dispatcher_config.shutdown_grace).await;
                return Err(e).context("Failed to arm router");
            }
        };

        let gate = EventGate::new(exporter.cluster_name.clone(), exporter.max_event_age_seconds);
        let ingestion = IngestionPipeline::new(gate, Arc::clone(&store), self.config.buffer_size);
        let cancel = CancellationToken::new();

        let (rx, handle) = match spawn_source(&self.config.input, ingestion, cancel.clone()).await {
            Ok(spawned) => spawned,
            Err(e) => {
                registry.close(dispatcher_config.shutdown_grace).await;
                return Err(e);
            }
        };

        info!(
            receivers = exporter.receivers.len(),
            "Pipeline started"
        );

        let mut stats = route_events(&router, rx, cancel, shutdown).await;

        stats.ingestion = match handle.await {
            Ok(ingestion) => ingestion,
            Err(e) => {
                warn!(error = %e, "Event source task failed");
                IngestionStats::default()
            }
        };

        registry.close(dispatcher_config.shutdown_grace).await;
        stats.sinks = registry.sink_metrics();
        stats.duration = start_time.elapsed();

        drop(router);
        drop(registry);
        Ok(stats)
    }
}

/// Consume the channel until it closes; `shutdown` only stops the source
async fn route_events(
    router: &Router,
    mut rx: mpsc::Receiver<Arc<Event>>,
    cancel: CancellationToken,
    shutdown: impl Future<Output = ()>,
) -> PipelineStats {
    let mut stats = PipelineStats::default();
    tokio::pin!(shutdown);
    let mut stopping = false;

    loop {
        let event = tokio::select! {
            biased;
            _ = &mut shutdown, if !stopping => {
                info!("Shutdown requested, draining buffered events");
                stopping = true;
                cancel.cancel();
                continue;
            }
            event = rx.recv() => event,
        };
        let Some(event) = event else {
            break;
        };

        let outcome = router.process_event(event).await;
        stats.events_routed += 1;
        stats.dispatches += outcome.receivers as u64;
        stats.delivered += outcome.delivered as u64;
        stats.failed += outcome.failed as u64;
    }

    debug!(events = stats.events_routed, "Router drained");
    stats
}

async fn spawn_source(
    input: &InputSource,
    ingestion: IngestionPipeline,
    cancel: CancellationToken,
) -> Result<(mpsc::Receiver<Arc<Event>>, JoinHandle<IngestionStats>)> {
    let spawned = match input {
        InputSource::Stdin => start(ingestion, JsonLinesSource::new("stdin", tokio::io::stdin()), cancel),
        InputSource::File(path) => {
            let source = JsonLinesSource::open(path)
                .await
                .with_context(|| format!("Failed to open event input {}", path.display()))?;
            start(ingestion, source, cancel)
        }
        InputSource::Mock { count, interval } => {
            let source = MockEventSource::new(MockEventConfig {
                count: *count,
                interval: *interval,
                ..Default::default()
            });
            start(ingestion, source, cancel)
        }
    };
    Ok(spawned)
}

fn start<S: EventSource + 'static>(
    ingestion: IngestionPipeline,
    source: S,
    cancel: CancellationToken,
) -> (mpsc::Receiver<Arc<Event>>, JoinHandle<IngestionStats>) {
    info!(source = %source.name(), "Starting event source");
    ingestion.spawn(source, cancel)
}
