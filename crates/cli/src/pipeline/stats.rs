//! Pipeline statistics.

use std::time::Duration;

use ingestion::IngestionStats;
use dispatcher::MetricsSnapshot as SinkSnapshot;
use observability::MetricsSnapshot;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Events handed to the router
    pub events_routed: u64,

    /// Receiver dispatches, duplicates included
    pub dispatches: u64,

    /// Sink deliveries that succeeded
    pub delivered: u64,

    /// Sink deliveries that failed
    pub failed: u64,

    /// Source-side counters
    pub ingestion: IngestionStats,

    /// Final metrics store snapshot
    pub metrics: MetricsSnapshot,

    /// Per-sink counters as `(receiver, sink, snapshot)`
    pub sinks: Vec<(String, String, SinkSnapshot)>,

    /// Total duration of the pipeline run
    pub duration: Duration,
}

impl PipelineStats {
    /// Events routed per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.events_routed as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Failed deliveries as a percentage of attempts
    pub fn failure_rate(&self) -> f64 {
        let total = self.delivered + self.failed;
        if total > 0 {
            (self.failed as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary to stderr
    pub fn print_summary(&self) {
        eprintln!("\n=== Exporter Statistics ===\n");

        eprintln!("Overview");
        eprintln!("  Duration:       {:.2}s", self.duration.as_secs_f64());
        eprintln!("  Events routed:  {}", self.events_routed);
        eprintln!("  Throughput:     {:.2} events/s", self.throughput());
        eprintln!("  Dispatches:     {}", self.dispatches);
        eprintln!(
            "  Deliveries:     {} ok, {} failed ({:.2}%)",
            self.delivered,
            self.failed,
            self.failure_rate()
        );

        eprintln!("\nSource");
        eprintln!("  Read:           {}", self.ingestion.read);
        eprintln!("  Admitted:       {}", self.ingestion.admitted);
        eprintln!("  Too old:        {}", self.ingestion.too_old);
        eprintln!("  Errors:         {}", self.ingestion.errors);

        eprintln!("\nMetrics");
        eprintln!("  {}", self.metrics);

        if !self.sinks.is_empty() {
            eprintln!("\nSinks");
            for (receiver, sink, snapshot) in &self.sinks {
                eprintln!(
                    "  {receiver}/{sink}: sent={} failed={} cancelled={}",
                    snapshot.sent_count, snapshot.failure_count, snapshot.cancelled_count
                );
            }
        }

        eprintln!();
    }
}
