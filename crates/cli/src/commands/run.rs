//! `run` command implementation.

use std::time::Duration;

use config_loader::ConfigLoader;
use contracts::ExporterConfig;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use crate::pipeline::{InputSource, Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()));
    }

    let mut exporter = ConfigLoader::load_from_path(&args.config)?;

    // Apply CLI overrides
    if let Some(ref cluster) = args.cluster_name {
        info!(cluster = %cluster, "Overriding cluster name from CLI");
        exporter.cluster_name = Some(cluster.clone());
    }

    info!(
        cluster = exporter.cluster_name.as_deref().unwrap_or("-"),
        receivers = exporter.receivers.len(),
        child_routes = exporter.route.routes.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&exporter);
        return Ok(());
    }

    let input = match args.mock {
        Some(count) => InputSource::Mock {
            count,
            interval: Duration::from_millis(args.mock_interval_ms),
        },
        None if args.input.as_os_str() == "-" => InputSource::Stdin,
        None => InputSource::File(args.input.clone()),
    };

    let pipeline = Pipeline::new(PipelineConfig {
        exporter,
        input,
        buffer_size: args.buffer_size,
        metrics_port: (args.metrics_port != 0).then_some(args.metrics_port),
    });

    info!("Starting pipeline...");
    let stats = pipeline
        .run(shutdown_signal())
        .await
        .map_err(|e| CliError::pipeline_execution(format!("{e:#}")))?;

    info!(
        events_routed = stats.events_routed,
        delivered = stats.delivered,
        failed = stats.failed,
        duration_secs = stats.duration.as_secs_f64(),
        "Pipeline completed"
    );
    stats.print_summary();

    info!("Event exporter finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(exporter: &ExporterConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!(
        "Cluster: {}",
        exporter.cluster_name.as_deref().unwrap_or("(unset)")
    );
    if let Some(age) = exporter.max_event_age_seconds {
        println!("Max event age: {age}s");
    }
    println!(
        "Send timeout: {}s, shutdown grace: {}s",
        exporter.send_timeout_seconds, exporter.shutdown_grace_seconds
    );

    println!("\nReceivers ({}):", exporter.receivers.len());
    for receiver in &exporter.receivers {
        let kinds: Vec<_> = receiver.sinks.iter().map(|s| s.kind()).collect();
        println!("  - {} [{}]", receiver.name, kinds.join(", "));
    }
    println!();
}
