//! `info` command implementation.

use anyhow::Context;
use contracts::{ExporterConfig, PredicateConfig, RouteConfig, SinkConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::{CliError, Result};

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    cluster_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_event_age_seconds: Option<u64>,
    metrics_name_prefix: &'a str,
    send_timeout_seconds: u64,
    shutdown_grace_seconds: u64,
    receivers: Vec<ReceiverInfo<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    route: Option<&'a RouteConfig>,
}

#[derive(Serialize)]
struct ReceiverInfo<'a> {
    name: &'a str,
    sink_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct SinkInfo {
    sink_type: &'static str,
    target: String,
    templated: bool,
}

impl SinkInfo {
    fn new(config: &SinkConfig) -> Self {
        Self {
            sink_type: config.kind(),
            target: sink_target(config),
            templated: config.layout().is_some(),
        }
    }
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()));
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)?;

    if args.json {
        let info = build_config_info(&config, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{json}");
    } else {
        print_config_info(&config, args);
    }

    Ok(())
}

fn build_config_info<'a>(config: &'a ExporterConfig, args: &InfoArgs) -> ConfigInfo<'a> {
    ConfigInfo {
        cluster_name: config.cluster_name.as_deref(),
        max_event_age_seconds: config.max_event_age_seconds,
        metrics_name_prefix: &config.metrics_name_prefix,
        send_timeout_seconds: config.send_timeout_seconds,
        shutdown_grace_seconds: config.shutdown_grace_seconds,
        receivers: config
            .receivers
            .iter()
            .map(|receiver| ReceiverInfo {
                name: &receiver.name,
                sink_count: receiver.sinks.len(),
                sinks: if args.sinks {
                    receiver.sinks.iter().map(SinkInfo::new).collect()
                } else {
                    Vec::new()
                },
            })
            .collect(),
        route: args.routes.then_some(&config.route),
    }
}

fn sink_target(config: &SinkConfig) -> String {
    match config {
        SinkConfig::Stdout(_) => "stdout".to_string(),
        SinkConfig::Syslog(syslog) => format!(
            "{}://{} tag={} severity={}",
            format!("{:?}", syslog.network).to_lowercase(),
            syslog.address,
            syslog.tag,
            format!("{:?}", syslog.severity).to_lowercase()
        ),
        SinkConfig::EventBridge(bus) => format!(
            "{}@{} source={} detailType={}",
            bus.event_bus_name, bus.region, bus.source, bus.detail_type
        ),
    }
}

fn print_config_info(config: &ExporterConfig, args: &InfoArgs) {
    println!("\n=== Exporter Configuration ===\n");
    println!(
        "Cluster:        {}",
        config.cluster_name.as_deref().unwrap_or("(unset)")
    );
    match config.max_event_age_seconds {
        Some(age) => println!("Max event age:  {age}s"),
        None => println!("Max event age:  unlimited"),
    }
    println!("Metrics prefix: {}", config.metrics_name_prefix);
    println!("Send timeout:   {}s", config.send_timeout_seconds);
    println!("Shutdown grace: {}s", config.shutdown_grace_seconds);

    println!("\nReceivers ({}):", config.receivers.len());
    for receiver in &config.receivers {
        println!("  {} ({} sinks)", receiver.name, receiver.sinks.len());
        if args.sinks {
            for (index, sink) in receiver.sinks.iter().enumerate() {
                let info = SinkInfo::new(sink);
                let template = if info.templated { " [template]" } else { "" };
                println!(
                    "    [{index}] {:<12} {}{template}",
                    info.sink_type, info.target
                );
            }
        }
    }

    if args.routes {
        println!("\nRoute tree:");
        print_route(&config.route, router::ROOT_LABEL, 1);
    }

    println!();
}

fn print_route(route: &RouteConfig, label: &str, depth: usize) {
    let indent = "  ".repeat(depth);
    println!("{indent}{label}");
    for predicate in &route.drop {
        println!("{indent}  drop  {}", describe(predicate));
    }
    for predicate in &route.matches {
        println!("{indent}  match {}", describe(predicate));
    }
    if !route.receivers.is_empty() {
        println!("{indent}  -> {}", route.receivers.join(", "));
    }
    for (index, child) in route.routes.iter().enumerate() {
        print_route(child, &format!("{label}.routes[{index}]"), depth + 1);
    }
}

fn describe(predicate: &PredicateConfig) -> String {
    match (&predicate.value, &predicate.pattern) {
        (Some(value), _) => format!("{} == {value:?}", predicate.field),
        (None, Some(pattern)) => format!("{} =~ /{pattern}/", predicate.field),
        (None, None) => predicate.field.clone(),
    }
}
