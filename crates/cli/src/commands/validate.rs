//! `validate` command implementation.

use std::collections::HashSet;

use anyhow::Context;
use contracts::{ExporterConfig, RouteConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::error::{CliError, Result};

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    cluster_name: Option<String>,
    receiver_count: usize,
    sink_count: usize,
    route_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let (result, outcome) = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{json}");
    } else {
        print_validation_result(&result);
    }

    outcome
}

/// Report for display plus the typed error that decides the exit code
fn validate_config(args: &ValidateArgs) -> (ValidationResult, Result<()>) {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        let result = ValidationResult {
            valid: false,
            error: Some(format!("File not found: {config_path}")),
            config_path: config_path.clone(),
            warnings: Vec::new(),
            summary: None,
        };
        return (result, Err(CliError::config_not_found(config_path)));
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let result = ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: collect_warnings(&config),
                summary: Some(ConfigSummary {
                    cluster_name: config.cluster_name.clone(),
                    receiver_count: config.receivers.len(),
                    sink_count: config.receivers.iter().map(|r| r.sinks.len()).sum(),
                    route_count: count_routes(&config.route),
                }),
            };
            (result, Ok(()))
        }
        Err(e) => {
            let result = ValidationResult {
                valid: false,
                config_path,
                error: Some(e.to_string()),
                warnings: Vec::new(),
                summary: None,
            };
            (result, Err(e.into()))
        }
    }
}

/// Non-fatal issues in an otherwise valid configuration
fn collect_warnings(config: &ExporterConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    let mut referenced = HashSet::new();
    collect_references(&config.route, &mut referenced);

    if referenced.is_empty() {
        warnings.push("No route references a receiver - every event will be discarded".to_string());
    }

    for receiver in &config.receivers {
        if !referenced.contains(receiver.name.as_str()) {
            warnings.push(format!(
                "Receiver '{}' is not referenced by any route",
                receiver.name
            ));
        }
    }

    if config.max_event_age_seconds.is_none() {
        warnings.push("maxEventAgeSeconds is unset - events of any age are exported".to_string());
    }

    if config.shutdown_grace_seconds == 0 {
        warnings.push("shutdownGraceSeconds is 0 - in-flight sends are cancelled at shutdown".to_string());
    }

    warnings
}

fn collect_references<'a>(route: &'a RouteConfig, out: &mut HashSet<&'a str>) {
    out.extend(route.receivers.iter().map(String::as_str));
    for child in &route.routes {
        collect_references(child, out);
    }
}

fn count_routes(route: &RouteConfig) -> usize {
    1 + route.routes.iter().map(count_routes).sum::<usize>()
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("OK  Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            if let Some(ref cluster) = summary.cluster_name {
                println!("\n  Cluster: {cluster}");
            }
            println!("  Receivers: {}", summary.receiver_count);
            println!("  Sinks: {}", summary.sink_count);
            println!("  Route nodes: {}", summary.route_count);
        }

        if !result.warnings.is_empty() {
            println!("\nWarnings:");
            for warning in &result.warnings {
                println!("  - {warning}");
            }
        }
    } else {
        println!("ERR Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {error}");
        }
    }
}
