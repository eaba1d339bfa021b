//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Event Exporter - route cluster events to log collectors and event buses
#[derive(Parser, Debug)]
#[command(
    name = "event-exporter",
    author,
    version,
    about = "Cluster event routing and export",
    long_about = "Routes cluster lifecycle events to external destinations.\n\n\
                  Reads events from a source, evaluates the configured route tree, \n\
                  and delivers each event to every matching receiver's sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "EVENT_EXPORTER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "json",
        global = true,
        env = "EVENT_EXPORTER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the exporter
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (YAML, TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.yaml",
        env = "EVENT_EXPORTER_CONFIG"
    )]
    pub config: PathBuf,

    /// NDJSON event input, `-` for stdin
    #[arg(short, long, default_value = "-", env = "EVENT_EXPORTER_INPUT")]
    pub input: PathBuf,

    /// Generate N mock events instead of reading input
    #[arg(long, conflicts_with = "input")]
    pub mock: Option<u64>,

    /// Delay between mock events in milliseconds
    #[arg(long, default_value = "0", requires = "mock")]
    pub mock_interval_ms: u64,

    /// Override the cluster name from configuration
    #[arg(long, env = "EVENT_EXPORTER_CLUSTER_NAME")]
    pub cluster_name: Option<String>,

    /// Channel buffer size between source and router
    #[arg(long, default_value = "256", env = "EVENT_EXPORTER_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "2112", env = "EVENT_EXPORTER_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the route tree
    #[arg(long)]
    pub routes: bool,

    /// Show sink configuration of every receiver
    #[arg(long)]
    pub sinks: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    #[default]
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_mock() {
        let cli = Cli::try_parse_from([
            "event-exporter",
            "-v",
            "run",
            "-c",
            "exporter.yaml",
            "--mock",
            "5",
            "--metrics-port",
            "0",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.mock, Some(5));
        assert_eq!(args.metrics_port, 0);
        assert_eq!(args.config, PathBuf::from("exporter.yaml"));
    }

    #[test]
    fn test_mock_conflicts_with_input() {
        let result = Cli::try_parse_from([
            "event-exporter",
            "run",
            "--input",
            "events.ndjson",
            "--mock",
            "5",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["event-exporter", "-q", "-v", "validate"]).is_err());
    }
}
