//! ExporterConfig - Config Loader output
//!
//! Describes the full exporter: routing tree, receivers and their sinks,
//! plus runtime knobs.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::TemplateValue;

/// Complete exporter configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExporterConfig {
    /// Stamped onto every event when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,

    /// Events last seen longer ago than this are discarded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_event_age_seconds: Option<u64>,

    /// Prefix for every exported metric name
    #[serde(default = "default_metrics_prefix")]
    pub metrics_name_prefix: String,

    /// Per-sink delivery timeout
    #[serde(default = "default_send_timeout")]
    #[validate(range(min = 1))]
    pub send_timeout_seconds: u64,

    /// How long `close` waits for in-flight sends
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,

    /// Root of the routing tree
    #[validate(nested)]
    pub route: RouteConfig,

    /// Named receivers
    #[validate(nested)]
    pub receivers: Vec<ReceiverConfig>,
}

fn default_metrics_prefix() -> String {
    "event_exporter_".to_string()
}

fn default_send_timeout() -> u64 {
    10
}

fn default_shutdown_grace() -> u64 {
    5
}

/// One node of the routing tree
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RouteConfig {
    /// All must hold for the node to match; empty matches everything
    #[serde(rename = "match", default, skip_serializing_if = "Vec::is_empty")]
    #[validate(nested)]
    pub matches: Vec<PredicateConfig>,

    /// Any one holding stops this node and its subtree
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[validate(nested)]
    pub drop: Vec<PredicateConfig>,

    /// Receivers this node dispatches to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub receivers: Vec<String>,

    /// Child nodes, evaluated in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[validate(nested)]
    pub routes: Vec<RouteConfig>,
}

/// Field predicate: exact `value` or regex `pattern`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PredicateConfig {
    #[validate(length(min = 1))]
    pub field: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Logical receiver bound to one or more sinks
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReceiverConfig {
    #[validate(length(min = 1))]
    pub name: String,

    #[validate(length(min = 1))]
    pub sinks: Vec<SinkConfig>,
}

/// Destination variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    /// JSON lines on standard output
    Stdout(StdoutConfig),
    /// Syslog collector over the network
    Syslog(SyslogConfig),
    /// Managed event bus
    #[serde(rename = "eventbridge")]
    EventBridge(EventBridgeConfig),
}

impl SinkConfig {
    /// Discriminator as written in configuration
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Stdout(_) => "stdout",
            Self::Syslog(_) => "syslog",
            Self::EventBridge(_) => "eventbridge",
        }
    }

    /// Payload template, if the sink has one
    pub fn layout(&self) -> Option<&TemplateValue> {
        match self {
            Self::Stdout(c) => c.layout.as_ref(),
            Self::Syslog(c) => c.layout.as_ref(),
            Self::EventBridge(c) => c.detail.as_ref(),
        }
    }
}

/// Stdout sink configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StdoutConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<TemplateValue>,
}

/// Syslog transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyslogNetwork {
    Udp,
    Tcp,
    Unixgram,
}

/// Syslog severity (facility is fixed to local0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyslogSeverity {
    Emerg,
    Alert,
    Crit,
    Err,
    Warning,
    Notice,
    #[default]
    Info,
    Debug,
}

impl SyslogSeverity {
    /// Numeric severity code
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Syslog sink configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SyslogConfig {
    pub network: SyslogNetwork,

    /// `host:port`, or a socket path for `unixgram`
    #[validate(length(min = 1))]
    pub address: String,

    #[validate(length(min = 1))]
    pub tag: String,

    #[serde(default)]
    pub severity: SyslogSeverity,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<TemplateValue>,
}

/// EventBridge sink configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EventBridgeConfig {
    #[validate(length(min = 1))]
    pub detail_type: String,

    /// Detail layout; the raw event JSON is sent when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<TemplateValue>,

    #[validate(length(min = 1))]
    pub source: String,

    #[validate(length(min = 1))]
    pub event_bus_name: String,

    #[validate(length(min = 1))]
    pub region: String,
}
