//! Event - EventSource output
//!
//! Immutable snapshot of one cluster lifecycle occurrence. Routing and
//! rendering only ever read it.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::FieldPath;

/// Event severity as reported by the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EventType {
    #[default]
    Normal,
    Warning,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Warning => "Warning",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object the event is about
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvolvedObject {
    pub kind: String,

    pub name: String,

    #[serde(default)]
    pub namespace: String,

    #[serde(default)]
    pub api_version: String,

    #[serde(default)]
    pub uid: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// Component that reported the event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reporter {
    #[serde(default)]
    pub component: String,

    #[serde(default)]
    pub host: String,
}

/// Cluster event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event object name
    #[serde(default)]
    pub name: String,

    pub namespace: String,

    #[serde(rename = "type", default)]
    pub event_type: EventType,

    #[serde(default)]
    pub reason: String,

    #[serde(default)]
    pub message: String,

    /// Occurrence count (1 for a fresh event)
    #[serde(default = "default_count")]
    pub count: i64,

    pub involved_object: InvolvedObject,

    #[serde(default)]
    pub source: Reporter,

    pub first_timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_timestamp: Option<DateTime<Utc>>,

    /// Set by the exporter when a cluster name is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
}

fn default_count() -> i64 {
    1
}

impl Event {
    /// Millisecond epoch of `firstTimestamp`
    pub fn timestamp_ms(&self) -> i64 {
        self.first_timestamp.timestamp_millis()
    }

    /// `firstTimestamp` as RFC 3339 with millisecond precision
    pub fn timestamp_iso8601(&self) -> String {
        self.first_timestamp
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Most recent observation time
    pub fn last_seen(&self) -> DateTime<Utc> {
        self.last_timestamp.unwrap_or(self.first_timestamp)
    }

    /// Short identity for logs
    pub fn identity(&self) -> String {
        format!(
            "{}/{}/{} reason={}",
            self.namespace, self.involved_object.kind, self.involved_object.name, self.reason
        )
    }

    /// JSON serialization used by sinks without a template
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Resolve a field path to its value
    ///
    /// Segments match case-insensitively; label and annotation keys match
    /// exactly. Returns `None` when the path names nothing.
    pub fn lookup(&self, path: &FieldPath) -> Option<Value> {
        let (head, rest) = path.segments().split_first()?;

        match head.to_ascii_lowercase().as_str() {
            "name" => leaf(rest, Value::from(self.name.as_str())),
            "namespace" => leaf(rest, Value::from(self.namespace.as_str())),
            "type" => leaf(rest, Value::from(self.event_type.as_str())),
            "reason" => leaf(rest, Value::from(self.reason.as_str())),
            "message" => leaf(rest, Value::from(self.message.as_str())),
            "count" => leaf(rest, Value::from(self.count)),
            "firsttimestamp" => leaf(rest, Value::from(self.timestamp_iso8601())),
            "lasttimestamp" => {
                let ts = self.last_timestamp?;
                leaf(
                    rest,
                    Value::from(ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
                )
            }
            "clustername" => leaf(rest, Value::from(self.cluster_name.as_deref()?)),
            "source" => self.source.lookup(rest),
            "involvedobject" => self.involved_object.lookup(rest),
            _ => None,
        }
    }
}

impl InvolvedObject {
    fn lookup(&self, rest: &[String]) -> Option<Value> {
        let Some((head, rest)) = rest.split_first() else {
            return serde_json::to_value(self).ok();
        };

        match head.to_ascii_lowercase().as_str() {
            "kind" => leaf(rest, Value::from(self.kind.as_str())),
            "name" => leaf(rest, Value::from(self.name.as_str())),
            "namespace" => leaf(rest, Value::from(self.namespace.as_str())),
            "apiversion" => leaf(rest, Value::from(self.api_version.as_str())),
            "uid" => leaf(rest, Value::from(self.uid.as_str())),
            "labels" => map_lookup(&self.labels, rest),
            "annotations" => map_lookup(&self.annotations, rest),
            _ => None,
        }
    }
}

impl Reporter {
    fn lookup(&self, rest: &[String]) -> Option<Value> {
        let Some((head, rest)) = rest.split_first() else {
            return serde_json::to_value(self).ok();
        };

        match head.to_ascii_lowercase().as_str() {
            "component" => leaf(rest, Value::from(self.component.as_str())),
            "host" => leaf(rest, Value::from(self.host.as_str())),
            _ => None,
        }
    }
}

fn leaf(rest: &[String], value: Value) -> Option<Value> {
    rest.is_empty().then_some(value)
}

fn map_lookup(map: &BTreeMap<String, String>, rest: &[String]) -> Option<Value> {
    match rest {
        [] => serde_json::to_value(map).ok(),
        [key] => map.get(key).map(|v| Value::from(v.as_str())),
        // Keys such as `app.kubernetes.io/name` contain dots
        _ => map.get(&rest.join(".")).map(|v| Value::from(v.as_str())),
    }
}
