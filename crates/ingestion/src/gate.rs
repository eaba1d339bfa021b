//! Admission gate applied before routing

use chrono::{DateTime, Duration, Utc};
use contracts::Event;

/// Drops stale events and stamps the cluster name
#[derive(Debug, Clone, Default)]
pub struct EventGate {
    cluster_name: Option<String>,
    max_age: Option<Duration>,
}

impl EventGate {
    pub fn new(cluster_name: Option<String>, max_age_seconds: Option<u64>) -> Self {
        Self {
            cluster_name,
            // Out-of-range ages mean no limit
            max_age: max_age_seconds
                .and_then(|secs| i64::try_from(secs).ok())
                .and_then(Duration::try_seconds),
        }
    }

    /// `None` when the event was last seen longer ago than the max age
    pub fn admit(&self, mut event: Event, now: DateTime<Utc>) -> Option<Event> {
        if let Some(max_age) = self.max_age {
            if now.signed_duration_since(event.last_seen()) > max_age {
                return None;
            }
        }
        if let Some(cluster) = &self.cluster_name {
            event.cluster_name = Some(cluster.clone());
        }
        Some(event)
    }
}
