//! Shared fixtures for unit tests

use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use contracts::{Event, EventSink, EventType, InvolvedObject, Reporter, SinkError};

pub fn event(kind: &str, namespace: &str) -> Event {
    Event {
        name: format!("{kind}.17a").to_lowercase(),
        namespace: namespace.into(),
        event_type: EventType::Warning,
        reason: "BackOff".into(),
        message: "Back-off restarting failed container".into(),
        count: 1,
        involved_object: InvolvedObject {
            kind: kind.into(),
            name: "web-0".into(),
            namespace: namespace.into(),
            ..Default::default()
        },
        source: Reporter::default(),
        first_timestamp: Utc.timestamp_millis_opt(1_699_999_999_000).unwrap(),
        last_timestamp: None,
        cluster_name: None,
    }
}

/// Sinks sharing one log of which receiver got an event
#[derive(Clone, Default)]
pub struct RecordingSink {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    /// Sink writing into the same log under `name`
    pub fn named(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            log: Arc::clone(&self.log),
        }
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.lock().unwrap())
    }
}

impl EventSink for RecordingSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, _event: &Event) -> Result<(), SinkError> {
        self.log.lock().unwrap().push(self.name.clone());
        Ok(())
    }

    async fn close(&self) -> Result<(), SinkError> {
        Ok(())
    }
}
