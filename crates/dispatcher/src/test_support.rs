//! Shared fixtures for unit tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use contracts::{Event, EventSink, EventType, InvolvedObject, Reporter, SinkError};

pub fn sample_event() -> Event {
    Event {
        name: "nginx.17a".into(),
        namespace: "default".into(),
        event_type: EventType::Warning,
        reason: "Pulled".into(),
        message: "Successfully pulled image \"nginx:latest\"".into(),
        count: 1,
        involved_object: InvolvedObject {
            kind: "Pod".into(),
            name: "nginx-server-123abc-456def".into(),
            namespace: "default".into(),
            ..Default::default()
        },
        source: Reporter {
            component: "kubelet".into(),
            host: "node-1".into(),
        },
        first_timestamp: Utc.timestamp_millis_opt(1_699_999_999_000).unwrap(),
        last_timestamp: None,
        cluster_name: None,
    }
}

/// Sink that counts calls and can fail or stall on demand
pub struct MockSink {
    name: String,
    delay: Option<Duration>,
    fail: bool,
    pub sent: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
}

impl MockSink {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            delay: None,
            fail: false,
            sent: Arc::default(),
            closed: Arc::default(),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(name)
        }
    }

    pub fn delayed(name: &str, millis: u64) -> Self {
        Self {
            delay: Some(Duration::from_millis(millis)),
            ..Self::new(name)
        }
    }
}

impl EventSink for MockSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, _event: &Event) -> Result<(), SinkError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(SinkError::delivery(&self.name, "mock failure"));
        }
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), SinkError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
