//! EventBridgeSink - one bus entry per event

use std::future::Future;

use chrono::{DateTime, Utc};
use contracts::{Event, EventBridgeConfig, EventSink, SinkError};
use template::Template;
use tracing::{debug, instrument};

use super::encode_payload;

/// Entry handed to the event bus
#[derive(Debug, Clone, PartialEq)]
pub struct BusEntry {
    pub detail_type: String,
    /// JSON document
    pub detail: String,
    pub source: String,
    pub event_bus_name: String,
    pub time: DateTime<Utc>,
}

/// Event bus client seam
///
/// `Err` carries a readable reason; a partial rejection of the entry is an
/// error too.
pub trait EventBusPublisher: Send + Sync {
    fn put_event(&self, entry: BusEntry) -> impl Future<Output = Result<(), String>> + Send;
}

/// Sink that publishes events to a managed event bus
pub struct EventBridgeSink<P> {
    name: String,
    config: EventBridgeConfig,
    detail: Option<Template>,
    publisher: P,
}

impl<P: EventBusPublisher> EventBridgeSink<P> {
    pub fn new(
        name: impl Into<String>,
        config: EventBridgeConfig,
        detail: Option<Template>,
        publisher: P,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            detail,
            publisher,
        }
    }

    fn entry(&self, event: &Event) -> Result<BusEntry, SinkError> {
        let payload = encode_payload(&self.name, self.detail.as_ref(), event)?;
        Ok(BusEntry {
            detail_type: self.config.detail_type.clone(),
            detail: String::from_utf8_lossy(&payload).into_owned(),
            source: self.config.source.clone(),
            event_bus_name: self.config.event_bus_name.clone(),
            time: Utc::now(),
        })
    }
}

impl<P: EventBusPublisher> EventSink for EventBridgeSink<P> {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "eventbridge_sink_send",
        skip(self, event),
        fields(sink = %self.name, bus = %self.config.event_bus_name)
    )]
    async fn send(&self, event: &Event) -> Result<(), SinkError> {
        let entry = self.entry(event)?;
        debug!(detail_type = %entry.detail_type, source = %entry.source, "Publishing entry");
        self.publisher
            .put_event(entry)
            .await
            .map_err(|message| SinkError::delivery(&self.name, message))
    }

    async fn close(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

#[cfg(feature = "aws")]
mod aws {
    use aws_config::BehaviorVersion;
    use aws_sdk_eventbridge::config::Region;
    use aws_sdk_eventbridge::error::DisplayErrorContext;
    use aws_sdk_eventbridge::primitives::DateTime as AwsDateTime;
    use aws_sdk_eventbridge::types::PutEventsRequestEntry;
    use aws_sdk_eventbridge::Client;
    use tracing::info;

    use super::{BusEntry, EventBusPublisher};

    /// AWS EventBridge client
    #[derive(Debug, Clone)]
    pub struct AwsEventBridge {
        client: Client,
    }

    impl AwsEventBridge {
        /// Load credentials from the default provider chain for `region`
        pub async fn connect(region: &str) -> Self {
            let sdk_config = aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(region.to_string()))
                .load()
                .await;
            info!(region, "EventBridge client initialized");
            Self {
                client: Client::new(&sdk_config),
            }
        }
    }

    impl EventBusPublisher for AwsEventBridge {
        async fn put_event(&self, entry: BusEntry) -> Result<(), String> {
            let request = PutEventsRequestEntry::builder()
                .detail_type(entry.detail_type)
                .detail(entry.detail)
                .source(entry.source)
                .event_bus_name(entry.event_bus_name)
                .time(AwsDateTime::from_millis(entry.time.timestamp_millis()))
                .build();

            let output = self
                .client
                .put_events()
                .entries(request)
                .send()
                .await
                .map_err(|e| DisplayErrorContext(e).to_string())?;

            if output.failed_entry_count() > 0 {
                let reason = output
                    .entries()
                    .iter()
                    .find_map(|e| e.error_message().or(e.error_code()))
                    .unwrap_or("entry rejected");
                return Err(format!("event bus rejected entry: {reason}"));
            }
            Ok(())
        }
    }
}

#[cfg(feature = "aws")]
pub use aws::AwsEventBridge;
