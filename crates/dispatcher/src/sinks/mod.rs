//! Sink implementations
//!
//! Contains StdoutSink, SyslogSink, and EventBridgeSink.

mod eventbridge;
mod stdout;
mod syslog;

use contracts::{Event, EventSink, SinkError};
use template::Template;

#[cfg(feature = "aws")]
pub use self::eventbridge::AwsEventBridge;
pub use self::eventbridge::{BusEntry, EventBridgeSink, EventBusPublisher};
pub use self::stdout::StdoutSink;
pub use self::syslog::{SyslogSink, format_message};

/// Serialize the event, through the layout when one is configured
pub(crate) fn encode_payload(
    sink: &str,
    layout: Option<&Template>,
    event: &Event,
) -> Result<Vec<u8>, SinkError> {
    let serialize = |source| SinkError::Serialize {
        sink: sink.to_string(),
        source,
    };

    match layout {
        Some(template) => {
            let rendered = template
                .render(event)
                .map_err(|e| SinkError::render(sink, e.to_string()))?;
            serde_json::to_vec(&rendered).map_err(serialize)
        }
        None => event.to_json().map_err(serialize),
    }
}

/// Every sink the exporter can build from configuration
pub enum SinkKind {
    Stdout(StdoutSink),
    Syslog(SyslogSink),
    #[cfg(feature = "aws")]
    EventBridge(EventBridgeSink<AwsEventBridge>),
}

impl EventSink for SinkKind {
    fn name(&self) -> &str {
        match self {
            Self::Stdout(s) => s.name(),
            Self::Syslog(s) => s.name(),
            #[cfg(feature = "aws")]
            Self::EventBridge(s) => s.name(),
        }
    }

    async fn send(&self, event: &Event) -> Result<(), SinkError> {
        match self {
            Self::Stdout(s) => s.send(event).await,
            Self::Syslog(s) => s.send(event).await,
            #[cfg(feature = "aws")]
            Self::EventBridge(s) => s.send(event).await,
        }
    }

    async fn close(&self) -> Result<(), SinkError> {
        match self {
            Self::Stdout(s) => s.close().await,
            Self::Syslog(s) => s.close().await,
            #[cfg(feature = "aws")]
            Self::EventBridge(s) => s.close().await,
        }
    }
}
