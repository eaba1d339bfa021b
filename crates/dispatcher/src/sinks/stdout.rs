//! StdoutSink - one JSON line per event

use contracts::{Event, EventSink, SinkError};
use template::Template;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use super::encode_payload;

type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Sink that writes newline-delimited JSON to standard output
pub struct StdoutSink {
    name: String,
    layout: Option<Template>,
    writer: Mutex<Option<Writer>>,
}

impl StdoutSink {
    /// Create a sink writing to the process stdout
    pub fn new(name: impl Into<String>, layout: Option<Template>) -> Self {
        Self::with_writer(name, layout, tokio::io::stdout())
    }

    /// Create a sink writing to any async writer
    pub fn with_writer(
        name: impl Into<String>,
        layout: Option<Template>,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            layout,
            writer: Mutex::new(Some(Box::new(writer))),
        }
    }
}

impl EventSink for StdoutSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "stdout_sink_send",
        skip(self, event),
        fields(sink = %self.name)
    )]
    async fn send(&self, event: &Event) -> Result<(), SinkError> {
        let mut line = encode_payload(&self.name, self.layout.as_ref(), event)?;
        line.push(b'\n');

        // Whole line under one lock so concurrent sends never interleave
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or_else(|| SinkError::Closed {
            sink: self.name.clone(),
        })?;
        writer
            .write_all(&line)
            .await
            .map_err(|e| SinkError::delivery(&self.name, e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| SinkError::delivery(&self.name, e.to_string()))
    }

    #[instrument(name = "stdout_sink_close", skip(self))]
    async fn close(&self) -> Result<(), SinkError> {
        let Some(mut writer) = self.writer.lock().await.take() else {
            return Ok(());
        };
        writer
            .flush()
            .await
            .map_err(|e| SinkError::delivery(&self.name, e.to_string()))?;
        debug!(sink = %self.name, "StdoutSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_event;
    use contracts::TemplateValue;
    use tokio::io::{AsyncBufReadExt, BufReader};

    #[tokio::test]
    async fn test_stdout_sink_writes_lines() {
        let (writer, reader) = tokio::io::duplex(64 * 1024);
        let sink = StdoutSink::with_writer("stdout[0]", None, writer);

        sink.send(&sample_event()).await.unwrap();
        sink.send(&sample_event()).await.unwrap();
        sink.close().await.unwrap();

        let mut lines = BufReader::new(reader).lines();
        let first = lines.next_line().await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&first).unwrap();
        assert_eq!(value["namespace"], "default");
        assert!(lines.next_line().await.unwrap().is_some());
        assert!(lines.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stdout_sink_layout() {
        let layout: TemplateValue =
            serde_yaml::from_str("{ns: '{{ .Namespace }}', at: '{{ .GetTimestampMs }}'}").unwrap();
        let layout = Template::compile(&layout, "layout").unwrap();
        let (writer, reader) = tokio::io::duplex(64 * 1024);
        let sink = StdoutSink::with_writer("stdout[0]", Some(layout), writer);

        let event = sample_event();
        sink.send(&event).await.unwrap();
        sink.close().await.unwrap();

        let line = BufReader::new(reader).lines().next_line().await.unwrap().unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&line).unwrap(),
            serde_json::json!({"ns": "default", "at": event.timestamp_ms()})
        );
    }

    #[tokio::test]
    async fn test_send_after_close() {
        let (writer, _reader) = tokio::io::duplex(1024);
        let sink = StdoutSink::with_writer("stdout[0]", None, writer);
        sink.close().await.unwrap();
        sink.close().await.unwrap();

        let err = sink.send(&sample_event()).await.unwrap_err();
        assert!(matches!(err, SinkError::Closed { .. }));
    }
}
