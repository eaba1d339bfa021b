//! Receiver construction from configuration

use std::sync::Arc;
use std::time::Duration;

use contracts::{EventSink, ReceiverConfig, SinkConfig};
use observability::MetricsStore;
use template::Template;
use tracing::{info, instrument, warn};

use crate::error::DispatcherError;
use crate::registry::ReceiverRegistry;
#[cfg(feature = "aws")]
use crate::sinks::{AwsEventBridge, EventBridgeSink};
use crate::sinks::{SinkKind, StdoutSink, SyslogSink};

/// Registry timing knobs
#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    /// Per-delivery timeout, also the bound on dialling a collector
    pub send_timeout: Duration,
    /// Bound on draining and closing during shutdown
    pub shutdown_grace: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// Create one sink from configuration
#[instrument(
    name = "dispatcher_build_sink",
    skip(config),
    fields(sink_type = config.kind())
)]
pub async fn build_sink(
    receiver: &str,
    index: usize,
    config: &SinkConfig,
    dial_timeout: Duration,
) -> Result<SinkKind, DispatcherError> {
    let name = format!("{}[{index}]", config.kind());
    let layout_location = format!("receivers.{receiver}.sinks[{index}]");
    let layout = config
        .layout()
        .map(|layout| Template::compile(layout, &layout_location))
        .transpose()?;

    match config {
        SinkConfig::Stdout(_) => Ok(SinkKind::Stdout(StdoutSink::new(name, layout))),
        SinkConfig::Syslog(syslog) => {
            SyslogSink::connect(name, syslog.clone(), layout, dial_timeout)
                .await
                .map(SinkKind::Syslog)
                .map_err(|e| DispatcherError::sink_creation(receiver, "syslog", e.to_string()))
        }
        #[cfg(feature = "aws")]
        SinkConfig::EventBridge(bus) => {
            let publisher = AwsEventBridge::connect(&bus.region).await;
            Ok(SinkKind::EventBridge(EventBridgeSink::new(
                name,
                bus.clone(),
                layout,
                publisher,
            )))
        }
        #[cfg(not(feature = "aws"))]
        SinkConfig::EventBridge(_) => Err(DispatcherError::sink_creation(
            receiver,
            "eventbridge",
            "built without the 'aws' feature",
        )),
    }
}

/// Build every receiver's sinks and register them
///
/// On failure, sinks built so far are closed before the error is returned.
#[instrument(
    name = "dispatcher_build_registry",
    skip(receivers, metrics),
    fields(receiver_count = receivers.len())
)]
pub async fn build_registry(
    receivers: &[ReceiverConfig],
    metrics: Arc<MetricsStore>,
    config: DispatcherConfig,
) -> Result<ReceiverRegistry, DispatcherError> {
    let mut registry = ReceiverRegistry::new(metrics, config.send_timeout);

    if let Err(e) = register_receivers(&mut registry, receivers, config.send_timeout).await {
        registry.close(config.shutdown_grace).await;
        return Err(e);
    }

    info!(receivers = receivers.len(), "Receiver registry ready");
    Ok(registry)
}

async fn register_receivers(
    registry: &mut ReceiverRegistry,
    receivers: &[ReceiverConfig],
    dial_timeout: Duration,
) -> Result<(), DispatcherError> {
    for receiver in receivers {
        if registry.contains(&receiver.name) {
            return Err(DispatcherError::DuplicateReceiver {
                name: receiver.name.clone(),
            });
        }

        let mut sinks = Vec::with_capacity(receiver.sinks.len());
        for (index, sink_config) in receiver.sinks.iter().enumerate() {
            match build_sink(&receiver.name, index, sink_config, dial_timeout).await {
                Ok(sink) => sinks.push(sink),
                Err(e) => {
                    // Already-built sinks of this receiver are not registered yet
                    close_unregistered(sinks).await;
                    return Err(e);
                }
            }
        }
        registry.register_all(receiver.name.clone(), sinks)?;
    }
    Ok(())
}

async fn close_unregistered(sinks: Vec<SinkKind>) {
    for sink in sinks {
        if let Err(e) = sink.close().await {
            warn!(sink = %sink.name(), error = %e, "Close failed during rollback");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ContractError;

    fn receivers(yaml: &str) -> Vec<ReceiverConfig> {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn metrics() -> Arc<MetricsStore> {
        Arc::new(MetricsStore::new("dispatcher_test_"))
    }

    #[tokio::test]
    async fn test_build_stdout_registry() {
        let registry = build_registry(
            &receivers(
                r#"
- name: dump
  sinks:
    - type: stdout
- name: both
  sinks:
    - type: stdout
      layout: {msg: "{{ .Message }}"}
    - type: stdout
"#,
            ),
            metrics(),
            DispatcherConfig::default(),
        )
        .await
        .unwrap();

        let mut names: Vec<_> = registry.names().collect();
        names.sort();
        assert_eq!(names, vec!["both", "dump"]);
        assert_eq!(registry.sink_metrics().len(), 3);
        registry.close(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_build_duplicate_receiver() {
        let err = build_registry(
            &receivers(
                r#"
- name: a
  sinks: [{type: stdout}]
- name: a
  sinks: [{type: stdout}]
"#,
            ),
            metrics(),
            DispatcherConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            ContractError::from(err),
            ContractError::DuplicateReceiver { .. }
        ));
    }

    #[tokio::test]
    async fn test_build_bad_layout() {
        let err = build_registry(
            &receivers(
                r#"
- name: a
  sinks:
    - type: stdout
      layout: {msg: "{{ .Message"}
"#,
            ),
            metrics(),
            DispatcherConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("receivers.a.sinks[0].msg"), "got: {err}");
    }

    #[tokio::test]
    async fn test_build_unreachable_syslog() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = build_registry(
            &receivers(&format!(
                r#"
- name: ok
  sinks: [{{type: stdout}}]
- name: logs
  sinks:
    - type: syslog
      network: tcp
      address: "{addr}"
      tag: k8s
"#
            )),
            metrics(),
            DispatcherConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DispatcherError::SinkCreation { ref sink, .. } if sink == "syslog"));
    }
}
