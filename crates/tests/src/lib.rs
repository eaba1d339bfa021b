//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置 → 注册表 → 路由的端到端验证（syslog UDP 回环）
//! - 模板渲染的实际载荷
//! - 关闭语义

#[cfg(test)]
mod contract_tests {
    use contracts::{Event, FieldPath};

    #[test]
    fn test_event_wire_format() {
        let raw = r#"{
            "metadata": {"ignored": true},
            "name": "web-0.17a",
            "namespace": "default",
            "type": "Warning",
            "reason": "BackOff",
            "message": "Back-off restarting failed container",
            "count": 3,
            "involvedObject": {"kind": "Pod", "name": "web-0", "labels": {"app.kubernetes.io/name": "web"}},
            "firstTimestamp": "2024-03-01T12:00:00Z",
            "lastTimestamp": "2024-03-01T12:05:00Z"
        }"#;
        let event: Event = serde_json::from_str(raw).unwrap();
        assert_eq!(event.count, 3);
        assert_eq!(event.identity(), "default/Pod/web-0 reason=BackOff");

        let label = FieldPath::parse("involvedObject.labels.app.kubernetes.io/name").unwrap();
        assert_eq!(event.lookup(&label), Some(serde_json::json!("web")));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{Event, EventType, ExporterConfig, InvolvedObject, Reporter};
    use dispatcher::{build_registry, DispatcherConfig, ReceiverRegistry};
    use ingestion::{EventGate, IngestionPipeline, JsonLinesSource};
    use observability::MetricsStore;
    use router::Router;
    use tokio::net::UdpSocket;
    use tokio_util::sync::CancellationToken;

    /// Local syslog collector
    struct Collector {
        socket: UdpSocket,
    }

    impl Collector {
        async fn bind() -> Self {
            Self {
                socket: UdpSocket::bind("127.0.0.1:0").await.unwrap(),
            }
        }

        fn address(&self) -> String {
            self.socket.local_addr().unwrap().to_string()
        }

        /// Payload of the next datagram, header stripped
        async fn recv(&self) -> Option<String> {
            let mut buf = vec![0u8; 64 * 1024];
            let read = tokio::time::timeout(Duration::from_millis(500), self.socket.recv(&mut buf));
            let len = read.await.ok()?.unwrap();
            let line = String::from_utf8(buf[..len].to_vec()).unwrap();
            let (_, payload) = line.split_once("]: ").unwrap();
            Some(payload.trim_end().to_string())
        }
    }

    fn event(kind: &str, namespace: &str, reason: &str) -> Event {
        Event {
            name: format!("{}.17a", kind.to_lowercase()),
            namespace: namespace.into(),
            event_type: EventType::Warning,
            reason: reason.into(),
            message: "Successfully pulled image \"nginx:1.25\"".into(),
            count: 1,
            involved_object: InvolvedObject {
                kind: kind.into(),
                name: "nginx-server-123abc-456def".into(),
                namespace: namespace.into(),
                ..Default::default()
            },
            source: Reporter::default(),
            first_timestamp: Utc.timestamp_millis_opt(1_699_999_999_000).unwrap(),
            last_timestamp: None,
            cluster_name: None,
        }
    }

    fn load(yaml: &str) -> ExporterConfig {
        ConfigLoader::load_from_str(yaml, ConfigFormat::Yaml).unwrap()
    }

    async fn arm(config: &ExporterConfig, prefix: &str) -> (Router, Arc<ReceiverRegistry>, Arc<MetricsStore>) {
        let store = Arc::new(MetricsStore::new(prefix));
        let dispatcher_config = DispatcherConfig {
            send_timeout: Duration::from_secs(2),
            shutdown_grace: Duration::from_millis(200),
        };
        let registry = Arc::new(
            build_registry(&config.receivers, Arc::clone(&store), dispatcher_config)
                .await
                .unwrap(),
        );
        let router = Router::new(&config.route, Arc::clone(&registry), Arc::clone(&store)).unwrap();
        (router, registry, store)
    }

    /// Root sends to r1, the Pod child adds r2
    #[tokio::test]
    async fn test_e2e_route_tree_fan_out() {
        let r1 = Collector::bind().await;
        let r2 = Collector::bind().await;
        let config = load(&format!(
            r#"
route:
  receivers: [r1]
  drop: [{{field: namespace, value: kube-system}}]
  routes:
    - match: [{{field: involvedObject.kind, value: Pod}}]
      receivers: [r2]
receivers:
  - name: r1
    sinks: [{{type: syslog, network: udp, address: "{}", tag: r1, layout: "{{{{ .Reason }}}}"}}]
  - name: r2
    sinks: [{{type: syslog, network: udp, address: "{}", tag: r2, layout: "{{{{ .Reason }}}}"}}]
"#,
            r1.address(),
            r2.address()
        ));
        let (router, registry, store) = arm(&config, "e2e_fan_out_").await;

        let outcome = router.process_event(Arc::new(event("Pod", "default", "Pulled"))).await;
        assert_eq!((outcome.receivers, outcome.delivered), (2, 2));
        assert_eq!(r1.recv().await.as_deref(), Some(r#""Pulled""#));
        assert_eq!(r2.recv().await.as_deref(), Some(r#""Pulled""#));

        let outcome = router.process_event(Arc::new(event("Node", "default", "NodeNotReady"))).await;
        assert_eq!(outcome.receivers, 1);
        assert_eq!(r1.recv().await.as_deref(), Some(r#""NodeNotReady""#));
        assert!(r2.recv().await.is_none());

        let outcome = router.process_event(Arc::new(event("Pod", "kube-system", "Pulled"))).await;
        assert_eq!(outcome.receivers, 0);
        assert!(r1.recv().await.is_none());

        let snapshot = store.snapshot();
        assert_eq!(snapshot.events_sent, 3);
        assert_eq!(snapshot.events_discarded, 1);

        registry.close(Duration::from_millis(200)).await;
    }

    /// Structured layout rendered into the syslog payload
    #[tokio::test]
    async fn test_e2e_structured_layout() {
        let collector = Collector::bind().await;
        let config = load(&format!(
            r#"
route:
  receivers: [collector]
receivers:
  - name: collector
    sinks:
      - type: syslog
        network: udp
        address: "{}"
        tag: k8s
        layout:
          message: "{{{{ .Message }}}}"
          kind: "{{{{ .InvolvedObject.Kind }}}}"
          name: "{{{{ .InvolvedObject.Name }}}}"
          createdAt: "{{{{ .GetTimestampMs }}}}"
          tags: [sre, ops]
"#,
            collector.address()
        ));
        let (router, registry, _) = arm(&config, "e2e_layout_").await;

        router.process_event(Arc::new(event("Pod", "default", "Pulled"))).await;
        let payload = collector.recv().await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&payload).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "message": "Successfully pulled image \"nginx:1.25\"",
                "kind": "Pod",
                "name": "nginx-server-123abc-456def",
                "createdAt": 1_699_999_999_000_i64,
                "tags": ["sre", "ops"]
            })
        );

        registry.close(Duration::from_millis(200)).await;
    }

    /// Raw event JSON when no layout is configured
    #[tokio::test]
    async fn test_e2e_raw_event_payload() {
        let collector = Collector::bind().await;
        let config = load(&format!(
            r#"
route:
  receivers: [collector]
receivers:
  - name: collector
    sinks: [{{type: syslog, network: udp, address: "{}", tag: k8s}}]
"#,
            collector.address()
        ));
        let (router, registry, _) = arm(&config, "e2e_raw_").await;

        router.process_event(Arc::new(event("Pod", "default", "Pulled"))).await;
        let payload = collector.recv().await.unwrap();
        let decoded: Event = serde_json::from_str(&payload).unwrap();
        assert_eq!(decoded, event("Pod", "default", "Pulled"));

        registry.close(Duration::from_millis(200)).await;
    }

    /// Render failure on one sink leaves the other delivering
    #[tokio::test]
    async fn test_e2e_render_error_isolated() {
        let good = Collector::bind().await;
        let bad = Collector::bind().await;
        let config = load(&format!(
            r#"
route:
  receivers: [both]
receivers:
  - name: both
    sinks:
      - {{type: syslog, network: udp, address: "{}", tag: good}}
      - {{type: syslog, network: udp, address: "{}", tag: bad, layout: "{{{{ .InvolvedObject.Labels.team }}}}"}}
"#,
            good.address(),
            bad.address()
        ));
        let (router, registry, store) = arm(&config, "e2e_render_").await;

        let outcome = router.process_event(Arc::new(event("Pod", "default", "Pulled"))).await;
        assert_eq!((outcome.delivered, outcome.failed), (1, 1));
        assert!(good.recv().await.is_some());
        assert!(bad.recv().await.is_none());
        assert_eq!(store.snapshot().render_errors, 1);

        registry.close(Duration::from_millis(200)).await;
    }

    /// Nothing is delivered once the registry is closed
    #[tokio::test]
    async fn test_e2e_send_after_close_is_discard() {
        let collector = Collector::bind().await;
        let config = load(&format!(
            r#"
route:
  receivers: [collector]
receivers:
  - name: collector
    sinks: [{{type: syslog, network: udp, address: "{}", tag: k8s}}]
"#,
            collector.address()
        ));
        let (router, registry, store) = arm(&config, "e2e_close_").await;

        registry.close(Duration::from_millis(200)).await;
        registry.close(Duration::from_millis(200)).await;

        let outcome = router.process_event(Arc::new(event("Pod", "default", "Pulled"))).await;
        assert_eq!(outcome.delivered, 0);
        assert!(collector.recv().await.is_none());
        assert_eq!(store.snapshot().events_sent, 0);
    }

    /// NDJSON source through the gate into the router
    #[tokio::test]
    async fn test_e2e_ingestion_to_router() {
        let collector = Collector::bind().await;
        let config = load(&format!(
            r#"
clusterName: prod-eu
route:
  receivers: [collector]
receivers:
  - name: collector
    sinks: [{{type: syslog, network: udp, address: "{}", tag: k8s, layout: "{{{{ .ClusterName }}}}/{{{{ .InvolvedObject.Name }}}}"}}]
"#,
            collector.address()
        ));
        let (router, registry, store) = arm(&config, "e2e_ingest_").await;

        let lines = [
            r#"{"namespace":"default","reason":"Pulled","involvedObject":{"kind":"Pod","name":"a"},"firstTimestamp":"2024-03-01T12:00:00Z"}"#,
            "{broken",
            r#"{"namespace":"default","reason":"Pulled","involvedObject":{"kind":"Pod","name":"b"},"firstTimestamp":"2024-03-01T12:00:01Z"}"#,
        ];
        let source = JsonLinesSource::new(
            "fixture",
            std::io::Cursor::new(format!("{}\n", lines.join("\n")).into_bytes()),
        );
        let gate = EventGate::new(config.cluster_name.clone(), None);
        let pipeline = IngestionPipeline::new(gate, Arc::clone(&store), 4);
        let (mut rx, handle) = pipeline.spawn(source, CancellationToken::new());

        while let Some(event) = rx.recv().await {
            router.process_event(event).await;
        }
        assert_eq!(handle.await.unwrap().admitted, 2);

        assert_eq!(collector.recv().await.as_deref(), Some(r#""prod-eu/a""#));
        assert_eq!(collector.recv().await.as_deref(), Some(r#""prod-eu/b""#));
        assert_eq!(store.snapshot().watch_errors, 1);

        registry.close(Duration::from_millis(200)).await;
    }
}
