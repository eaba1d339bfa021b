//! Mock 事件源
//!
//! 用于无集群环境的测试与演示。

use std::time::Duration;

use chrono::Utc;
use contracts::{ContractError, Event, EventSource, EventType, InvolvedObject, Reporter};
use tracing::trace;

/// 轮换使用的对象类型与原因
const SAMPLES: &[(&str, &str, EventType, &str)] = &[
    ("Pod", "Pulled", EventType::Normal, "Successfully pulled image \"nginx:latest\""),
    ("Pod", "BackOff", EventType::Warning, "Back-off restarting failed container"),
    ("Deployment", "ScalingReplicaSet", EventType::Normal, "Scaled up replica set web-5d9c to 3"),
    ("Node", "NodeNotReady", EventType::Warning, "Node is not ready"),
    ("Service", "EnsuredLoadBalancer", EventType::Normal, "Ensured load balancer"),
];

/// Mock 事件源配置
#[derive(Debug, Clone)]
pub struct MockEventConfig {
    /// 生成事件数量
    pub count: u64,
    /// 事件间隔
    pub interval: Duration,
    /// 事件命名空间
    pub namespace: String,
}

impl Default for MockEventConfig {
    fn default() -> Self {
        Self {
            count: 10,
            interval: Duration::ZERO,
            namespace: "default".to_string(),
        }
    }
}

/// Mock 事件源
///
/// 生成固定数量的事件后结束。
pub struct MockEventSource {
    config: MockEventConfig,
    emitted: u64,
}

impl MockEventSource {
    /// 创建新的 Mock 事件源
    pub fn new(config: MockEventConfig) -> Self {
        Self { config, emitted: 0 }
    }

    /// 生成 `count` 个事件，无间隔
    pub fn with_count(count: u64) -> Self {
        Self::new(MockEventConfig {
            count,
            ..Default::default()
        })
    }

    fn generate(&self, seq: u64) -> Event {
        let (kind, reason, event_type, message) = SAMPLES[(seq as usize) % SAMPLES.len()];
        let object_name = format!("{}-{seq}", kind.to_lowercase());
        Event {
            name: format!("{object_name}.{seq:x}"),
            namespace: self.config.namespace.clone(),
            event_type,
            reason: reason.to_string(),
            message: message.to_string(),
            count: 1,
            involved_object: InvolvedObject {
                kind: kind.to_string(),
                name: object_name,
                namespace: self.config.namespace.clone(),
                api_version: "v1".to_string(),
                ..Default::default()
            },
            source: Reporter {
                component: "mock".to_string(),
                host: "localhost".to_string(),
            },
            first_timestamp: Utc::now(),
            last_timestamp: None,
            cluster_name: None,
        }
    }
}

impl EventSource for MockEventSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn next_event(&mut self) -> Option<Result<Event, ContractError>> {
        if self.emitted >= self.config.count {
            return None;
        }
        if self.emitted > 0 && !self.config.interval.is_zero() {
            tokio::time::sleep(self.config.interval).await;
        }

        let event = self.generate(self.emitted);
        self.emitted += 1;
        trace!(seq = self.emitted, event = %event.identity(), "Mock event generated");
        Some(Ok(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_source_emits_count_then_ends() {
        let mut source = MockEventSource::with_count(3);
        let mut kinds = Vec::new();
        while let Some(event) = source.next_event().await {
            kinds.push(event.unwrap().involved_object.kind);
        }
        assert_eq!(kinds, vec!["Pod", "Pod", "Deployment"]);
        assert!(source.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_mock_source_namespace() {
        let mut source = MockEventSource::new(MockEventConfig {
            count: 1,
            namespace: "staging".into(),
            ..Default::default()
        });
        let event = source.next_event().await.unwrap().unwrap();
        assert_eq!(event.namespace, "staging");
        assert_eq!(event.involved_object.namespace, "staging");
    }
}
