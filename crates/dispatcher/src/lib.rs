//! # Dispatcher
//!
//! 事件分发模块。
//!
//! 负责：
//! - 按配置构建 receivers 及其 sinks
//! - Fan-out 到 receiver 的全部 sinks，失败互不影响
//! - 关闭屏障：宽限期内等待在途发送，超时后取消

pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod sinks;

#[cfg(test)]
mod test_support;

pub use contracts::{Event, EventSink};
pub use dispatcher::{DispatcherConfig, build_registry, build_sink};
pub use error::DispatcherError;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use registry::{ReceiverRegistry, SendOutcome};
pub use sinks::{
    BusEntry, EventBridgeSink, EventBusPublisher, SinkKind, StdoutSink, SyslogSink,
};
