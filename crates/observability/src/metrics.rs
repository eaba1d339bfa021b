//! 导出器指标存储
//!
//! `MetricsStore` 由启动流程创建一次，以 `Arc` 传入 Router 与 ReceiverRegistry。
//! 每个计数器同时保存在本地原子变量（用于快照与测试）并镜像到 `metrics` facade。

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::{counter, describe_counter, gauge, Counter};

/// 单个计数器：本地值 + 导出句柄
struct Tracked {
    local: AtomicU64,
    exported: Counter,
}

impl Tracked {
    fn new(name: String, help: &'static str) -> Self {
        describe_counter!(name.clone(), help);
        Self {
            local: AtomicU64::new(0),
            exported: counter!(name),
        }
    }

    fn increment(&self) {
        self.local.fetch_add(1, Ordering::Relaxed);
        self.exported.increment(1);
    }

    fn get(&self) -> u64 {
        self.local.load(Ordering::Relaxed)
    }
}

/// 导出器计数器集合
///
/// 在安装 Prometheus recorder 之后创建，否则导出句柄为 no-op。
pub struct MetricsStore {
    prefix: String,
    events_sent: Tracked,
    events_discarded: Tracked,
    watch_errors: Tracked,
    send_errors: Tracked,
    route_errors: Tracked,
    render_errors: Tracked,
}

impl MetricsStore {
    /// 创建指标存储，所有名称带 `prefix` 前缀
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let name = |suffix: &str| format!("{prefix}{suffix}");

        gauge!(name("build_info"), "version" => env!("CARGO_PKG_VERSION")).set(1.0);

        Self {
            events_sent: Tracked::new(
                name("events_sent"),
                "The total number of events delivered to a sink",
            ),
            events_discarded: Tracked::new(
                name("events_discarded"),
                "The total number of events discarded: too old, unrouted, or routed to a receiver without sinks",
            ),
            watch_errors: Tracked::new(
                name("watch_errors"),
                "The total number of errors received from the event source",
            ),
            send_errors: Tracked::new(
                name("send_event_errors"),
                "The total number of send event errors",
            ),
            route_errors: Tracked::new(
                name("route_errors"),
                "The total number of route predicates that could not be evaluated",
            ),
            render_errors: Tracked::new(
                name("render_errors"),
                "The total number of payload templates that failed to render",
            ),
            prefix,
        }
    }

    /// 指标名前缀
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn inc_events_sent(&self) {
        self.events_sent.increment();
    }

    pub fn inc_events_discarded(&self) {
        self.events_discarded.increment();
    }

    pub fn inc_watch_errors(&self) {
        self.watch_errors.increment();
    }

    pub fn inc_send_errors(&self) {
        self.send_errors.increment();
    }

    pub fn inc_route_errors(&self) {
        self.route_errors.increment();
    }

    pub fn inc_render_errors(&self) {
        self.render_errors.increment();
    }

    /// 当前计数快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_sent: self.events_sent.get(),
            events_discarded: self.events_discarded.get(),
            watch_errors: self.watch_errors.get(),
            send_errors: self.send_errors.get(),
            route_errors: self.route_errors.get(),
            render_errors: self.render_errors.get(),
        }
    }

    /// 结束生命周期，返回最终快照
    pub fn destroy(self) -> MetricsSnapshot {
        gauge!(format!("{}build_info", self.prefix), "version" => env!("CARGO_PKG_VERSION"))
            .set(0.0);
        let snapshot = self.snapshot();
        tracing::debug!(prefix = %self.prefix, ?snapshot, "Metrics store destroyed");
        snapshot
    }
}

impl fmt::Debug for MetricsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsStore")
            .field("prefix", &self.prefix)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

/// 计数快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events_sent: u64,
    pub events_discarded: u64,
    pub watch_errors: u64,
    pub send_errors: u64,
    pub route_errors: u64,
    pub render_errors: u64,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Exporter Metrics Summary ===")?;
        writeln!(f, "Events sent: {}", self.events_sent)?;
        writeln!(f, "Events discarded: {}", self.events_discarded)?;
        writeln!(f, "Watch errors: {}", self.watch_errors)?;
        writeln!(f, "Send errors: {}", self.send_errors)?;
        writeln!(f, "  of which render errors: {}", self.render_errors)?;
        write!(f, "Route errors: {}", self.route_errors)
    }
}
