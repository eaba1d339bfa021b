//! # Observability
//!
//! 可观测性模块：Tracing + Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式)
//! - `MetricsStore`：显式创建、显式销毁的计数器集合
//! - Prometheus 导出任务（可取消、可 join）
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{MetricsServer, MetricsStore};
//!
//! observability::init()?;
//! let server = MetricsServer::spawn(9102)?;
//! let store = Arc::new(MetricsStore::new("event_exporter_"));
//! // ...
//! server.shutdown().await;
//! ```

pub mod metrics;

use anyhow::{anyhow, Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{MetricsSnapshot, MetricsStore};

/// 初始化 Tracing（JSON 格式，支持 RUST_LOG 环境变量）
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// 默认日志级别 (RUST_LOG 未设置时使用)
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            default_log_level: "info".to_string(),
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON 结构化日志
    #[default]
    Json,
    /// 人类可读格式
    Pretty,
    /// 紧凑单行格式
    Compact,
}

/// 使用自定义配置初始化
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));

    // stdout carries sink output; logs go to stderr
    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(std::io::stderr).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    info!(log_format = ?config.log_format, "Observability initialized");
    Ok(())
}

/// Prometheus 导出任务
///
/// 安装全局 recorder 并在独立任务中运行 HTTP 监听；
/// `shutdown` 取消并等待任务结束，关闭顺序确定。
pub struct MetricsServer {
    port: u16,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl MetricsServer {
    /// 启动导出任务（需在 tokio 运行时内调用）
    pub fn spawn(port: u16) -> Result<Self> {
        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], port))
            .build()
            .context("Failed to build Prometheus exporter")?;

        ::metrics::set_global_recorder(recorder)
            .map_err(|_| anyhow!("A metrics recorder is already installed"))?;

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                result = exporter => {
                    if let Err(e) = result {
                        error!(error = ?e, "Prometheus exporter stopped");
                    }
                }
                _ = token.cancelled() => {
                    debug!("Prometheus exporter cancelled");
                }
            }
        });

        info!(port, "Prometheus metrics endpoint initialized");
        Ok(Self {
            port,
            cancel,
            handle,
        })
    }

    /// 监听端口
    pub fn port(&self) -> u16 {
        self.port
    }

    /// 取消并等待导出任务
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            error!(error = ?e, "Prometheus exporter task panicked");
        }
        debug!(port = self.port, "Prometheus exporter shutdown complete");
    }
}
