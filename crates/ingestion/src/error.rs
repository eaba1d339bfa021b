//! Ingestion 错误类型

use contracts::ContractError;
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 事件解析失败
    #[error("line {line}: {message}")]
    Parse {
        /// 行号（从 1 开始）
        line: u64,
        /// 错误消息
        message: String,
    },

    /// 读取失败
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// 下游通道已关闭
    #[error("event channel closed for source {source_name}")]
    ChannelClosed {
        /// 事件源名称
        source_name: String,
    },
}

impl IngestionError {
    /// 附带事件源名称转换为 `ContractError`
    pub fn into_contract(self, source_name: &str) -> ContractError {
        ContractError::source(source_name, self.to_string())
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
