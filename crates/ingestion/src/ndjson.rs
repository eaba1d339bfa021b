//! NDJSON 事件源
//!
//! 每行一个 Kubernetes 事件（JSON），来源为文件或标准输入。

use std::path::Path;

use contracts::{ContractError, Event, EventSource};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tracing::{debug, trace};

use crate::error::{IngestionError, Result};

type Reader = Box<dyn AsyncRead + Send + Unpin>;

/// 逐行读取事件
pub struct JsonLinesSource {
    name: String,
    lines: Lines<BufReader<Reader>>,
    line_no: u64,
}

impl JsonLinesSource {
    /// 从任意异步读取端创建
    pub fn new(name: impl Into<String>, reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        let reader: Reader = Box::new(reader);
        Self {
            name: name.into(),
            lines: BufReader::new(reader).lines(),
            line_no: 0,
        }
    }

    /// 打开文件；`-` 表示标准输入
    pub async fn open(path: &Path) -> Result<Self> {
        if path.as_os_str() == "-" {
            debug!("Reading events from stdin");
            return Ok(Self::new("stdin", tokio::io::stdin()));
        }
        let file = tokio::fs::File::open(path).await?;
        debug!(path = %path.display(), "Reading events from file");
        Ok(Self::new(path.display().to_string(), file))
    }

    async fn read_next(&mut self) -> Option<Result<Event>> {
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            trace!(source = %self.name, line = self.line_no, "Parsing event line");
            return Some(serde_json::from_str(trimmed).map_err(|e| IngestionError::Parse {
                line: self.line_no,
                message: e.to_string(),
            }));
        }
    }
}

impl EventSource for JsonLinesSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_event(&mut self) -> Option<std::result::Result<Event, ContractError>> {
        let next = self.read_next().await?;
        Some(next.map_err(|e| e.into_contract(&self.name)))
    }
}
