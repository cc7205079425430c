//! Ingestion 错误类型

use contracts::ContractError;
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 串口打开失败
    #[error("failed to open link {path}: {message}")]
    LinkOpenFailed {
        /// 设备路径
        path: String,
        /// 错误消息
        message: String,
    },

    /// 读取失败（设备拔出、I/O 错误）
    #[error("link read failed: {source}")]
    LinkReadFailed {
        #[source]
        source: std::io::Error,
    },

    /// 链路已被关闭
    #[error("link is closed")]
    LinkClosed,

    /// 读线程启动失败
    #[error("failed to spawn link reader thread: {source}")]
    SpawnFailed {
        #[source]
        source: std::io::Error,
    },
}

impl IngestionError {
    /// 创建打开失败错误
    pub fn link_open(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LinkOpenFailed {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<IngestionError> for ContractError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::LinkOpenFailed { path, message } => {
                ContractError::link_open(path, message)
            }
            IngestionError::LinkReadFailed { source } => ContractError::link_read(source.to_string()),
            IngestionError::LinkClosed => ContractError::LinkNotConnected,
            IngestionError::SpawnFailed { source } => ContractError::Io(source),
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
