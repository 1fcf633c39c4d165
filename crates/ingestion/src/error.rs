//! Ingestion 错误类型

use contracts::ContractError;
use thiserror::Error;

/// Ingestion 错误
///
/// 只包含调用级别的错误；单个 destination 的失败记录在 `DispatchOutcome` 中，
/// 不会出现在这里。
#[derive(Debug, Error)]
pub enum IngestError {
    /// token 缺失或未知（两种情况对调用方不可区分）
    #[error("unauthenticated")]
    Unauthenticated,

    /// 方法、Content-Type 或 body 形状不合法
    #[error("invalid data: {message}")]
    InvalidData {
        /// 错误详情（仅记录日志，不返回给调用方）
        message: String,
    },

    /// 路由配置不合法
    #[error("invalid ingestion route config: {message}")]
    InvalidConfig {
        /// 错误详情
        message: String,
    },

    /// 目录查询等内部故障
    #[error("internal error: {message}")]
    Internal {
        /// 错误详情（仅记录日志）
        message: String,
    },
}

impl IngestError {
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// 指标标签
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidData { .. } => "invalid",
            Self::InvalidConfig { .. } | Self::Internal { .. } => "error",
        }
    }
}

impl From<ContractError> for IngestError {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::Unauthenticated => Self::Unauthenticated,
            ContractError::MalformedRequest { message } => Self::InvalidData { message },
            other => Self::Internal {
                message: other.to_string(),
            },
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestError>;
