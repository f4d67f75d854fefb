//! 外部服务调用错误分类

use thiserror::Error;

/// 外部服务错误
///
/// 所有传输层和协议层故障在客户端边界处归入这四类
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("资源不存在: {0}")]
    NotFound(String),

    #[error("状态冲突: {0}")]
    Conflict(String),

    /// 网络错误、超时、5xx、429，可按调用方策略重试
    #[error("暂时性故障: {0}")]
    Transient(String),

    /// 404/409 以外的 4xx 或响应无法解析，不可重试
    #[error("请求被拒绝: {0}")]
    Permanent(String),
}

impl ClientError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// 按 HTTP 状态码（或 Telegram error_code）分类
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        let detail = format!("HTTP {}: {}", status, detail.into());
        match status {
            404 => Self::NotFound(detail),
            409 => Self::Conflict(detail),
            408 | 429 => Self::Transient(detail),
            s if s >= 500 => Self::Transient(detail),
            _ => Self::Permanent(detail),
        }
    }

    /// 指标标签
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Transient(_) => "transient",
            Self::Permanent(_) => "permanent",
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Permanent(format!("响应解析失败: {}", err));
        }
        if let Some(status) = err.status() {
            return Self::from_status(status.as_u16(), err.to_string());
        }
        // 超时、连接失败、请求中断
        Self::Transient(err.to_string())
    }
}
