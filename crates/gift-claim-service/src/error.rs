//! 礼品领取服务错误类型
//!
//! 分为三层：目录存储错误、领取流程错误、HTTP 接口错误。
//! 外部服务客户端的错误定义在 `clients::error`。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::models::PrizeStatus;

/// 礼品目录存储错误
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("目录文件读写失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("目录文件格式错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("礼品定义无效: {0}")]
    InvalidGift(String),

    #[error("渠道礼品 ID 已被占用: provider_gift_id={provider_gift_id}, existing={existing}")]
    ProviderIdConflict {
        provider_gift_id: String,
        existing: String,
    },

    #[error("礼品名称与渠道礼品 ID 冲突: {0}")]
    IdentifierCollision(String),

    #[error("本地奖品记录不存在: {0}")]
    PrizeNotFound(String),

    #[error("奖品状态不允许迁移: prize_id={prize_id}, {from} -> {to}")]
    InvalidTransition {
        prize_id: String,
        from: PrizeStatus,
        to: PrizeStatus,
    },

    #[error("奖品礼品已发出，不能重复记录: {0}")]
    AlreadyDispatched(String),
}

impl CatalogError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "CATALOG_IO_ERROR",
            Self::Serialization(_) => "CATALOG_FORMAT_ERROR",
            Self::InvalidGift(_) => "INVALID_GIFT",
            Self::ProviderIdConflict { .. } => "PROVIDER_ID_CONFLICT",
            Self::IdentifierCollision(_) => "IDENTIFIER_COLLISION",
            Self::PrizeNotFound(_) => "LOCAL_PRIZE_NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::AlreadyDispatched(_) => "ALREADY_DISPATCHED",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidGift(_) => StatusCode::BAD_REQUEST,
            Self::ProviderIdConflict { .. }
            | Self::IdentifierCollision(_)
            | Self::InvalidTransition { .. }
            | Self::AlreadyDispatched(_) => StatusCode::CONFLICT,
            Self::PrizeNotFound(_) => StatusCode::NOT_FOUND,
            Self::Io(_) | Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// 领取流程错误
///
/// 协调器只返回这些错误，所有外部调用失败都在边界处转换
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("奖品不存在: {0}")]
    PrizeNotFound(String),

    #[error("无权领取该奖品: prize_id={prize_id}")]
    Ownership { prize_id: String },

    #[error("奖品状态不允许领取: prize_id={prize_id}, current_status={status}")]
    Conflict { prize_id: String, status: PrizeStatus },

    #[error("礼品映射不可用: {0}")]
    Mapping(String),

    #[error("星星余额不足: 需要 {required}, 可用 {available}")]
    InsufficientBalance { required: u32, available: i64 },

    #[error("礼品发送失败: {0}")]
    Dispatch(String),

    #[error("奖品账本不可用: {0}")]
    LedgerUnavailable(String),

    #[error("奖品加锁失败: {0}")]
    LockFailure(String),

    #[error("礼品渠道不可用: {0}")]
    ProviderUnavailable(String),

    #[error("本地记录写入失败，未发送礼品: {0}")]
    LocalStore(String),
}

pub type Result<T> = std::result::Result<T, ClaimError>;

impl ClaimError {
    /// 整个领取请求可以从头重试（未持有锁、未发出礼品）
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::LedgerUnavailable(_)
                | Self::LockFailure(_)
                | Self::ProviderUnavailable(_)
                | Self::LocalStore(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InsufficientBalance { .. } => StatusCode::BAD_REQUEST,
            Self::Ownership { .. } => StatusCode::FORBIDDEN,
            Self::PrizeNotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Mapping(_)
            | Self::Dispatch(_)
            | Self::LedgerUnavailable(_)
            | Self::LockFailure(_)
            | Self::ProviderUnavailable(_)
            | Self::LocalStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::PrizeNotFound(_) => "PRIZE_NOT_FOUND",
            Self::Ownership { .. } => "OWNERSHIP_MISMATCH",
            Self::Conflict { .. } => "PRIZE_STATUS_CONFLICT",
            Self::Mapping(_) => "GIFT_MAPPING_ERROR",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::Dispatch(_) => "DISPATCH_FAILED",
            Self::LedgerUnavailable(_) => "LEDGER_UNAVAILABLE",
            Self::LockFailure(_) => "LOCK_FAILURE",
            Self::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            Self::LocalStore(_) => "LOCAL_STORE_UNAVAILABLE",
        }
    }
}

impl IntoResponse for ClaimError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "code": self.error_code(),
            "error": self.to_string(),
        });

        (self.status_code(), axum::Json(body)).into_response()
    }
}

/// HTTP 接口错误（领取之外的查询与管理接口）
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("未授权: {0}")]
    Unauthorized(String),

    #[error("参数验证失败: {0}")]
    Validation(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Claim(#[from] ClaimError),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Catalog(e) => e.status_code(),
            Self::Claim(e) => e.status_code(),
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Catalog(e) => e.error_code(),
            Self::Claim(e) => e.error_code(),
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 存储层故障只返回通用提示，详情写日志
        let message = match &self {
            Self::Catalog(e @ (CatalogError::Io(_) | CatalogError::Serialization(_))) => {
                tracing::error!(error = %e, "目录存储操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}
