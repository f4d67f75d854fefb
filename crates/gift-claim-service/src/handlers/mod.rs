//! HTTP 请求处理器模块
//!
//! 领取接口之外的端点都是只读查询，管理写操作只有礼品映射维护

pub mod claim;
pub mod mappings;
pub mod prizes;
pub mod status;

use serde::Serialize;

/// 统一响应包装
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            data: Some(data),
        }
    }
}
