//! 领取服务 DTO

use serde::{Deserialize, Serialize};

use crate::clients::DispatchConfirmation;
use crate::models::prize::string_or_number;

/// 领取请求
///
/// 字段缺失时反序列化为空字符串，由协调器统一返回参数校验错误
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    #[serde(default, deserialize_with = "string_or_number")]
    pub user_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub prize_id: String,
    /// 礼品名称或渠道礼品 ID
    #[serde(default)]
    pub gift_name: String,
}

impl ClaimRequest {
    pub fn new(
        user_id: impl Into<String>,
        prize_id: impl Into<String>,
        gift_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            prize_id: prize_id.into(),
            gift_name: gift_name.into(),
        }
    }
}

/// 领取成功结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSuccess {
    pub prize_id: String,
    pub gift_name: String,
    pub star_cost: u32,
    pub dispatch_confirmation: DispatchConfirmation,
    /// 账本是否已确认（标记 claimed 或删除成功）
    pub ledger_settled: bool,
}

/// 领取接口响应
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    pub success: bool,
    pub message: String,
    pub prize_id: String,
    pub gift_name: String,
    pub star_cost: u32,
    pub dispatch_confirmation: String,
}

impl From<ClaimSuccess> for ClaimResponse {
    fn from(success: ClaimSuccess) -> Self {
        Self {
            success: true,
            message: "Gift sent successfully!".to_string(),
            prize_id: success.prize_id,
            gift_name: success.gift_name,
            star_cost: success.star_cost,
            dispatch_confirmation: success.dispatch_confirmation.reference,
        }
    }
}
