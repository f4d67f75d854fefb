//! 奖品实体定义
//!
//! 包含外部账本返回的奖品视图和本地镜像记录

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::enums::PrizeStatus;

/// 账本中的奖品
///
/// 账本中的用户 ID 可能是数字也可能是字符串，统一按字符串处理
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerPrize {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
    pub status: PrizeStatus,
    #[serde(default)]
    pub gift_name: Option<String>,
    #[serde(default)]
    pub claim_token: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl LedgerPrize {
    /// 规范化后比较所有者
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        normalize_id(&self.user_id) == normalize_id(user_id)
    }
}

/// 本地奖品镜像记录
///
/// 仅用于统计和审计，可能滞后于外部账本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrizeRecord {
    pub prize_id: String,
    pub gift_name: String,
    #[serde(alias = "userId", deserialize_with = "string_or_number")]
    pub owner_user_id: String,
    pub status: PrizeStatus,
    pub claimed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
    /// 实际发出的礼品星星数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub star_cost: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_gift_id: Option<String>,
    /// 账本是否已确认（标记 claimed 或删除成功）
    #[serde(default)]
    pub ledger_settled: bool,
    /// 调用渠道发送之前写入；有值而状态未到 sent 时，无法确定礼品是否已发出
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatch_started_at: Option<DateTime<Utc>>,
}

impl PrizeRecord {
    pub fn new(
        prize_id: &str,
        gift_name: &str,
        owner_user_id: &str,
        status: PrizeStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            prize_id: prize_id.to_string(),
            gift_name: gift_name.to_string(),
            owner_user_id: owner_user_id.to_string(),
            status,
            claimed_at: now,
            updated_at: now,
            error_message: None,
            retry_count: 0,
            star_cost: None,
            provider_gift_id: None,
            ledger_settled: false,
            dispatch_started_at: None,
        }
    }

    /// 发送结果未知：已开始调用渠道，但没有记录到发送成功或失败
    pub fn dispatch_outcome_unknown(&self) -> bool {
        self.dispatch_started_at.is_some() && self.status == PrizeStatus::Claiming
    }
}

pub fn normalize_id(value: &str) -> &str {
    value.trim()
}

/// 字符串或数字形式的 ID，`null` 视为空字符串
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Int(i64),
        Uint(u64),
        Null,
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Int(n) => n.to_string(),
        StringOrNumber::Uint(n) => n.to_string(),
        StringOrNumber::Null => String::new(),
    })
}
