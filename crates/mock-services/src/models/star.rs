//! 模拟星星流水与发放记录

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 星星流水
///
/// 与 Bot API 一致：收入带 `source`，支出带 `receiver`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StarTransaction {
    pub id: String,
    pub amount: i64,
    pub date: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<serde_json::Value>,
}

impl StarTransaction {
    /// 充值流水
    pub fn incoming(amount: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            amount,
            date: Utc::now().timestamp(),
            source: Some(serde_json::json!({"type": "fragment"})),
            receiver: None,
        }
    }

    /// 发放礼品的支出流水
    pub fn outgoing(amount: i64, user_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            amount,
            date: Utc::now().timestamp(),
            source: None,
            receiver: Some(serde_json::json!({"type": "user", "user": {"id": user_id}})),
        }
    }

    /// 对余额的影响
    pub fn signed_amount(&self) -> i64 {
        if self.source.is_some() {
            self.amount
        } else if self.receiver.is_some() {
            -self.amount
        } else {
            0
        }
    }
}

/// 已发出的礼品
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentGift {
    pub user_id: String,
    pub gift_id: String,
    pub star_count: u32,
    pub text: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// 已发送的群组消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
    pub chat_id: String,
    pub message_thread_id: Option<i64>,
    pub text: String,
}

/// 内置礼品价目表（渠道礼品 ID → 星星数）
pub fn default_gift_prices() -> Vec<(String, u32)> {
    [
        ("d01a849b9ef17642d8f4", 15),
        ("d01a849bfc7f7938aa86", 75),
        ("d01a849b9e2c54fb0cf1", 100),
        ("d01a849ba490ee9e6308", 125),
        ("d01a849bb0e2c9f42a0a", 150),
        ("d01a849b8c2f0cd6de99", 200),
        ("d01a849b9c4de7d48c4e", 300),
        ("d01a849b8de88d0e703d", 500),
        ("d01a849b92670e79adce", 750),
        ("d01a849b95b3da4d0acb", 1000),
    ]
    .into_iter()
    .map(|(id, cost)| (id.to_string(), cost))
    .collect()
}
