//! 模拟账本奖品模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 奖品状态
///
/// 与账本服务的字符串状态一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrizeState {
    Pending,
    Claiming,
    Claimed,
    Sent,
    Failed,
}

/// 模拟账本奖品
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockPrize {
    pub id: String,
    pub user_id: String,
    pub status: PrizeState,
    pub gift_name: Option<String>,
    /// 持有锁的领取令牌，回到 pending 时清空
    pub claim_token: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MockPrize {
    /// 创建一个 pending 状态的奖品
    pub fn pending(id: Option<String>, user_id: &str, gift_name: Option<&str>) -> Self {
        let now = Utc::now();
        Self {
            id: id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| format!("PRZ-{}", Uuid::new_v4().simple())),
            user_id: user_id.to_string(),
            status: PrizeState::Pending,
            gift_name: gift_name.map(String::from),
            claim_token: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}
