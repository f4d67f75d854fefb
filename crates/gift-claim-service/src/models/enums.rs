//! 礼品领取枚举类型定义

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 奖品状态
///
/// 状态只能沿 `pending -> claiming -> {claimed | sent | failed}` 前进，
/// 领取前可恢复的错误允许 `claiming -> pending` 回退。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrizeStatus {
    /// 待领取
    #[default]
    Pending,
    /// 领取中（已加锁）
    Claiming,
    /// 已领取，账本最终状态
    Claimed,
    /// 礼品已发出（本地镜像记录）
    Sent,
    /// 发送失败，终态
    Failed,
}

impl PrizeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Claiming => "claiming",
            Self::Claimed => "claimed",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    /// 检查是否允许从当前状态迁移到目标状态
    pub fn can_transition_to(&self, next: PrizeStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Claiming)
                | (
                    Self::Claiming,
                    Self::Pending | Self::Claimed | Self::Sent | Self::Failed
                )
                | (Self::Claimed, Self::Sent)
        )
    }

    /// 礼品已发出的状态，永远不能再次发送
    pub fn is_dispatched(&self) -> bool {
        matches!(self, Self::Claimed | Self::Sent)
    }
}

impl fmt::Display for PrizeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrizeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "claiming" => Ok(Self::Claiming),
            "claimed" => Ok(Self::Claimed),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            other => Err(format!("未知的奖品状态: {}", other)),
        }
    }
}

/// 礼品查找方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    /// 按礼品名称（正向索引）
    Name,
    /// 按渠道礼品 ID（反向索引）
    ProviderId,
}
