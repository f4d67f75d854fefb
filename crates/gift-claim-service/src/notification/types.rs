//! 审计通知事件

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 领取流程产生的审计事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaimEvent {
    /// 礼品已发出
    Claimed {
        user_id: String,
        prize_id: String,
        gift_name: String,
        star_cost: u32,
        balance_after: Option<i64>,
        at: DateTime<Utc>,
    },
    /// 领取失败，礼品未发出
    ClaimFailed {
        user_id: String,
        prize_id: String,
        gift: String,
        reason: String,
        at: DateTime<Utc>,
    },
    /// 礼品已发出但账本未更新，需要人工或对账任务处理
    LedgerStale {
        user_id: String,
        prize_id: String,
        gift_name: String,
        star_cost: u32,
        detail: String,
        at: DateTime<Utc>,
    },
}

impl ClaimEvent {
    pub fn claimed(
        user_id: &str,
        prize_id: &str,
        gift_name: &str,
        star_cost: u32,
        balance_after: Option<i64>,
    ) -> Self {
        Self::Claimed {
            user_id: user_id.to_string(),
            prize_id: prize_id.to_string(),
            gift_name: gift_name.to_string(),
            star_cost,
            balance_after,
            at: Utc::now(),
        }
    }

    pub fn failed(user_id: &str, prize_id: &str, gift: &str, reason: impl Into<String>) -> Self {
        Self::ClaimFailed {
            user_id: user_id.to_string(),
            prize_id: prize_id.to_string(),
            gift: gift.to_string(),
            reason: reason.into(),
            at: Utc::now(),
        }
    }

    pub fn ledger_stale(
        user_id: &str,
        prize_id: &str,
        gift_name: &str,
        star_cost: u32,
        detail: impl Into<String>,
    ) -> Self {
        Self::LedgerStale {
            user_id: user_id.to_string(),
            prize_id: prize_id.to_string(),
            gift_name: gift_name.to_string(),
            star_cost,
            detail: detail.into(),
            at: Utc::now(),
        }
    }

    pub fn prize_id(&self) -> &str {
        match self {
            Self::Claimed { prize_id, .. }
            | Self::ClaimFailed { prize_id, .. }
            | Self::LedgerStale { prize_id, .. } => prize_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Claimed { .. } => "claimed",
            Self::ClaimFailed { .. } => "claim_failed",
            Self::LedgerStale { .. } => "ledger_stale",
        }
    }

    /// 渲染为 Telegram HTML 消息
    pub fn render_html(&self) -> String {
        match self {
            Self::Claimed {
                user_id,
                prize_id,
                gift_name,
                star_cost,
                balance_after,
                at,
            } => {
                let balance = balance_after
                    .map(|b| format!("{} stars", b))
                    .unwrap_or_else(|| "unknown".to_string());
                format!(
                    "✅ <b>GIFT CLAIMED SUCCESSFULLY</b>\n\
                     ━━━━━━━━━━━━━━━━━━━━\n\n\
                     👤 <b>User ID:</b> <code>{}</code>\n\
                     🎁 <b>Gift:</b> {}\n\
                     🆔 <b>Prize ID:</b> <code>{}</code>\n\
                     ⭐ <b>Stars Spent:</b> {}\n\
                     💰 <b>New Balance:</b> {}\n\
                     📅 <b>Time:</b> {}\n\n\
                     <b>Status:</b> Gift sent via Telegram API",
                    escape_html(user_id),
                    escape_html(gift_name),
                    escape_html(prize_id),
                    star_cost,
                    balance,
                    at.to_rfc3339(),
                )
            }
            Self::ClaimFailed {
                user_id,
                prize_id,
                gift,
                reason,
                at,
            } => format!(
                "❌ <b>GIFT CLAIM FAILED</b>\n\
                 ━━━━━━━━━━━━━━━━━━━━\n\n\
                 👤 <b>User ID:</b> <code>{}</code>\n\
                 🎁 <b>Gift:</b> {}\n\
                 🆔 <b>Prize ID:</b> <code>{}</code>\n\
                 ❌ <b>Error:</b> {}\n\
                 📅 <b>Time:</b> {}\n\n\
                 <b>Status:</b> Gift NOT sent - claim failed",
                escape_html(user_id),
                escape_html(gift),
                escape_html(prize_id),
                escape_html(reason),
                at.to_rfc3339(),
            ),
            Self::LedgerStale {
                user_id,
                prize_id,
                gift_name,
                star_cost,
                detail,
                at,
            } => format!(
                "⚠️ <b>GIFT SENT, LEDGER NOT UPDATED</b>\n\
                 ━━━━━━━━━━━━━━━━━━━━\n\n\
                 👤 <b>User ID:</b> <code>{}</code>\n\
                 🎁 <b>Gift:</b> {}\n\
                 🆔 <b>Prize ID:</b> <code>{}</code>\n\
                 ⭐ <b>Stars Spent:</b> {}\n\
                 ❗ <b>Detail:</b> {}\n\
                 📅 <b>Time:</b> {}\n\n\
                 <b>Status:</b> Manual reconciliation required",
                escape_html(user_id),
                escape_html(gift_name),
                escape_html(prize_id),
                star_cost,
                escape_html(detail),
                at.to_rfc3339(),
            ),
        }
    }
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
