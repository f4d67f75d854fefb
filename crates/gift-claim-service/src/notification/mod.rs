//! 审计通知模块
//!
//! 领取成功、失败以及“礼品已发出但账本未更新”三类事件，
//! 发送到日志或 Telegram 群组。

mod notifier;
mod types;

pub use notifier::{
    ClaimNotifier, LogNotifier, NotificationSender, TelegramChatNotifier, build_notifier,
};
pub use types::ClaimEvent;

#[cfg(test)]
pub use notifier::MockClaimNotifier;
