//! 外部服务客户端
//!
//! - `ledger`: 奖品账本服务（查询、加锁、状态更新、删除）
//! - `provider`: 礼品发放渠道（发送礼品、查询星星余额）

pub mod error;
pub mod ledger;
pub mod provider;

pub use error::ClientError;
pub use ledger::{HttpPrizeLedgerClient, PrizeLedgerClient};
pub use provider::{DispatchConfirmation, GiftProviderClient, TelegramGiftProvider};

#[cfg(test)]
pub use ledger::MockPrizeLedgerClient;
#[cfg(test)]
pub use provider::MockGiftProviderClient;
