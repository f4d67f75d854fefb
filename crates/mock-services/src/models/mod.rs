//! 模拟数据模型
//!
//! 包含账本奖品、星星流水等模拟数据结构，用于测试和开发环境。

pub mod prize;
pub mod star;

pub use prize::{MockPrize, PrizeState};
pub use star::{SentGift, SentMessage, StarTransaction, default_gift_prices};
