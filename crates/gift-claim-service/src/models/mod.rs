//! 礼品领取领域模型

pub mod enums;
pub mod gift;
pub mod prize;

pub use enums::{IdentifierKind, PrizeStatus};
pub use gift::{GiftDefinition, GiftIdentifier, GiftUpsert};
pub use prize::{LedgerPrize, PrizeRecord, normalize_id};
