//! 领取并发控制
//!
//! 跨进程的串行化点是账本的 `pending -> claiming` 比较并交换；
//! 本模块只负责在同一进程内提前拦截重复请求。
//!
//! ```ignore
//! let registry = InFlightRegistry::new();
//! let Some(guard) = registry.try_acquire(prize_id) else {
//!     return Err(ClaimError::Conflict { .. });
//! };
//! ledger.lock_prize(prize_id, guard.token()).await?;
//! ```

mod in_flight;

pub use in_flight::{InFlightGuard, InFlightRegistry};
