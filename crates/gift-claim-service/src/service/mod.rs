//! 业务服务层
//!
//! - `ClaimCoordinator`: 单次领取的端到端编排
//! - `dto`: 请求与响应结构

mod claim_coordinator;
pub mod dto;

pub use claim_coordinator::ClaimCoordinator;
