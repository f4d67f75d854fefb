//! 礼品领取系统端到端测试
//!
//! 在进程内启动 mock-services（账本 + Bot API）和礼品领取服务，
//! 通过真实的 HTTP 连接覆盖完整流程：
//! - 正常领取与余额扣减
//! - 并发重复领取
//! - 归属校验与映射缺失
//! - 渠道故障与对账

pub mod helpers;
pub mod setup;
pub mod suites;

pub use setup::TestEnvironment;
