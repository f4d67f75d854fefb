//! 测试套件模块
//!
//! 按业务场景组织的测试用例集合。

pub mod admin;
pub mod claim_flow;
pub mod reconciliation;
