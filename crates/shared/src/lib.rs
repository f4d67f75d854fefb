//! 共享库
//!
//! 包含礼品领取服务与 mock 服务共用的配置加载、可观测性（日志、指标、HTTP 中间件）
//! 以及重试策略等基础设施代码。

pub mod config;
pub mod observability;
pub mod retry;
