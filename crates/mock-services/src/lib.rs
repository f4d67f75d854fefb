//! Mock Services
//!
//! 模拟外部服务的 crate，用于开发和测试环境。
//!
//! # 主要模块
//!
//! - `models`: 账本奖品、星星流水等模拟数据模型
//! - `store`: 内存存储实现
//! - `services`: 奖品账本与礼品渠道的 HTTP 路由
//!
//! # 使用示例
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mock_services::services::{LedgerServiceState, ProviderServiceState, build_app};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let ledger = Arc::new(LedgerServiceState::new());
//! ledger.seed_prize("p1", "u1", "Heart");
//! let provider = Arc::new(ProviderServiceState::new(100, None));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
//! axum::serve(listener, build_app(ledger, provider)).await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod models;
pub mod services;
pub mod store;
