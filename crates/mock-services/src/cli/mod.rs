//! CLI 模块
//!
//! # 使用示例
//!
//! ```bash
//! mock-server --port 8090 --initial-balance 500 --bot-token dev-token
//! ```

pub mod commands;
pub mod runner;

pub use commands::Cli;
pub use runner::run_server;
