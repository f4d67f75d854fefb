//! 测试环境设置模块
//!
//! 提供测试环境的初始化与服务就绪检查。

mod environment;
mod services;

pub use environment::{TestEnvConfig, TestEnvironment};
pub use services::{ServiceHandle, spawn_service, wait_until_healthy};
