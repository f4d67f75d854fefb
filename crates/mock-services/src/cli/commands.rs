//! CLI 参数定义
//!
//! 使用 clap derive 宏定义命令行接口结构。

use clap::Parser;

/// Mock 服务命令行工具
///
/// 在同一端口上启动奖品账本与礼品渠道两个模拟服务。
#[derive(Parser, Debug, Clone)]
#[command(name = "mock-server")]
#[command(version, about = "礼品领取系统模拟服务")]
pub struct Cli {
    /// 服务端口
    #[arg(short, long, default_value = "8090")]
    pub port: u16,

    /// 渠道初始星星余额
    #[arg(long, default_value = "1000")]
    pub initial_balance: i64,

    /// 允许的 bot token，不设置时接受任意 token
    #[arg(long, env = "GIFT_BOT_TOKEN")]
    pub bot_token: Option<String>,

    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}
