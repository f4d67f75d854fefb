//! 服务启动器
//!
//! 将命令行参数转化为服务状态并启动 HTTP 服务。

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::Cli;
use crate::services::{LedgerServiceState, ProviderServiceState, build_app};

/// 启动合并后的模拟服务并等待关闭信号
pub async fn run_server(cli: &Cli) -> Result<()> {
    info!(
        port = cli.port,
        initial_balance = cli.initial_balance,
        "启动 Mock 服务"
    );

    let ledger = Arc::new(LedgerServiceState::new());
    let provider = Arc::new(ProviderServiceState::new(
        cli.initial_balance,
        cli.bot_token.clone(),
    ));
    // 请求日志便于联调时观察领取服务的调用顺序
    let app = build_app(ledger, provider).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    let listener = TcpListener::bind(addr).await.context("绑定端口失败")?;

    info!("Mock 服务已启动: http://{}", addr);
    info!("可用端点:");
    info!("  GET /health - 健康检查");
    info!("  POST /prizes, GET/PATCH/DELETE /prizes/{{id}} - 奖品账本");
    info!("  POST /bot{{token}}/sendGift|getStarTransactions|sendMessage - 礼品渠道");
    info!("  POST /admin/topup|gifts|faults - 渠道管理");
    info!("按 Ctrl+C 停止服务");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("服务器运行失败")?;

    info!("Mock 服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "安装 CTRL+C 信号处理器失败");
        std::future::pending::<()>().await;
    }
    info!("收到关闭信号，正在停止服务...");
}
