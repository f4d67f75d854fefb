//! 礼品领取服务
//!
//! 加载配置、装配协作者、启动对账 Worker 与 HTTP 服务。

use gift_claim::{AppContext, AppState, ReconcileWorker, routes};
use gift_shared::{config::AppConfig, observability};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 配置加载失败或缺少必填项时直接退出
    let config = AppConfig::load("gift-claim-service")?;
    config.validate()?;

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!(
        environment = %config.environment,
        "Starting gift-claim-service on {}",
        config.server_addr()
    );

    let ctx = AppContext::from_config(&config).await?;

    // 启动对账 Worker
    if config.reconciler.enabled {
        let worker = ReconcileWorker::new(ctx.clone(), &config.reconciler);
        tokio::spawn(async move {
            worker.run().await;
        });
    } else {
        info!("ReconcileWorker 已禁用");
    }

    if config.is_production() {
        if config.server.cors_allowed_origins.trim() == "*" {
            warn!("cors_allowed_origins=\"*\" 在生产环境中不安全，请设置为具体域名");
        }
        if config.server.admin_token.as_deref().is_none_or(str::is_empty) {
            warn!("生产环境未配置 admin_token，礼品映射写接口不做鉴权");
        }
    }

    let state = AppState::new(ctx, config.server.admin_token.clone());
    let app = routes::build_router(state, &config.server.cors_allowed_origins);

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 优雅关闭：收到 SIGTERM 或 Ctrl+C 后停止接收新连接，等待已有请求处理完毕
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// 监听关闭信号
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("注册 Ctrl+C 处理器失败");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("注册 SIGTERM 处理器失败")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
