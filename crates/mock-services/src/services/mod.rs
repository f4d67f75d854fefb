//! Mock 服务模块
//!
//! 提供模拟的 REST API 服务实现，用于开发和测试环境。

pub mod ledger_service;
pub mod provider_service;

use std::sync::Arc;

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

pub use ledger_service::{LedgerServiceState, ledger_routes};
pub use provider_service::{FaultConfig, ProviderServiceState, provider_routes};

/// 合并账本与渠道路由
///
/// 健康检查端点独立于业务服务，便于运维监控
pub fn build_app(ledger: Arc<LedgerServiceState>, provider: Arc<ProviderServiceState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(ledger_routes().with_state(ledger))
        .merge(provider_routes().with_state(provider))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "mock-services" }))
}
