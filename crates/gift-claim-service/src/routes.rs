//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射，并挂载可观测性与 CORS 中间件

use axum::{
    Router, middleware,
    http::HeaderValue,
    routing::{get, post, put},
};
use gift_shared::observability::middleware as obs_middleware;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::{handlers, state::AppState};

/// 构建业务路由
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::status::service_info))
        .route("/claim-gift", post(handlers::claim::claim_gift))
        .route("/status", get(handlers::status::get_status))
        // 礼品映射
        .route("/mappings", get(handlers::mappings::list_mappings))
        .route("/mappings/{name}", put(handlers::mappings::upsert_mapping))
        // 本地领取记录
        .route("/prizes", get(handlers::prizes::list_user_prizes))
        .route("/prizes/pending", get(handlers::prizes::list_pending_prizes))
        .route("/health", get(handlers::status::health_check))
}

/// 构建完整应用：业务路由 + CORS + 请求追踪
pub fn build_router(state: AppState, cors_allowed_origins: &str) -> Router {
    api_routes()
        .layer(cors_layer(cors_allowed_origins))
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}

/// CORS 配置：`*` 放行全部来源，否则按逗号分隔的列表放行
pub fn cors_layer(allowed_origins: &str) -> CorsLayer {
    if allowed_origins.trim() == "*" {
        info!("CORS allowed_origins: * (all origins)");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    info!("CORS allowed_origins: {}", allowed_origins);
    let origins: Vec<_> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
