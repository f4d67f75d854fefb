//! 服务信息与运行状态处理器

use axum::{Json, extract::State};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{instrument, warn};

use crate::{catalog::CatalogStats, handlers::ApiResponse, state::AppState};

const SERVICE_NAME: &str = "gift-claim-service";

/// 运行状态
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDto {
    /// 渠道星星余额，查询失败时为空
    pub balance: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_error: Option<String>,
    pub mapped_gifts: usize,
    pub claims_in_flight: usize,
    pub uptime_secs: i64,
    pub stats: CatalogStats,
}

/// 服务信息
///
/// GET /
pub async fn service_info() -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "POST /claim-gift",
            "GET /status",
            "GET /mappings",
            "PUT /mappings/{name}",
            "GET /prizes?userId=",
            "GET /prizes/pending",
            "GET /health",
        ],
    }))
}

/// 运行状态
///
/// GET /status
///
/// 余额实时查询渠道，查询失败不影响其余字段返回
#[instrument(skip(state))]
pub async fn get_status(State(state): State<AppState>) -> Json<ApiResponse<StatusDto>> {
    let ctx = state.ctx();

    let balance = tokio::time::timeout(ctx.options.call_timeout, ctx.provider.get_balance()).await;
    let (balance, balance_error) = match balance {
        Ok(Ok(stars)) => (Some(stars), None),
        Ok(Err(e)) => {
            warn!(error = %e, "查询星星余额失败");
            (None, Some(e.to_string()))
        }
        Err(_) => (None, Some("balance query timed out".to_string())),
    };

    let stats = ctx.catalog.stats().await;
    let status = StatusDto {
        balance,
        balance_error,
        mapped_gifts: stats.gifts_mapped,
        claims_in_flight: ctx.in_flight.len(),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
        stats,
    };

    Json(ApiResponse::success(status))
}

/// 存活探针
///
/// GET /health
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
    }))
}
