//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。
//! 未安装 recorder 时（如单元测试），所有记录函数都是空操作。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册通用指标描述
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!("claims_total", "Total number of gift claims by outcome");
    metrics::describe_histogram!("claim_duration_seconds", "Gift claim duration in seconds");

    metrics::describe_counter!("gifts_dispatched_total", "Total number of gifts dispatched");
    metrics::describe_counter!("stars_spent_total", "Total stars spent on dispatched gifts");
    metrics::describe_gauge!("star_balance", "Last observed provider star balance");

    metrics::describe_counter!(
        "external_calls_total",
        "Total number of calls to external services"
    );
    metrics::describe_histogram!(
        "external_call_duration_seconds",
        "External service call duration in seconds"
    );

    metrics::describe_counter!(
        "ledger_stale_total",
        "Gifts dispatched whose ledger record could not be finalized"
    );
    metrics::describe_gauge!(
        "worker_last_run_timestamp",
        "Unix timestamp of the last background worker run"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录一次领取结果
///
/// `outcome` 为 "success" 或错误码（如 "OWNERSHIP_MISMATCH"）
#[inline]
pub fn record_claim(outcome: &str, duration_secs: f64) {
    metrics::counter!("claims_total", "outcome" => outcome.to_string()).increment(1);
    metrics::histogram!("claim_duration_seconds", "outcome" => outcome.to_string())
        .record(duration_secs);
}

/// 记录礼品成功发出
#[inline]
pub fn record_gift_dispatched(gift_name: &str, star_cost: u32) {
    metrics::counter!("gifts_dispatched_total", "gift" => gift_name.to_string()).increment(1);
    metrics::counter!("stars_spent_total").increment(u64::from(star_cost));
}

/// 记录外部服务调用
#[inline]
pub fn record_external_call(service: &str, operation: &str, outcome: &str, duration_secs: f64) {
    metrics::counter!(
        "external_calls_total",
        "service" => service.to_string(),
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "external_call_duration_seconds",
        "service" => service.to_string(),
        "operation" => operation.to_string()
    )
    .record(duration_secs);
}

/// 记录礼品已发出但账本未更新的情况
#[inline]
pub fn record_ledger_stale() {
    metrics::counter!("ledger_stale_total").increment(1);
}

/// 更新最新观测到的星星余额
#[inline]
pub fn set_star_balance(balance: i64) {
    metrics::gauge!("star_balance").set(balance as f64);
}

/// 记录后台 Worker 最近一次运行时间
#[inline]
pub fn set_worker_last_run(worker: &str) {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();
    metrics::gauge!("worker_last_run_timestamp", "worker" => worker.to_string()).set(now);
}
