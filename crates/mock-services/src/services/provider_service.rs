//! Mock 礼品渠道服务
//!
//! 模拟 Bot API 的 `sendGift`、`getStarTransactions`、`sendMessage`，
//! 并提供充值、价目表与故障注入等管理接口。
//!
//! 响应沿用 Bot API 的信封格式：成功 `{ok: true, result}`，
//! 失败 `{ok: false, error_code, description}`，HTTP 状态码与 error_code 一致。

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::models::{SentGift, SentMessage, StarTransaction, default_gift_prices};

/// 故障注入配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaultConfig {
    /// 接下来 N 次 sendGift 直接返回错误
    #[serde(default)]
    pub fail_next_sends: u32,
    /// 注入失败时返回的错误码，默认 500
    #[serde(default)]
    pub fail_status: Option<u16>,
    /// 每个 Bot API 请求的额外延迟
    #[serde(default)]
    pub delay_ms: u64,
}

/// 渠道服务状态
pub struct ProviderServiceState {
    /// 允许的 bot token，为空时不校验
    pub bot_token: Option<String>,
    /// 渠道礼品 ID → 星星数
    pub prices: DashMap<String, u32>,
    /// 星星流水，发放时在同一把锁内完成余额校验与扣减
    pub transactions: Mutex<Vec<StarTransaction>>,
    pub sent_gifts: Mutex<Vec<SentGift>>,
    pub messages: Mutex<Vec<SentMessage>>,
    pub faults: Mutex<FaultConfig>,
    next_message_id: AtomicI64,
}

impl ProviderServiceState {
    /// 创建渠道状态，初始余额以一笔充值流水表示
    pub fn new(initial_balance: i64, bot_token: Option<String>) -> Self {
        let mut transactions = Vec::new();
        if initial_balance > 0 {
            transactions.push(StarTransaction::incoming(initial_balance));
        }

        Self {
            bot_token: bot_token.filter(|t| !t.is_empty()),
            prices: default_gift_prices().into_iter().collect(),
            transactions: Mutex::new(transactions),
            sent_gifts: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
            faults: Mutex::new(FaultConfig::default()),
            next_message_id: AtomicI64::new(1),
        }
    }

    /// 当前余额
    pub async fn balance(&self) -> i64 {
        self.transactions
            .lock()
            .await
            .iter()
            .map(StarTransaction::signed_amount)
            .sum()
    }

    /// 已发出礼品的快照
    pub async fn sent_gifts(&self) -> Vec<SentGift> {
        self.sent_gifts.lock().await.clone()
    }

    /// 已发送消息的快照
    pub async fn messages(&self) -> Vec<SentMessage> {
        self.messages.lock().await.clone()
    }

    pub fn set_price(&self, gift_id: &str, star_count: u32) {
        self.prices.insert(gift_id.to_string(), star_count);
    }

    pub async fn set_faults(&self, faults: FaultConfig) {
        *self.faults.lock().await = faults;
    }
}

// ============================================================================
// 请求/响应 DTO
// ============================================================================

/// sendGift 参数
#[derive(Debug, Deserialize)]
pub struct SendGiftParams {
    pub user_id: Value,
    pub gift_id: String,
    pub text: Option<String>,
    pub text_parse_mode: Option<String>,
}

/// getStarTransactions 参数
#[derive(Debug, Default, Deserialize)]
pub struct StarTransactionsParams {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

/// sendMessage 参数
#[derive(Debug, Deserialize)]
pub struct SendMessageParams {
    pub chat_id: Value,
    pub text: String,
    pub message_thread_id: Option<i64>,
    pub parse_mode: Option<String>,
}

/// 充值请求
#[derive(Debug, Deserialize)]
pub struct TopUpRequest {
    pub amount: i64,
}

/// 价目表请求
#[derive(Debug, Deserialize)]
pub struct GiftPriceRequest {
    pub gifts: Vec<GiftPrice>,
}

#[derive(Debug, Deserialize)]
pub struct GiftPrice {
    pub id: String,
    pub star_count: u32,
}

// ============================================================================
// 路由定义
// ============================================================================

/// 构建渠道服务路由
///
/// Bot API 路径形如 `/bot{token}/{method}`，token 在处理器内从路径段中剥离
pub fn provider_routes() -> Router<Arc<ProviderServiceState>> {
    Router::new()
        .route("/{bot}/sendGift", post(send_gift))
        .route(
            "/{bot}/getStarTransactions",
            post(get_star_transactions_post).get(get_star_transactions_get),
        )
        .route("/{bot}/sendMessage", post(send_message))
        .route("/admin/topup", post(top_up))
        .route("/admin/gifts", post(set_gift_prices))
        .route("/admin/faults", post(set_faults))
        .route("/admin/balance", get(get_balance))
        .route("/admin/sent", get(list_sent))
}

// ============================================================================
// 路由处理器
// ============================================================================

fn ok(result: Value) -> Response {
    Json(json!({ "ok": true, "result": result })).into_response()
}

fn api_error(code: u16, description: impl Into<String>) -> Response {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    (
        status,
        Json(json!({
            "ok": false,
            "error_code": code,
            "description": description.into(),
        })),
    )
        .into_response()
}

/// 校验 token 并应用注入的延迟
async fn authorize(state: &ProviderServiceState, bot: &str) -> Result<(), Response> {
    let Some(token) = bot.strip_prefix("bot") else {
        return Err(api_error(404, "Not Found"));
    };
    if let Some(expected) = state.bot_token.as_deref()
        && token != expected
    {
        return Err(api_error(401, "Unauthorized"));
    }

    let delay_ms = state.faults.lock().await.delay_ms;
    if delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
    Ok(())
}

fn value_to_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 发送礼品
///
/// POST /bot{token}/sendGift
async fn send_gift(
    State(state): State<Arc<ProviderServiceState>>,
    Path(bot): Path<String>,
    Json(params): Json<SendGiftParams>,
) -> Response {
    if let Err(response) = authorize(&state, &bot).await {
        return response;
    }

    {
        let mut faults = state.faults.lock().await;
        if faults.fail_next_sends > 0 {
            faults.fail_next_sends -= 1;
            let code = faults.fail_status.unwrap_or(500);
            warn!(gift_id = %params.gift_id, code, "注入 sendGift 故障");
            return api_error(code, "Internal Server Error: injected failure");
        }
    }

    let Some(cost) = state.prices.get(&params.gift_id).map(|c| *c) else {
        return api_error(400, "Bad Request: STARGIFT_INVALID");
    };

    let user_id = value_to_id(&params.user_id);

    // 余额校验和扣减在同一把锁内完成
    let mut transactions = state.transactions.lock().await;
    let balance: i64 = transactions.iter().map(StarTransaction::signed_amount).sum();
    if balance < i64::from(cost) {
        warn!(balance, cost, "余额不足");
        return api_error(400, "Bad Request: BALANCE_TOO_LOW");
    }
    transactions.push(StarTransaction::outgoing(i64::from(cost), &user_id));
    drop(transactions);

    state.sent_gifts.lock().await.push(SentGift {
        user_id: user_id.clone(),
        gift_id: params.gift_id.clone(),
        star_count: cost,
        text: params.text,
        sent_at: Utc::now(),
    });

    info!(
        user_id = %user_id,
        gift_id = %params.gift_id,
        cost,
        parse_mode = ?params.text_parse_mode,
        "礼品已发出"
    );
    ok(Value::Bool(true))
}

async fn star_transactions(state: &ProviderServiceState, params: StarTransactionsParams) -> Response {
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(100).clamp(1, 100);

    let transactions: Vec<StarTransaction> = state
        .transactions
        .lock()
        .await
        .iter()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect();

    ok(json!({ "transactions": transactions }))
}

/// 星星流水
///
/// POST /bot{token}/getStarTransactions
async fn get_star_transactions_post(
    State(state): State<Arc<ProviderServiceState>>,
    Path(bot): Path<String>,
    params: Result<Json<StarTransactionsParams>, JsonRejection>,
) -> Response {
    if let Err(response) = authorize(&state, &bot).await {
        return response;
    }
    // 空请求体按默认分页处理
    let params = params.map(|Json(p)| p).unwrap_or_default();
    star_transactions(&state, params).await
}

/// 星星流水
///
/// GET /bot{token}/getStarTransactions?offset=&limit=
async fn get_star_transactions_get(
    State(state): State<Arc<ProviderServiceState>>,
    Path(bot): Path<String>,
    Query(params): Query<StarTransactionsParams>,
) -> Response {
    if let Err(response) = authorize(&state, &bot).await {
        return response;
    }
    star_transactions(&state, params).await
}

/// 发送群组消息
///
/// POST /bot{token}/sendMessage
async fn send_message(
    State(state): State<Arc<ProviderServiceState>>,
    Path(bot): Path<String>,
    Json(params): Json<SendMessageParams>,
) -> Response {
    if let Err(response) = authorize(&state, &bot).await {
        return response;
    }

    let message_id = state.next_message_id.fetch_add(1, Ordering::SeqCst);
    let chat_id = value_to_id(&params.chat_id);
    info!(
        chat_id = %chat_id,
        thread = ?params.message_thread_id,
        parse_mode = ?params.parse_mode,
        "收到群组消息"
    );

    state.messages.lock().await.push(SentMessage {
        message_id,
        chat_id: chat_id.clone(),
        message_thread_id: params.message_thread_id,
        text: params.text,
    });

    ok(json!({ "message_id": message_id, "chat": { "id": chat_id } }))
}

/// 充值
///
/// POST /admin/topup
async fn top_up(
    State(state): State<Arc<ProviderServiceState>>,
    Json(req): Json<TopUpRequest>,
) -> Response {
    if req.amount <= 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "amount must be positive" })),
        )
            .into_response();
    }

    state
        .transactions
        .lock()
        .await
        .push(StarTransaction::incoming(req.amount));
    let balance = state.balance().await;
    info!(amount = req.amount, balance, "充值完成");

    Json(json!({ "balance": balance })).into_response()
}

/// 更新价目表
///
/// POST /admin/gifts
async fn set_gift_prices(
    State(state): State<Arc<ProviderServiceState>>,
    Json(req): Json<GiftPriceRequest>,
) -> Json<Value> {
    for gift in &req.gifts {
        state.set_price(&gift.id, gift.star_count);
    }
    info!(count = req.gifts.len(), "价目表已更新");
    Json(json!({ "gifts": state.prices.len() }))
}

/// 故障注入
///
/// POST /admin/faults
async fn set_faults(
    State(state): State<Arc<ProviderServiceState>>,
    Json(faults): Json<FaultConfig>,
) -> Json<FaultConfig> {
    info!(?faults, "故障注入已更新");
    state.set_faults(faults.clone()).await;
    Json(faults)
}

/// 当前余额
///
/// GET /admin/balance
async fn get_balance(State(state): State<Arc<ProviderServiceState>>) -> Json<Value> {
    Json(json!({ "balance": state.balance().await }))
}

/// 已发出的礼品
///
/// GET /admin/sent
async fn list_sent(State(state): State<Arc<ProviderServiceState>>) -> Json<Vec<SentGift>> {
    Json(state.sent_gifts().await)
}

// ============================================================================
// 单元测试
// ============================================================================
