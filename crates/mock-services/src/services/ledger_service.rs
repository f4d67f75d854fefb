//! Mock 奖品账本服务
//!
//! 模拟外部奖品账本的 REST API。PATCH 支持 `expected_status`，
//! 在同一把锁内完成比较与更新，状态不符时返回 409。

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::{MockPrize, PrizeState};
use crate::store::MemoryStore;

/// 账本服务状态
#[derive(Clone, Default)]
pub struct LedgerServiceState {
    pub prizes: MemoryStore<MockPrize>,
}

impl LedgerServiceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接写入一个 pending 奖品，供测试预置数据
    pub fn seed_prize(&self, id: &str, user_id: &str, gift_name: &str) -> MockPrize {
        let prize = MockPrize::pending(Some(id.to_string()), user_id, Some(gift_name));
        self.prizes.insert(id, prize.clone());
        prize
    }
}

// ============================================================================
// 请求 DTO
// ============================================================================

/// 创建奖品请求
#[derive(Debug, Deserialize)]
pub struct CreatePrizeRequest {
    pub id: Option<String>,
    pub user_id: serde_json::Value,
    pub gift_name: Option<String>,
}

/// 更新奖品状态请求
#[derive(Debug, Deserialize)]
pub struct PatchPrizeRequest {
    pub status: PrizeState,
    pub error_message: Option<String>,
    /// 比较并交换：当前状态必须等于该值
    pub expected_status: Option<PrizeState>,
    pub claim_token: Option<String>,
}

// ============================================================================
// 路由定义
// ============================================================================

/// 构建账本服务路由
pub fn ledger_routes() -> Router<Arc<LedgerServiceState>> {
    Router::new()
        .route("/prizes", post(create_prize).get(list_prizes))
        .route(
            "/prizes/{prize_id}",
            get(get_prize).patch(patch_prize).delete(delete_prize),
        )
}

// ============================================================================
// 路由处理器
// ============================================================================

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// 创建奖品
///
/// POST /prizes
async fn create_prize(
    State(state): State<Arc<LedgerServiceState>>,
    Json(req): Json<CreatePrizeRequest>,
) -> Response {
    let user_id = match &req.user_id {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return error_body(StatusCode::BAD_REQUEST, "user_id is required"),
    };

    let prize = MockPrize::pending(req.id, &user_id, req.gift_name.as_deref());
    if !state.prizes.insert_if_absent(&prize.id, prize.clone()) {
        return error_body(StatusCode::CONFLICT, format!("prize {} already exists", prize.id));
    }

    info!(prize_id = %prize.id, user_id = %prize.user_id, "创建奖品");
    (StatusCode::CREATED, Json(prize)).into_response()
}

/// 列出全部奖品
///
/// GET /prizes
async fn list_prizes(State(state): State<Arc<LedgerServiceState>>) -> Json<Vec<MockPrize>> {
    Json(state.prizes.list())
}

/// 获取奖品
///
/// GET /prizes/{prize_id}
async fn get_prize(
    State(state): State<Arc<LedgerServiceState>>,
    Path(prize_id): Path<String>,
) -> Response {
    match state.prizes.get(&prize_id) {
        Some(prize) => Json(prize).into_response(),
        None => {
            warn!(prize_id = %prize_id, "奖品不存在");
            error_body(StatusCode::NOT_FOUND, "Prize not found")
        }
    }
}

/// 更新奖品状态
///
/// PATCH /prizes/{prize_id}
async fn patch_prize(
    State(state): State<Arc<LedgerServiceState>>,
    Path(prize_id): Path<String>,
    Json(req): Json<PatchPrizeRequest>,
) -> Response {
    let outcome = state.prizes.update(&prize_id, |prize| {
        if let Some(expected) = req.expected_status
            && prize.status != expected
        {
            return Err(prize.status);
        }

        prize.status = req.status;
        match req.status {
            PrizeState::Pending => prize.claim_token = None,
            _ => {
                if req.claim_token.is_some() {
                    prize.claim_token = req.claim_token.clone();
                }
            }
        }
        if req.error_message.is_some() {
            prize.error_message = req.error_message.clone();
        }
        prize.updated_at = Utc::now();
        Ok(prize.clone())
    });

    match outcome {
        None => error_body(StatusCode::NOT_FOUND, "Prize not found"),
        Some(Err(current)) => {
            warn!(prize_id = %prize_id, ?current, expected = ?req.expected_status, "状态不符，拒绝更新");
            (
                StatusCode::CONFLICT,
                Json(json!({ "error": "Status mismatch", "status": current })),
            )
                .into_response()
        }
        Some(Ok(prize)) => {
            info!(prize_id = %prize_id, status = ?prize.status, "更新奖品状态");
            Json(prize).into_response()
        }
    }
}

/// 删除奖品
///
/// DELETE /prizes/{prize_id}
async fn delete_prize(
    State(state): State<Arc<LedgerServiceState>>,
    Path(prize_id): Path<String>,
) -> Response {
    match state.prizes.remove(&prize_id) {
        Some(_) => {
            info!(prize_id = %prize_id, "删除奖品");
            StatusCode::NO_CONTENT.into_response()
        }
        None => error_body(StatusCode::NOT_FOUND, "Prize not found"),
    }
}

// ============================================================================
// 单元测试
// ============================================================================
