//! 本地领取记录查询处理器
//!
//! 数据来自本地目录镜像，可能落后于账本

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use crate::{error::ApiError, handlers::ApiResponse, models::PrizeRecord, state::AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrizeQuery {
    pub user_id: Option<String>,
}

/// 用户领取历史
///
/// GET /prizes?userId=
#[instrument(skip(state))]
pub async fn list_user_prizes(
    State(state): State<AppState>,
    Query(query): Query<PrizeQuery>,
) -> Result<Json<ApiResponse<Vec<PrizeRecord>>>, ApiError> {
    let user_id = query
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::Validation("userId is required".to_string()))?;

    let prizes = state.ctx().catalog.list_user_prizes(user_id).await;
    Ok(Json(ApiResponse::success(prizes)))
}

/// 本地 pending 记录
///
/// GET /prizes/pending
#[instrument(skip(state))]
pub async fn list_pending_prizes(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<PrizeRecord>>> {
    let prizes = state.ctx().catalog.list_pending_prizes().await;
    Json(ApiResponse::success(prizes))
}
