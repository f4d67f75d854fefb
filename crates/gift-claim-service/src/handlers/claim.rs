//! 礼品领取处理器

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use tracing::{error, instrument};

use crate::{
    error::{ApiError, ClaimError},
    service::dto::{ClaimRequest, ClaimResponse},
    state::AppState,
};

/// 领取礼品
///
/// POST /claim-gift
///
/// 领取流程在独立任务中运行：客户端断开连接时，已经开始的加锁、
/// 发放和账本确认仍会执行完毕。
#[instrument(skip(state, payload))]
pub async fn claim_gift(
    State(state): State<AppState>,
    payload: Result<Json<ClaimRequest>, JsonRejection>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let Json(request) = payload
        .map_err(|e| ClaimError::Validation(format!("Invalid request body: {}", e.body_text())))?;

    let coordinator = state.coordinator.clone();
    let handle = tokio::spawn(async move { coordinator.claim_gift(&request).await });

    let success = handle.await.map_err(|e| {
        error!(error = %e, "领取任务异常退出");
        ApiError::Internal(e.to_string())
    })??;

    Ok(Json(ClaimResponse::from(success)))
}
