//! 礼品映射管理处理器
//!
//! 查询开放，写操作在配置了管理令牌时需要携带 `x-admin-token`

use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use serde::Deserialize;
use tracing::{info, instrument};
use validator::Validate;

use crate::{
    error::ApiError,
    handlers::ApiResponse,
    models::{GiftDefinition, GiftUpsert},
    state::AppState,
};

/// 管理令牌 header 名称
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// 更新礼品映射请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertMappingRequest {
    /// 渠道礼品 ID，为空表示暂未映射
    #[serde(default, alias = "telegramId")]
    #[validate(length(max = 128, message = "渠道礼品 ID 长度不能超过128个字符"))]
    pub provider_gift_id: Option<String>,
    #[validate(range(min = 1, max = 1000000, message = "星星数必须在1-1000000之间"))]
    pub star_cost: u32,
    #[validate(length(min = 1, max = 64, message = "展示名称长度必须在1-64个字符之间"))]
    pub display_name: Option<String>,
}

/// 礼品映射列表
///
/// GET /mappings
#[instrument(skip(state))]
pub async fn list_mappings(State(state): State<AppState>) -> Json<ApiResponse<Vec<GiftDefinition>>> {
    let gifts = state.ctx().catalog.list_gifts().await;
    Json(ApiResponse::success(gifts))
}

/// 新增或更新礼品映射
///
/// PUT /mappings/{name}
#[instrument(skip(state, headers, req))]
pub async fn upsert_mapping(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(req): Json<UpsertMappingRequest>,
) -> Result<Json<ApiResponse<GiftDefinition>>, ApiError> {
    authorize_admin(&state, &headers)?;
    req.validate()?;

    let definition = state
        .ctx()
        .catalog
        .upsert(GiftUpsert {
            name,
            provider_gift_id: req.provider_gift_id,
            star_cost: req.star_cost,
            display_name: req.display_name,
        })
        .await?;

    info!(
        gift = %definition.name,
        provider_gift_id = ?definition.provider_gift_id,
        star_cost = definition.star_cost,
        "礼品映射已更新"
    );

    Ok(Json(ApiResponse::success(definition)))
}

fn authorize_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Ok(());
    };

    let provided = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if provided == expected {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("管理令牌无效".to_string()))
    }
}
