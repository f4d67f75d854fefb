//! 应用状态定义
//!
//! 包含 Axum 路由共享的应用状态

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::context::AppContext;
use crate::service::ClaimCoordinator;

/// Axum 应用共享状态
///
/// 协调器持有全部协作者，通过 Arc 在 handler 间共享
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<ClaimCoordinator>,
    /// 管理接口令牌，为空时不校验
    pub admin_token: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(ctx: AppContext, admin_token: Option<String>) -> Self {
        Self {
            coordinator: Arc::new(ClaimCoordinator::new(ctx)),
            admin_token: admin_token.filter(|t| !t.is_empty()),
            started_at: Utc::now(),
        }
    }

    pub fn ctx(&self) -> &AppContext {
        self.coordinator.context()
    }
}
