//! 测试环境管理
//!
//! 每个测试拥有独立的 mock-services、礼品目录文件和领取服务实例。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use gift_claim::{AppContext, AppState, ReconcileWorker, routes};
use gift_shared::config::AppConfig;
use mock_services::services::{LedgerServiceState, ProviderServiceState, build_app};
use tempfile::TempDir;

use super::services::{ServiceHandle, spawn_service, wait_until_healthy};
use crate::helpers::{ClaimApiClient, MockAdminClient};

pub const BOT_TOKEN: &str = "e2e-token";

/// 测试环境配置
#[derive(Debug, Clone)]
pub struct TestEnvConfig {
    /// 渠道初始星星余额
    pub initial_balance: i64,
    /// 单次外部调用超时
    pub call_timeout: Duration,
    pub revert_on_insufficient_balance: bool,
    /// 等待服务就绪的超时时间
    pub service_ready_timeout: Duration,
}

impl Default for TestEnvConfig {
    fn default() -> Self {
        Self {
            initial_balance: 1000,
            call_timeout: Duration::from_secs(2),
            revert_on_insufficient_balance: false,
            service_ready_timeout: Duration::from_secs(5),
        }
    }
}

impl TestEnvConfig {
    pub fn with_balance(initial_balance: i64) -> Self {
        Self {
            initial_balance,
            ..Default::default()
        }
    }
}

/// 测试环境
///
/// 封装两个服务、对应的 HTTP 客户端以及 mock 状态的直接引用。
pub struct TestEnvironment {
    pub config: AppConfig,
    /// 领取服务 API 客户端
    pub api: ClaimApiClient,
    /// mock-services 管理端点客户端
    pub mock: MockAdminClient,
    /// mock 账本状态，用于准备数据和核对结果
    pub ledger: Arc<LedgerServiceState>,
    pub provider: Arc<ProviderServiceState>,
    pub ctx: AppContext,
    _mock_service: ServiceHandle,
    _claim_service: ServiceHandle,
    _data_dir: TempDir,
}

impl TestEnvironment {
    /// 使用默认配置创建测试环境
    pub async fn setup() -> Result<Self> {
        Self::setup_with_config(TestEnvConfig::default()).await
    }

    pub async fn setup_with_config(env_config: TestEnvConfig) -> Result<Self> {
        let ledger = Arc::new(LedgerServiceState::new());
        let provider = Arc::new(ProviderServiceState::new(
            env_config.initial_balance,
            Some(BOT_TOKEN.to_string()),
        ));
        let mock_service = spawn_service(
            "mock-services",
            build_app(ledger.clone(), provider.clone()),
        )
        .await?;
        wait_until_healthy(&mock_service, env_config.service_ready_timeout).await?;

        let data_dir = tempfile::tempdir()?;
        let mut config = AppConfig::default();
        config.ledger.base_url = mock_service.base_url.clone();
        config.ledger.retry_initial_delay_ms = 10;
        config.provider.api_base = mock_service.base_url.clone();
        config.provider.bot_token = BOT_TOKEN.to_string();
        config.catalog.path = data_dir
            .path()
            .join("gift-catalog.json")
            .to_string_lossy()
            .into_owned();
        config.catalog.seed_defaults = true;
        config.claim.call_timeout_ms = env_config.call_timeout.as_millis() as u64;
        config.claim.revert_on_insufficient_balance = env_config.revert_on_insufficient_balance;
        config.validate()?;

        let ctx = AppContext::from_config(&config).await?;
        let state = AppState::new(ctx.clone(), config.server.admin_token.clone());
        let claim_service = spawn_service(
            "gift-claim-service",
            routes::build_router(state, &config.server.cors_allowed_origins),
        )
        .await?;
        wait_until_healthy(&claim_service, env_config.service_ready_timeout).await?;

        Ok(Self {
            config,
            api: ClaimApiClient::new(&claim_service.base_url),
            mock: MockAdminClient::new(&mock_service.base_url),
            ledger,
            provider,
            ctx,
            _mock_service: mock_service,
            _claim_service: claim_service,
            _data_dir: data_dir,
        })
    }

    /// 在 mock 账本中创建一个 pending 奖品
    pub fn seed_prize(&self, prize_id: &str, user_id: &str, gift_name: &str) {
        self.ledger.seed_prize(prize_id, user_id, gift_name);
    }

    /// 与服务共享上下文的对账 Worker
    pub fn reconciler(&self) -> ReconcileWorker {
        ReconcileWorker::new(self.ctx.clone(), &self.config.reconciler)
    }
}
