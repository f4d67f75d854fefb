//! 应用上下文
//!
//! 领取流程依赖的所有协作者都通过上下文显式注入，不使用进程级全局状态。

use std::sync::Arc;
use std::time::Duration;

use gift_shared::config::AppConfig;
use tracing::info;

use crate::catalog::GiftCatalogStore;
use crate::clients::{
    GiftProviderClient, HttpPrizeLedgerClient, PrizeLedgerClient, TelegramGiftProvider,
};
use crate::lock::InFlightRegistry;
use crate::notification::{NotificationSender, build_notifier};

/// 领取流程参数
#[derive(Debug, Clone)]
pub struct ClaimOptions {
    /// 单次外部调用的超时上限
    pub call_timeout: Duration,
    /// 礼品附言模板，`{gift}`、`{prize}` 为占位符
    pub message_template: String,
    pub revert_on_insufficient_balance: bool,
}

impl Default for ClaimOptions {
    fn default() -> Self {
        let config = AppConfig::default();
        Self::from_config(&config)
    }
}

impl ClaimOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            call_timeout: Duration::from_millis(config.claim.call_timeout_ms),
            message_template: config.provider.gift_message_template.clone(),
            revert_on_insufficient_balance: config.claim.revert_on_insufficient_balance,
        }
    }

    pub fn render_message(&self, gift_name: &str, prize_id: &str) -> String {
        self.message_template
            .replace("{gift}", gift_name)
            .replace("{prize}", prize_id)
    }
}

/// 应用上下文
#[derive(Clone)]
pub struct AppContext {
    pub catalog: Arc<GiftCatalogStore>,
    pub ledger: Arc<dyn PrizeLedgerClient>,
    pub provider: Arc<dyn GiftProviderClient>,
    pub notifier: NotificationSender,
    pub in_flight: Arc<InFlightRegistry>,
    pub options: ClaimOptions,
}

impl AppContext {
    pub fn new(
        catalog: Arc<GiftCatalogStore>,
        ledger: Arc<dyn PrizeLedgerClient>,
        provider: Arc<dyn GiftProviderClient>,
        notifier: NotificationSender,
        options: ClaimOptions,
    ) -> Self {
        Self {
            catalog,
            ledger,
            provider,
            notifier,
            in_flight: InFlightRegistry::new(),
            options,
        }
    }

    /// 按配置装配生产环境的协作者：本地目录文件、HTTP 账本、Telegram 渠道与通知
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let catalog = GiftCatalogStore::open(&config.catalog).await?;
        info!(path = %catalog.path().display(), "礼品目录已加载");

        let ledger = HttpPrizeLedgerClient::new(&config.ledger)?;
        let provider = TelegramGiftProvider::new(&config.provider)?;
        let notifier = build_notifier(&config.notifier, &config.provider)?;

        Ok(Self::new(
            Arc::new(catalog),
            Arc::new(ledger),
            Arc::new(provider),
            NotificationSender::new(notifier),
            ClaimOptions::from_config(config),
        ))
    }
}
