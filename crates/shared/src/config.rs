//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::observability::ObservabilityConfig;

/// 服务配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 允许跨域的来源，`*` 表示全部放行，否则为逗号分隔的列表
    pub cors_allowed_origins: String,
    /// 管理接口令牌，为空时不校验
    pub admin_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            cors_allowed_origins: "*".to_string(),
            admin_token: None,
        }
    }
}

/// 奖品账本服务配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    /// 幂等调用（查询、终态更新、删除）的最大重试次数
    pub max_retries: u32,
    pub retry_initial_delay_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_ms: 5_000,
            max_retries: 2,
            retry_initial_delay_ms: 200,
        }
    }
}

/// 礼品发放渠道配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_base: String,
    pub bot_token: String,
    pub timeout_ms: u64,
    /// 礼品附言模板，支持 `{gift}` 和 `{prize}` 占位符
    pub gift_message_template: String,
    pub balance_page_size: u32,
    /// 余额分页查询的页数上限，超过后视为暂时不可用
    pub balance_max_pages: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            bot_token: String::new(),
            timeout_ms: 10_000,
            gift_message_template:
                "🎉 Congratulations!\n\nYou claimed: {gift}\nPrize ID: {prize}\n\nEnjoy your gift! 🎁"
                    .to_string(),
            balance_page_size: 100,
            balance_max_pages: 1_000,
        }
    }
}

/// 礼品目录存储配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub path: String,
    /// 启动时写入内置的默认礼品列表
    pub seed_defaults: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: "data/gift-catalog.json".to_string(),
            seed_defaults: true,
        }
    }
}

/// 领取流程配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClaimConfig {
    /// 单次外部调用的超时上限
    pub call_timeout_ms: u64,
    /// 余额不足时是否把奖品回退到 pending
    pub revert_on_insufficient_balance: bool,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 15_000,
            revert_on_insufficient_balance: false,
        }
    }
}

/// 审计通知配置
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub chat_id: Option<String>,
    pub topic_id: Option<i64>,
}

/// 对账 Worker 配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub stale_claim_after_secs: u64,
    pub revert_stale_claims: bool,
    pub retention_days: i64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
            stale_claim_after_secs: 900,
            revert_stale_claims: false,
            retention_days: 7,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub server: ServerConfig,
    pub ledger: LedgerConfig,
    pub provider: ProviderConfig,
    pub catalog: CatalogConfig,
    pub claim: ClaimConfig,
    pub notifier: NotifierConfig,
    pub reconciler: ReconcilerConfig,
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "gift-claim-service".to_string(),
            environment: "development".to_string(),
            server: ServerConfig::default(),
            ledger: LedgerConfig::default(),
            provider: ProviderConfig::default(),
            catalog: CatalogConfig::default(),
            claim: ClaimConfig::default(),
            notifier: NotifierConfig::default(),
            reconciler: ReconcilerConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. .env 文件（如存在）
    /// 2. config/default.toml（默认配置）
    /// 3. config/{environment}.toml（环境特定配置）
    /// 4. config/{service_name}.toml（服务特定配置）
    /// 5. 环境变量（GIFT_ 前缀，`__` 分隔层级，如 GIFT_LEDGER__BASE_URL -> ledger.base_url）
    /// 6. 旧部署遗留的环境变量（PRIZE_STORE_URL、GIFT_BOT_TOKEN、PORT 等）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let env = std::env::var("GIFT_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", env))).required(false),
            )
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", service_name)))
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("GIFT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config: Self = builder.build()?.try_deserialize()?;
        config.apply_legacy_env(|key| std::env::var(key).ok());

        Ok(config)
    }

    /// 兼容旧部署的环境变量
    ///
    /// `lookup` 以参数注入，便于测试时不依赖进程环境
    pub fn apply_legacy_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("PRIZE_STORE_URL").filter(|v| !v.trim().is_empty()) {
            self.ledger.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(token) = lookup("GIFT_BOT_TOKEN").filter(|v| !v.trim().is_empty()) {
            self.provider.bot_token = token.trim().to_string();
        }
        if let Some(port) = lookup("PORT")
            .or_else(|| lookup("GIFT_BOT_PORT"))
            .and_then(|v| v.parse().ok())
        {
            self.server.port = port;
        }
        if let Some(chat_id) = lookup("LOG_CHAT_ID").filter(|v| !v.trim().is_empty()) {
            self.notifier.chat_id = Some(chat_id);
        }
        if let Some(topic_id) = lookup("GIFT_LOG_TOPIC_ID").and_then(|v| v.parse().ok()) {
            self.notifier.topic_id = Some(topic_id);
        }
    }

    /// 校验启动必需的配置项
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger.base_url.trim().is_empty() {
            return Err(ConfigError::Message(
                "ledger.base_url 未配置（可通过 PRIZE_STORE_URL 设置）".to_string(),
            ));
        }
        if self.provider.bot_token.trim().is_empty() {
            return Err(ConfigError::Message(
                "provider.bot_token 未配置（可通过 GIFT_BOT_TOKEN 设置）".to_string(),
            ));
        }
        Ok(())
    }

    /// 获取服务地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
