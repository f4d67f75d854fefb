//! 礼品发放渠道客户端
//!
//! 对接 Telegram Bot API：`sendGift` 发送礼品，`getStarTransactions` 计算星星余额。

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gift_shared::config::ProviderConfig;
use gift_shared::observability::metrics;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::error::ClientError;

const SERVICE: &str = "provider";

/// 发送成功的确认信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchConfirmation {
    /// 本地生成的发送凭证
    pub reference: String,
    pub recipient_user_id: String,
    pub provider_gift_id: String,
    pub confirmed_at: DateTime<Utc>,
}

impl DispatchConfirmation {
    pub fn new(recipient_user_id: &str, provider_gift_id: &str) -> Self {
        Self {
            reference: Uuid::now_v7().to_string(),
            recipient_user_id: recipient_user_id.to_string(),
            provider_gift_id: provider_gift_id.to_string(),
            confirmed_at: Utc::now(),
        }
    }
}

/// 礼品发放渠道
///
/// `send_gift` 不是幂等操作，实现和调用方都不应自动重试
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GiftProviderClient: Send + Sync {
    async fn send_gift(
        &self,
        user_id: &str,
        provider_gift_id: &str,
        message: &str,
    ) -> Result<DispatchConfirmation, ClientError>;

    /// 当前星星余额（收入减支出）
    async fn get_balance(&self) -> Result<i64, ClientError>;
}

/// Bot API 统一响应结构
#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<u16>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendGiftParams<'a> {
    user_id: &'a str,
    gift_id: &'a str,
    text: &'a str,
    text_parse_mode: &'a str,
}

#[derive(Debug, Serialize)]
struct StarTransactionsParams {
    offset: u32,
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct StarTransactions {
    #[serde(default)]
    transactions: Vec<StarTransaction>,
}

/// 有 `source` 的是收入，有 `receiver` 的是支出
#[derive(Debug, Deserialize)]
struct StarTransaction {
    amount: i64,
    #[serde(default)]
    source: Option<serde_json::Value>,
    #[serde(default)]
    receiver: Option<serde_json::Value>,
}

/// Telegram 礼品渠道
pub struct TelegramGiftProvider {
    client: Client,
    api_base: String,
    bot_token: String,
    page_size: u32,
    max_pages: u32,
}

impl TelegramGiftProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ClientError::Permanent(format!("创建 HTTP 客户端失败: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            page_size: config.balance_page_size.max(1),
            max_pages: config.balance_max_pages.max(1),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    /// 调用 Bot API 方法并解包 `result`
    async fn call_method<P, T>(&self, method: &str, params: &P) -> Result<T, ClientError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let start = Instant::now();
        let result = self.call_method_inner(method, params).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.outcome(),
        };
        let elapsed = start.elapsed().as_secs_f64();
        metrics::record_external_call(SERVICE, method, outcome, elapsed);
        result
    }

    async fn call_method_inner<P, T>(&self, method: &str, params: &P) -> Result<T, ClientError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.method_url(method))
            .json(params)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        let parsed: TelegramResponse<T> = match serde_json::from_slice(&bytes) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                let body = String::from_utf8_lossy(&bytes).to_string();
                return Err(ClientError::from_status(status.as_u16(), body));
            }
            Err(e) => return Err(ClientError::Permanent(format!("响应解析失败: {e}"))),
        };

        if !parsed.ok {
            let code = parsed.error_code.unwrap_or(status.as_u16());
            let description = parsed.description.unwrap_or_default();
            return Err(ClientError::from_status(code, description));
        }

        parsed
            .result
            .ok_or_else(|| ClientError::Permanent(format!("{method} 响应缺少 result")))
    }
}

#[async_trait]
impl GiftProviderClient for TelegramGiftProvider {
    #[instrument(skip(self, message))]
    async fn send_gift(
        &self,
        user_id: &str,
        provider_gift_id: &str,
        message: &str,
    ) -> Result<DispatchConfirmation, ClientError> {
        let params = SendGiftParams {
            user_id,
            gift_id: provider_gift_id,
            text: message,
            text_parse_mode: "Markdown",
        };

        let _: serde_json::Value = self.call_method("sendGift", &params).await?;
        let confirmation = DispatchConfirmation::new(user_id, provider_gift_id);
        info!(reference = %confirmation.reference, "礼品已发出");
        Ok(confirmation)
    }

    #[instrument(skip(self))]
    async fn get_balance(&self) -> Result<i64, ClientError> {
        let mut balance: i64 = 0;
        let mut offset: u32 = 0;

        for _ in 0..self.max_pages {
            let params = StarTransactionsParams {
                offset,
                limit: self.page_size,
            };
            let page: StarTransactions = self.call_method("getStarTransactions", &params).await?;
            let fetched = page.transactions.len() as u32;

            for tx in &page.transactions {
                if tx.source.is_some() {
                    balance += tx.amount;
                } else if tx.receiver.is_some() {
                    balance -= tx.amount;
                }
            }

            if fetched < self.page_size {
                debug!(balance, pages_offset = offset, "星星余额已计算");
                return Ok(balance);
            }
            offset += fetched;
        }

        // 部分流水算出的余额不可信，按暂时不可用处理
        warn!(
            partial_balance = balance,
            max_pages = self.max_pages,
            "星星流水分页超过上限"
        );
        Err(ClientError::Transient(format!(
            "星星流水超过 {} 页，余额无法确定",
            self.max_pages
        )))
    }
}
