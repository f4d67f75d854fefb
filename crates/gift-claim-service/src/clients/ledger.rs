//! 奖品账本客户端

use std::time::{Duration, Instant};

use async_trait::async_trait;
use gift_shared::config::LedgerConfig;
use gift_shared::observability::metrics;
use gift_shared::retry::{RetryPolicy, retry_with_policy};
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use tracing::{debug, instrument};

use super::error::ClientError;
use crate::models::{LedgerPrize, PrizeStatus};

const SERVICE: &str = "ledger";

/// 奖品账本
///
/// `lock_prize` 是领取流程的串行化点，语义为 `pending -> claiming` 的比较并交换
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrizeLedgerClient: Send + Sync {
    async fn fetch_prize(&self, prize_id: &str) -> Result<LedgerPrize, ClientError>;

    /// 把 pending 的奖品锁定为 claiming
    ///
    /// 支持比较并交换的账本在状态不是 pending 时返回 `Conflict`
    async fn lock_prize(&self, prize_id: &str, claim_token: &str) -> Result<(), ClientError>;

    async fn patch_status(
        &self,
        prize_id: &str,
        status: PrizeStatus,
        error_message: Option<String>,
    ) -> Result<(), ClientError>;

    async fn delete_prize(&self, prize_id: &str) -> Result<(), ClientError>;
}

#[derive(Debug, Serialize)]
struct PatchPrizeBody<'a> {
    status: PrizeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_status: Option<PrizeStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    claim_token: Option<&'a str>,
}

/// 基于 HTTP 的账本客户端
///
/// 查询、状态更新、删除都是幂等的，暂时性故障按策略重试；加锁不重试
pub struct HttpPrizeLedgerClient {
    client: Client,
    base_url: Url,
    retry_policy: RetryPolicy,
}

impl HttpPrizeLedgerClient {
    pub fn new(config: &LedgerConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ClientError::Permanent(format!("创建 HTTP 客户端失败: {e}")))?;

        let base_url = Url::parse(config.base_url.trim())
            .map_err(|e| ClientError::Permanent(format!("账本地址无效: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Permanent(format!(
                "账本地址无效: {}",
                config.base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            retry_policy: RetryPolicy::new(
                config.max_retries,
                Duration::from_millis(config.retry_initial_delay_ms),
            ),
        })
    }

    /// 奖品 ID 作为单个路径段编码，`?`、`#`、`/` 不会改变请求目标
    fn prize_url(&self, prize_id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("prizes").push(prize_id);
        }
        url
    }

    async fn send_patch(
        &self,
        prize_id: &str,
        body: &PatchPrizeBody<'_>,
    ) -> Result<(), ClientError> {
        let response = self
            .client
            .patch(self.prize_url(prize_id))
            .json(body)
            .send()
            .await?;
        ensure_success(response).await.map(|_| ())
    }

    /// 带重试和指标的调用包装
    async fn call<T, F, Fut>(&self, operation: &str, retry: bool, f: F) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, ClientError>>,
    {
        let start = Instant::now();
        let policy = if retry {
            self.retry_policy.clone()
        } else {
            RetryPolicy::none()
        };

        let result = retry_with_policy(&policy, operation, ClientError::is_retryable, f).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.outcome(),
        };
        let elapsed = start.elapsed().as_secs_f64();
        metrics::record_external_call(SERVICE, operation, outcome, elapsed);
        result
    }
}

#[async_trait]
impl PrizeLedgerClient for HttpPrizeLedgerClient {
    #[instrument(skip(self))]
    async fn fetch_prize(&self, prize_id: &str) -> Result<LedgerPrize, ClientError> {
        self.call("fetch_prize", true, || async {
            let response = self.client.get(self.prize_url(prize_id)).send().await?;
            let response = ensure_success(response).await?;
            let mut prize: LedgerPrize = response.json().await?;
            if prize.id.is_empty() {
                prize.id = prize_id.to_string();
            }
            debug!(status = %prize.status, owner = %prize.user_id, "账本奖品已获取");
            Ok::<_, ClientError>(prize)
        })
        .await
    }

    #[instrument(skip(self, claim_token))]
    async fn lock_prize(&self, prize_id: &str, claim_token: &str) -> Result<(), ClientError> {
        let body = PatchPrizeBody {
            status: PrizeStatus::Claiming,
            error_message: None,
            expected_status: Some(PrizeStatus::Pending),
            claim_token: Some(claim_token),
        };
        self.call("lock_prize", false, || self.send_patch(prize_id, &body))
            .await
    }

    #[instrument(skip(self, error_message))]
    async fn patch_status(
        &self,
        prize_id: &str,
        status: PrizeStatus,
        error_message: Option<String>,
    ) -> Result<(), ClientError> {
        let body = PatchPrizeBody {
            status,
            error_message: error_message.as_deref(),
            expected_status: None,
            claim_token: None,
        };
        self.call("patch_status", true, || self.send_patch(prize_id, &body))
            .await
    }

    #[instrument(skip(self))]
    async fn delete_prize(&self, prize_id: &str) -> Result<(), ClientError> {
        self.call("delete_prize", true, || async {
            let response = self.client.delete(self.prize_url(prize_id)).send().await?;
            ensure_success(response).await.map(|_| ())
        })
        .await
    }
}

/// 非 2xx 响应按状态码分类
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown")
            .to_string()
    } else {
        body
    };

    if status == StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound(detail));
    }
    Err(ClientError::from_status(status.as_u16(), detail))
}
