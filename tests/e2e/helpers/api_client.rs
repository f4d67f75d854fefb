//! REST API 客户端
//!
//! 封装对礼品领取服务和 mock-services 管理端点的 HTTP 调用。

use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

/// 原始响应：状态码 + JSON 响应体
#[derive(Debug, Clone)]
pub struct ApiResult {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResult {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// 错误响应中的 `code` 字段
    pub fn code(&self) -> Option<&str> {
        self.body["code"].as_str()
    }
}

fn build_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("创建 HTTP 客户端失败")
}

async fn into_result(response: reqwest::Response) -> Result<ApiResult> {
    let status = response.status();
    let text = response.text().await?;
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text)?
    };
    Ok(ApiResult { status, body })
}

/// 礼品领取服务客户端
#[derive(Clone)]
pub struct ClaimApiClient {
    client: Client,
    base_url: String,
}

impl ClaimApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: build_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    // ========== 领取 ==========

    /// 领取礼品
    pub async fn claim(&self, user_id: &str, prize_id: &str, gift_name: &str) -> Result<ApiResult> {
        self.post(
            "/claim-gift",
            &json!({ "userId": user_id, "prizeId": prize_id, "giftName": gift_name }),
        )
        .await
    }

    // ========== 查询 ==========

    pub async fn status(&self) -> Result<ApiResult> {
        self.get("/status").await
    }

    pub async fn mappings(&self) -> Result<ApiResult> {
        self.get("/mappings").await
    }

    pub async fn user_prizes(&self, user_id: &str) -> Result<ApiResult> {
        self.get(&format!("/prizes?userId={}", user_id)).await
    }

    pub async fn pending_prizes(&self) -> Result<ApiResult> {
        self.get("/prizes/pending").await
    }

    // ========== 管理 ==========

    /// 新增或更新礼品映射
    pub async fn upsert_mapping(
        &self,
        name: &str,
        provider_gift_id: Option<&str>,
        star_cost: u32,
    ) -> Result<ApiResult> {
        let response = self
            .client
            .put(format!("{}/mappings/{}", self.base_url, name))
            .json(&json!({ "providerGiftId": provider_gift_id, "starCost": star_cost }))
            .send()
            .await?;
        into_result(response).await
    }

    // ========== 通用方法 ==========

    async fn get(&self, path: &str) -> Result<ApiResult> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        into_result(response).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<ApiResult> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;
        into_result(response).await
    }
}

/// mock-services 管理端点客户端
#[derive(Clone)]
pub struct MockAdminClient {
    client: Client,
    base_url: String,
}

impl MockAdminClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: build_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// 渠道当前余额
    pub async fn balance(&self) -> Result<i64> {
        let body: Value = self
            .client
            .get(format!("{}/admin/balance", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body["balance"].as_i64().unwrap_or_default())
    }

    /// 充值并返回新余额
    pub async fn top_up(&self, amount: i64) -> Result<i64> {
        let body: Value = self
            .client
            .post(format!("{}/admin/topup", self.base_url))
            .json(&json!({ "amount": amount }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body["balance"].as_i64().unwrap_or_default())
    }

    /// 让接下来 N 次 sendGift 返回指定错误码
    pub async fn fail_next_sends(&self, count: u32, status: u16) -> Result<()> {
        self.client
            .post(format!("{}/admin/faults", self.base_url))
            .json(&json!({ "fail_next_sends": count, "fail_status": status }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// 已发出的礼品列表
    pub async fn sent_gifts(&self) -> Result<Vec<Value>> {
        let body: Vec<Value> = self
            .client
            .get(format!("{}/admin/sent", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body)
    }

    /// 账本中的奖品，不存在时返回 None
    pub async fn ledger_prize(&self, prize_id: &str) -> Result<Option<Value>> {
        let response = self
            .client
            .get(format!("{}/prizes/{}", self.base_url, prize_id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(response.error_for_status()?.json().await?))
    }
}
