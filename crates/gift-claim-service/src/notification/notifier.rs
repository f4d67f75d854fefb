//! 审计通知渠道
//!
//! 通知是旁路流程：发送失败只记录日志，不影响领取结果。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gift_shared::config::{NotifierConfig, ProviderConfig};
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, warn};

use super::types::ClaimEvent;
use crate::clients::ClientError;

/// 审计通知渠道
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClaimNotifier: Send + Sync {
    async fn notify(&self, event: &ClaimEvent) -> Result<(), ClientError>;
}

/// 只写日志的通知渠道
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl ClaimNotifier for LogNotifier {
    async fn notify(&self, event: &ClaimEvent) -> Result<(), ClientError> {
        match event {
            ClaimEvent::Claimed {
                user_id,
                prize_id,
                gift_name,
                star_cost,
                balance_after,
                ..
            } => info!(
                event = event.kind(),
                user_id = %user_id,
                prize_id = %prize_id,
                gift = %gift_name,
                star_cost,
                balance_after = ?balance_after,
                "礼品领取成功"
            ),
            ClaimEvent::ClaimFailed {
                user_id,
                prize_id,
                gift,
                reason,
                ..
            } => warn!(
                event = event.kind(),
                user_id = %user_id,
                prize_id = %prize_id,
                gift = %gift,
                reason = %reason,
                "礼品领取失败"
            ),
            ClaimEvent::LedgerStale {
                user_id,
                prize_id,
                gift_name,
                detail,
                ..
            } => error!(
                event = event.kind(),
                reconcile = "ledger_stale",
                user_id = %user_id,
                prize_id = %prize_id,
                gift = %gift_name,
                detail = %detail,
                "礼品已发出但账本未更新"
            ),
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SendMessageParams<'a> {
    chat_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_thread_id: Option<i64>,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

/// 发送到 Telegram 群组（可指定话题）的通知渠道
pub struct TelegramChatNotifier {
    client: Client,
    endpoint: String,
    chat_id: String,
    topic_id: Option<i64>,
}

impl TelegramChatNotifier {
    pub fn new(
        provider: &ProviderConfig,
        chat_id: impl Into<String>,
        topic_id: Option<i64>,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(provider.timeout_ms))
            .build()
            .map_err(|e| ClientError::Permanent(format!("创建 HTTP 客户端失败: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                provider.api_base.trim_end_matches('/'),
                provider.bot_token
            ),
            chat_id: chat_id.into(),
            topic_id,
        })
    }
}

#[async_trait]
impl ClaimNotifier for TelegramChatNotifier {
    async fn notify(&self, event: &ClaimEvent) -> Result<(), ClientError> {
        let text = event.render_html();
        let params = SendMessageParams {
            chat_id: &self.chat_id,
            message_thread_id: self.topic_id,
            text: &text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let response = self.client.post(&self.endpoint).json(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status.as_u16(), body));
        }
        Ok(())
    }
}

/// 按配置选择通知渠道：配置了 chat_id 时发送到 Telegram，否则只写日志
pub fn build_notifier(
    notifier: &NotifierConfig,
    provider: &ProviderConfig,
) -> Result<Arc<dyn ClaimNotifier>, ClientError> {
    match notifier.chat_id.as_deref().map(str::trim) {
        Some(chat_id) if !chat_id.is_empty() => {
            info!(chat_id, topic_id = ?notifier.topic_id, "审计通知发送到 Telegram");
            Ok(Arc::new(TelegramChatNotifier::new(
                provider,
                chat_id,
                notifier.topic_id,
            )?))
        }
        _ => Ok(Arc::new(LogNotifier)),
    }
}

/// 通知发送器
///
/// 可注入到业务服务中，异步发送（fire-and-forget），不阻塞主流程
#[derive(Clone)]
pub struct NotificationSender {
    notifier: Arc<dyn ClaimNotifier>,
}

impl NotificationSender {
    pub fn new(notifier: Arc<dyn ClaimNotifier>) -> Self {
        Self { notifier }
    }

    pub fn log_only() -> Self {
        Self::new(Arc::new(LogNotifier))
    }

    pub fn send(&self, event: ClaimEvent) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&event).await {
                error!(
                    event = event.kind(),
                    prize_id = %event.prize_id(),
                    error = %e,
                    "审计通知发送失败"
                );
            }
        });
    }
}
