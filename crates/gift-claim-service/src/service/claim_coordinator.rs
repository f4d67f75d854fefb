//! 礼品领取协调器
//!
//! 编排一次领取的完整流程：
//!
//! 1. 参数校验 -> 2. 查询账本 -> 3. 所有者校验 -> 4. 状态校验
//!    -> 5. 加锁（pending -> claiming） -> 6. 解析礼品映射 -> 7. 余额校验
//!    -> 8. 落盘发送标记并发送礼品 -> 9. 标记 claimed -> 10. 删除账本记录 -> 11. 记录统计
//!
//! 发送之前的失败不会发出礼品；发送失败把奖品置为 failed；
//! 发送成功后的账本和本地更新都是尽力而为，失败时记录“礼品已发出但账本未更新”。

use std::future::Future;
use std::time::{Duration, Instant};

use gift_shared::observability::metrics;
use gift_shared::retry::{RetryPolicy, retry_with_policy};
use tracing::{error, info, instrument, warn};

use crate::catalog::DispatchRecord;
use crate::clients::{ClientError, DispatchConfirmation};
use crate::context::AppContext;
use crate::error::{CatalogError, ClaimError, Result};
use crate::models::{GiftDefinition, LedgerPrize, PrizeStatus};
use crate::notification::ClaimEvent;
use crate::service::dto::{ClaimRequest, ClaimSuccess};

/// 发送成功后本地统计写入的重试次数
const RECORD_DISPATCH_RETRIES: u32 = 2;
const RECORD_DISPATCH_RETRY_DELAY: Duration = Duration::from_millis(50);

/// 礼品领取协调器
///
/// 自身不持有状态，所有持久化都经由目录存储或账本客户端完成
pub struct ClaimCoordinator {
    ctx: AppContext,
}

/// 校验后的请求参数
struct ValidatedClaim<'a> {
    user_id: &'a str,
    prize_id: &'a str,
    gift: &'a str,
}

impl ClaimCoordinator {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// 领取礼品
    ///
    /// 所有外部调用错误都在这里转换为 `ClaimError`，不会向上抛出传输层错误
    #[instrument(
        skip(self, request),
        fields(prize_id = %request.prize_id, user_id = %request.user_id, gift = %request.gift_name)
    )]
    pub async fn claim_gift(&self, request: &ClaimRequest) -> Result<ClaimSuccess> {
        let start = Instant::now();
        let result = self.run_claim(request).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.error_code(),
        };
        metrics::record_claim(outcome, start.elapsed().as_secs_f64());

        if let Err(e) = &result {
            warn!(code = e.error_code(), error = %e, "礼品领取失败");
        }
        result
    }

    async fn run_claim(&self, request: &ClaimRequest) -> Result<ClaimSuccess> {
        // 1. 参数校验
        let claim = validate(request)?;
        let ValidatedClaim {
            user_id,
            prize_id,
            gift,
        } = claim;

        // 2. 查询账本
        let prize = self.fetch_prize(prize_id).await.inspect_err(|e| {
            if matches!(e, ClaimError::PrizeNotFound(_)) {
                self.notify_failed(user_id, prize_id, gift, "Prize not found in ledger");
            }
        })?;

        // 3. 所有者校验，先于状态和映射校验
        if !prize.is_owned_by(user_id) {
            warn!(owner = %prize.user_id, "奖品所有者不匹配");
            self.notify_failed(user_id, prize_id, gift, "Ownership mismatch");
            return Err(ClaimError::Ownership {
                prize_id: prize_id.to_string(),
            });
        }

        // 4. 状态校验
        if prize.status != PrizeStatus::Pending {
            return Err(ClaimError::Conflict {
                prize_id: prize_id.to_string(),
                status: prize.status,
            });
        }

        // 5. 加锁：先占进程内位置，再对账本做 pending -> claiming
        let Some(guard) = self.ctx.in_flight.try_acquire(prize_id) else {
            return Err(ClaimError::Conflict {
                prize_id: prize_id.to_string(),
                status: PrizeStatus::Claiming,
            });
        };
        self.lock_prize(prize_id, guard.token()).await?;
        info!("奖品已锁定 (claiming)");

        // 5.1 本地镜像登记，失败不影响领取
        let local_gift_name = prize.gift_name.as_deref().unwrap_or(gift);
        if let Err(e) = self
            .ctx
            .catalog
            .record_prize_locally(prize_id, local_gift_name, user_id, PrizeStatus::Claiming)
            .await
        {
            warn!(error = %e, "本地奖品登记失败");
        }

        // 6. 解析礼品映射
        let (definition, provider_gift_id) = match self.resolve_gift(gift).await {
            Ok(resolved) => resolved,
            Err(reason) => {
                self.revert_to_pending(prize_id, &reason).await;
                self.notify_failed(user_id, prize_id, gift, &reason);
                return Err(ClaimError::Mapping(reason));
            }
        };
        info!(
            gift_name = %definition.name,
            star_cost = definition.star_cost,
            provider_gift_id = %provider_gift_id,
            "礼品映射已解析"
        );

        // 7. 余额校验
        self.check_balance(user_id, prize_id, &definition).await?;

        // 8. 落盘发送标记后发送礼品
        self.mark_dispatch_started(user_id, prize_id, &definition).await?;
        let confirmation = self
            .dispatch(user_id, prize_id, &definition, &provider_gift_id)
            .await?;

        // 9-10. 账本收尾（尽力而为）
        let ledger_settled = self.finalize_ledger(user_id, prize_id, &definition).await;

        // 11. 记录统计，与本地状态 sent 同一次写入
        let dispatch = DispatchRecord {
            prize_id: prize_id.to_string(),
            gift_name: definition.name.clone(),
            owner_user_id: user_id.to_string(),
            star_cost: definition.star_cost,
            provider_gift_id: provider_gift_id.clone(),
            ledger_settled,
        };
        self.record_dispatch(&dispatch, &definition).await;
        metrics::record_gift_dispatched(&definition.name, definition.star_cost);

        // 12. 刷新余额并发送审计通知
        let balance_after = match self.call("get_balance", self.ctx.provider.get_balance()).await {
            Ok(balance) => {
                metrics::set_star_balance(balance);
                Some(balance)
            }
            Err(e) => {
                warn!(error = %e, "发送后刷新余额失败");
                None
            }
        };
        self.ctx.notifier.send(ClaimEvent::claimed(
            user_id,
            prize_id,
            &definition.name,
            definition.star_cost,
            balance_after,
        ));

        info!(
            reference = %confirmation.reference,
            ledger_settled,
            "礼品领取完成"
        );

        drop(guard);
        Ok(ClaimSuccess {
            prize_id: prize_id.to_string(),
            gift_name: definition.name,
            star_cost: definition.star_cost,
            dispatch_confirmation: confirmation,
            ledger_settled,
        })
    }

    // ------------------------------------------------------------------
    // 各步骤实现
    // ------------------------------------------------------------------

    async fn fetch_prize(&self, prize_id: &str) -> Result<LedgerPrize> {
        self.call("fetch_prize", self.ctx.ledger.fetch_prize(prize_id))
            .await
            .map_err(|e| match e {
                ClientError::NotFound(_) => ClaimError::PrizeNotFound(prize_id.to_string()),
                other => ClaimError::LedgerUnavailable(other.to_string()),
            })
    }

    /// 账本加锁并复核
    ///
    /// 加锁成功后立即重新查询：状态不是 claiming 或凭证不是本次请求的，
    /// 说明其他请求抢先推进了状态，放弃本次领取。
    async fn lock_prize(&self, prize_id: &str, claim_token: &str) -> Result<()> {
        match self
            .call("lock_prize", self.ctx.ledger.lock_prize(prize_id, claim_token))
            .await
        {
            Ok(()) => {}
            Err(ClientError::Conflict(detail)) => {
                info!(detail = %detail, "账本拒绝加锁，奖品已被其他请求锁定");
                return Err(ClaimError::Conflict {
                    prize_id: prize_id.to_string(),
                    status: PrizeStatus::Claiming,
                });
            }
            Err(ClientError::NotFound(_)) => {
                return Err(ClaimError::PrizeNotFound(prize_id.to_string()));
            }
            Err(e) => {
                // 超时的加锁请求可能已经生效，若锁属于本次请求则释放
                self.release_own_lock(prize_id, claim_token).await;
                return Err(ClaimError::LockFailure(e.to_string()));
            }
        }

        match self.call("fetch_prize", self.ctx.ledger.fetch_prize(prize_id)).await {
            Ok(current) => {
                let token_matches = current
                    .claim_token
                    .as_deref()
                    .is_none_or(|token| token == claim_token);

                if current.status != PrizeStatus::Claiming || !token_matches {
                    warn!(
                        status = %current.status,
                        token_matches,
                        "加锁后复核失败，奖品已被其他请求推进"
                    );
                    return Err(ClaimError::Conflict {
                        prize_id: prize_id.to_string(),
                        status: current.status,
                    });
                }
                Ok(())
            }
            Err(e) => {
                self.revert_to_pending(prize_id, "Lock verification failed").await;
                Err(ClaimError::LockFailure(format!("加锁复核失败: {}", e)))
            }
        }
    }

    async fn release_own_lock(&self, prize_id: &str, claim_token: &str) {
        let Ok(current) = self.call("fetch_prize", self.ctx.ledger.fetch_prize(prize_id)).await
        else {
            return;
        };
        if current.status == PrizeStatus::Claiming
            && current.claim_token.as_deref() == Some(claim_token)
        {
            self.revert_to_pending(prize_id, "Lock request timed out").await;
        }
    }

    /// 先按名称、再按渠道礼品 ID 查找；缺少渠道 ID 的映射视为不可用
    async fn resolve_gift(
        &self,
        gift: &str,
    ) -> std::result::Result<(GiftDefinition, String), String> {
        let Some(definition) = self.ctx.catalog.resolve_any(gift).await else {
            return Err(format!("Gift \"{}\" not found in mappings", gift));
        };

        match definition.provider_gift_id.clone() {
            Some(provider_gift_id) if definition.is_mapped() => Ok((definition, provider_gift_id)),
            _ => Err(format!(
                "Gift \"{}\" has no provider gift id",
                definition.name
            )),
        }
    }

    /// 余额不足时默认保留 claiming 状态，交给对账任务处理
    async fn check_balance(
        &self,
        user_id: &str,
        prize_id: &str,
        definition: &GiftDefinition,
    ) -> Result<()> {
        let balance = match self.call("get_balance", self.ctx.provider.get_balance()).await {
            Ok(balance) => balance,
            Err(e) => {
                let reason = format!("Balance query failed: {}", e);
                self.revert_to_pending(prize_id, &reason).await;
                return Err(ClaimError::ProviderUnavailable(e.to_string()));
            }
        };
        metrics::set_star_balance(balance);

        if balance >= i64::from(definition.star_cost) {
            return Ok(());
        }

        let reason = format!(
            "Insufficient balance: need {}, have {}",
            definition.star_cost, balance
        );
        if self.ctx.options.revert_on_insufficient_balance {
            self.revert_to_pending(prize_id, &reason).await;
        } else {
            warn!(
                reconcile = "stale_claim",
                balance,
                star_cost = definition.star_cost,
                "余额不足，奖品保持 claiming 状态"
            );
        }
        self.notify_failed(user_id, prize_id, &definition.name, &reason);

        Err(ClaimError::InsufficientBalance {
            required: definition.star_cost,
            available: balance,
        })
    }

    /// 标记写不进去就不发送，奖品回退到 pending
    async fn mark_dispatch_started(
        &self,
        user_id: &str,
        prize_id: &str,
        definition: &GiftDefinition,
    ) -> Result<()> {
        match self
            .ctx
            .catalog
            .mark_dispatch_started(prize_id, &definition.name, user_id)
            .await
        {
            Ok(_) => Ok(()),
            Err(CatalogError::AlreadyDispatched(_)) => {
                // 本地已记录发出而账本仍可领取，保持 claiming 交给人工确认
                warn!(reconcile = "stale_claim", "本地记录显示礼品已发出，拒绝再次发送");
                Err(ClaimError::Conflict {
                    prize_id: prize_id.to_string(),
                    status: PrizeStatus::Sent,
                })
            }
            Err(e) => {
                error!(error = %e, "发送标记写入失败，放弃发送");
                self.revert_to_pending(prize_id, &format!("Local store unavailable: {}", e))
                    .await;
                Err(ClaimError::LocalStore(e.to_string()))
            }
        }
    }

    /// 发送礼品
    ///
    /// 超时不视为成功；任何失败都把奖品置为 failed
    async fn dispatch(
        &self,
        user_id: &str,
        prize_id: &str,
        definition: &GiftDefinition,
        provider_gift_id: &str,
    ) -> Result<DispatchConfirmation> {
        let message = self
            .ctx
            .options
            .render_message(&definition.name, prize_id);

        info!("开始发送礼品");
        let send = self
            .ctx
            .provider
            .send_gift(user_id, provider_gift_id, &message);

        match self.call("send_gift", send).await {
            Ok(confirmation) => Ok(confirmation),
            Err(e) => {
                let reason = e.to_string();
                error!(error = %reason, "礼品发送失败");

                if let Err(patch_err) = self
                    .call(
                        "patch_status",
                        self.ctx.ledger.patch_status(
                            prize_id,
                            PrizeStatus::Failed,
                            Some(reason.clone()),
                        ),
                    )
                    .await
                {
                    error!(error = %patch_err, "奖品标记 failed 失败，保持 claiming");
                }
                self.update_local(prize_id, PrizeStatus::Failed, Some(reason.clone()))
                    .await;
                self.notify_failed(
                    user_id,
                    prize_id,
                    &definition.name,
                    &format!("Provider API: {}", reason),
                );

                Err(ClaimError::Dispatch(reason))
            }
        }
    }

    /// 标记 claimed 并删除账本记录，返回账本是否已确认
    async fn finalize_ledger(
        &self,
        user_id: &str,
        prize_id: &str,
        definition: &GiftDefinition,
    ) -> bool {
        let finalize = self
            .call(
                "patch_status",
                self.ctx
                    .ledger
                    .patch_status(prize_id, PrizeStatus::Claimed, None),
            )
            .await;
        if let Err(e) = &finalize {
            warn!(error = %e, "标记 claimed 失败（礼品已发出）");
        }

        let cleanup = self
            .call("delete_prize", self.ctx.ledger.delete_prize(prize_id))
            .await;
        if let Err(e) = &cleanup {
            warn!(error = %e, "删除账本记录失败（非致命）");
        }

        let settled = finalize.is_ok() || cleanup.is_ok();
        if !settled {
            let detail = match (finalize, cleanup) {
                (Err(f), Err(c)) => format!("finalize: {}; cleanup: {}", f, c),
                _ => String::new(),
            };
            self.report_ledger_stale(user_id, prize_id, definition, detail);
        }
        settled
    }

    /// 写入发送记录与统计，IO 故障按固定策略重试
    ///
    /// 最终失败时本地记录停留在带发送标记的 claiming，对账任务不会回退它
    async fn record_dispatch(&self, dispatch: &DispatchRecord, definition: &GiftDefinition) {
        let policy = RetryPolicy::new(RECORD_DISPATCH_RETRIES, RECORD_DISPATCH_RETRY_DELAY);
        let result = retry_with_policy(
            &policy,
            "record_dispatch",
            |e: &CatalogError| matches!(e, CatalogError::Io(_)),
            || self.ctx.catalog.record_dispatch(dispatch),
        )
        .await;

        if let Err(e) = result {
            self.report_ledger_stale(
                &dispatch.owner_user_id,
                &dispatch.prize_id,
                definition,
                format!("local: {}", e),
            );
        }
    }

    fn report_ledger_stale(
        &self,
        user_id: &str,
        prize_id: &str,
        definition: &GiftDefinition,
        detail: String,
    ) {
        error!(
            reconcile = "ledger_stale",
            star_cost = definition.star_cost,
            detail = %detail,
            "礼品已发出但账本未更新"
        );
        metrics::record_ledger_stale();
        self.ctx.notifier.send(ClaimEvent::ledger_stale(
            user_id,
            prize_id,
            &definition.name,
            definition.star_cost,
            detail,
        ));
    }

    // ------------------------------------------------------------------
    // 辅助方法
    // ------------------------------------------------------------------

    /// 为外部调用加超时，超时归为暂时性故障
    async fn call<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = std::result::Result<T, ClientError>>,
    ) -> std::result::Result<T, ClientError> {
        let timeout = self.ctx.options.call_timeout;
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Transient(format!(
                "{} 超时 ({}ms)",
                operation,
                timeout.as_millis()
            ))),
        }
    }

    /// 把账本回退到 pending（尽力而为），本地镜像同步
    async fn revert_to_pending(&self, prize_id: &str, reason: &str) {
        match self
            .call(
                "patch_status",
                self.ctx.ledger.patch_status(
                    prize_id,
                    PrizeStatus::Pending,
                    Some(reason.to_string()),
                ),
            )
            .await
        {
            Ok(()) => info!(reason = %reason, "奖品已回退到 pending"),
            Err(e) => error!(error = %e, reason = %reason, "奖品回退 pending 失败"),
        }
        self.update_local(prize_id, PrizeStatus::Pending, Some(reason.to_string()))
            .await;
    }

    async fn update_local(
        &self,
        prize_id: &str,
        status: PrizeStatus,
        error_message: Option<String>,
    ) {
        match self
            .ctx
            .catalog
            .update_local_prize_status(prize_id, status, error_message)
            .await
        {
            Ok(_) | Err(CatalogError::PrizeNotFound(_)) => {}
            Err(e) => warn!(error = %e, status = %status, "本地奖品状态更新失败"),
        }
    }

    fn notify_failed(&self, user_id: &str, prize_id: &str, gift: &str, reason: &str) {
        self.ctx
            .notifier
            .send(ClaimEvent::failed(user_id, prize_id, gift, reason));
    }
}

fn validate(request: &ClaimRequest) -> Result<ValidatedClaim<'_>> {
    let user_id = request.user_id.trim();
    let prize_id = request.prize_id.trim();
    let gift = request.gift_name.trim();

    let missing: Vec<&str> = [("userId", user_id), ("prizeId", prize_id), ("giftName", gift)]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(field, _)| field)
        .collect();

    if !missing.is_empty() {
        return Err(ClaimError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    Ok(ValidatedClaim {
        user_id,
        prize_id,
        gift,
    })
}
