//! 对账 Worker
//!
//! 定期处理领取流程遗留的不一致状态：
//! 1. 礼品已发出但账本未确认的记录：重新标记 claimed 并删除账本记录
//! 2. 长时间停留在 claiming 的记录：告警，按配置回退到 pending；
//!    已开始发送、结果未知的记录永远不自动回退
//! 3. 清理超过保留期的本地记录

use std::time::Duration;

use gift_shared::config::ReconcilerConfig;
use gift_shared::observability::metrics;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::clients::ClientError;
use crate::context::AppContext;
use crate::models::{PrizeRecord, PrizeStatus};

/// 单次对账结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// 本轮确认的已发出记录
    pub settled: usize,
    /// 仍未能确认的已发出记录
    pub unsettled: usize,
    /// 发现的滞留 claiming 记录
    pub stale_claims: usize,
    /// 回退到 pending 的记录
    pub reverted: usize,
    /// 发送结果未知、拒绝回退的记录
    pub dispatch_unknown: usize,
    /// 清理的本地记录
    pub cleaned: usize,
}

/// 对账 Worker
pub struct ReconcileWorker {
    ctx: AppContext,
    poll_interval: Duration,
    stale_after: chrono::Duration,
    revert_stale_claims: bool,
    retention_days: i64,
}

impl ReconcileWorker {
    pub fn new(ctx: AppContext, config: &ReconcilerConfig) -> Self {
        Self {
            ctx,
            poll_interval: Duration::from_secs(config.interval_secs.max(1)),
            stale_after: chrono::Duration::seconds(config.stale_claim_after_secs as i64),
            revert_stale_claims: config.revert_stale_claims,
            retention_days: config.retention_days,
        }
    }

    /// 主循环：持续对账直到进程退出
    pub async fn run(&self) {
        info!(
            poll_interval = ?self.poll_interval,
            stale_after_secs = self.stale_after.num_seconds(),
            revert_stale_claims = self.revert_stale_claims,
            "ReconcileWorker 已启动"
        );

        loop {
            tokio::time::sleep(self.poll_interval).await;

            let report = self.run_once().await;
            if report != ReconcileReport::default() {
                info!(?report, "对账完成");
            }

            metrics::set_worker_last_run("reconcile_worker");
        }
    }

    /// 执行一轮对账
    pub async fn run_once(&self) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        self.settle_dispatches(&mut report).await;
        self.process_stale_claims(&mut report).await;

        match self.ctx.catalog.cleanup(self.retention_days).await {
            Ok(cleaned) => report.cleaned = cleaned,
            Err(e) => error!(error = %e, "清理本地记录出错"),
        }

        report
    }

    /// 已发出但账本未确认的记录
    ///
    /// 账本记录不存在视为已确认
    async fn settle_dispatches(&self, report: &mut ReconcileReport) {
        for record in self.ctx.catalog.list_unsettled_dispatches().await {
            if self.ctx.in_flight.is_in_flight(&record.prize_id) {
                continue;
            }

            let ledger = &self.ctx.ledger;
            let finalize = ledger
                .patch_status(&record.prize_id, PrizeStatus::Claimed, None)
                .await;
            let cleanup = ledger.delete_prize(&record.prize_id).await;

            let settled = matches!(
                (&finalize, &cleanup),
                (_, Ok(())) | (_, Err(ClientError::NotFound(_))) | (Ok(()), _)
            );

            if !settled {
                report.unsettled += 1;
                warn!(
                    reconcile = "ledger_stale",
                    prize_id = %record.prize_id,
                    finalize_error = ?finalize.err(),
                    cleanup_error = ?cleanup.err(),
                    "账本仍无法确认，下一轮重试"
                );
                continue;
            }

            match self.ctx.catalog.mark_ledger_settled(&record.prize_id).await {
                Ok(()) => {
                    report.settled += 1;
                    info!(prize_id = %record.prize_id, "账本已补确认");
                }
                Err(e) => error!(prize_id = %record.prize_id, error = %e, "标记账本已确认失败"),
            }
        }
    }

    /// 长时间停留在 claiming 的记录
    async fn process_stale_claims(&self, report: &mut ReconcileReport) {
        for record in self.ctx.catalog.list_stale_claims(self.stale_after).await {
            if self.ctx.in_flight.is_in_flight(&record.prize_id) {
                continue;
            }
            report.stale_claims += 1;

            match self.ctx.ledger.fetch_prize(&record.prize_id).await {
                Ok(prize)
                    if prize.status == PrizeStatus::Claiming
                        && record.dispatch_outcome_unknown() =>
                {
                    // 回退会让奖品再次可领，礼品可能被发送两次
                    report.dispatch_unknown += 1;
                    error!(
                        reconcile = "dispatch_unknown",
                        prize_id = %record.prize_id,
                        user_id = %record.owner_user_id,
                        dispatch_started_at = ?record.dispatch_started_at,
                        "礼品可能已发出，奖品保持 claiming，需要人工确认"
                    );
                }
                Ok(prize) if prize.status == PrizeStatus::Claiming => {
                    if self.revert_stale_claims && self.revert(&record).await {
                        report.reverted += 1;
                    } else {
                        warn!(
                            reconcile = "stale_claim",
                            prize_id = %record.prize_id,
                            user_id = %record.owner_user_id,
                            since = %record.updated_at,
                            "奖品长时间停留在 claiming，需要人工确认"
                        );
                    }
                }
                Ok(prize) => {
                    // 账本已推进，本地镜像跟随
                    self.mirror(&record.prize_id, prize.status, prize.error_message)
                        .await;
                }
                Err(ClientError::NotFound(_)) => {
                    warn!(
                        reconcile = "stale_claim",
                        prize_id = %record.prize_id,
                        "账本记录已不存在，本地记录停留在 claiming"
                    );
                }
                Err(e) => {
                    warn!(prize_id = %record.prize_id, error = %e, "查询账本失败，下一轮重试");
                }
            }
        }
    }

    async fn revert(&self, record: &PrizeRecord) -> bool {
        let reason = "Stale claim reverted by reconciler".to_string();
        if let Err(e) = self
            .ctx
            .ledger
            .patch_status(&record.prize_id, PrizeStatus::Pending, Some(reason.clone()))
            .await
        {
            error!(prize_id = %record.prize_id, error = %e, "回退滞留奖品失败");
            return false;
        }

        info!(prize_id = %record.prize_id, "滞留奖品已回退到 pending");
        self.mirror(&record.prize_id, PrizeStatus::Pending, Some(reason))
            .await;
        true
    }

    async fn mirror(&self, prize_id: &str, status: PrizeStatus, error_message: Option<String>) {
        if let Err(e) = self
            .ctx
            .catalog
            .update_local_prize_status(prize_id, status, error_message)
            .await
        {
            warn!(prize_id, error = %e, "同步本地奖品状态失败");
        }
    }
}
