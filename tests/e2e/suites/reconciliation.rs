//! 对账测试套件
//!
//! 验证对账 Worker 对滞留 claiming 记录的处理。

use gift_shared::config::ReconcilerConfig;
use mock_services::models::PrizeState;

use crate::helpers::*;
use crate::setup::{TestEnvConfig, TestEnvironment};

fn immediate_reconciler(revert_stale_claims: bool) -> ReconcilerConfig {
    ReconcilerConfig {
        stale_claim_after_secs: 0,
        revert_stale_claims,
        ..Default::default()
    }
}

/// 准备一条停留在 claiming 的奖品（余额不足）
async fn stuck_claim(env: &TestEnvironment, prize_id: &str) {
    env.seed_prize(prize_id, "12345", "Heart");
    let result = env.api.claim("12345", prize_id, "Heart").await.unwrap();
    assert_claim_failed(&result, 400, "INSUFFICIENT_BALANCE");
}

#[cfg(test)]
mod stale_claim_tests {
    use super::*;
    use gift_claim::ReconcileWorker;

    #[tokio::test]
    async fn test_stale_claim_reverted_when_enabled() {
        let env = TestEnvironment::setup_with_config(TestEnvConfig::with_balance(0))
            .await
            .unwrap();
        stuck_claim(&env, "p-500").await;

        let worker = ReconcileWorker::new(env.ctx.clone(), &immediate_reconciler(true));
        let report = worker.run_once().await;
        assert_eq!(report.stale_claims, 1);
        assert_eq!(report.reverted, 1);

        assert_ledger_status(&env.mock.ledger_prize("p-500").await.unwrap(), "pending");
        let pending = env.api.pending_prizes().await.unwrap();
        assert_eq!(pending.body["data"][0]["prizeId"], "p-500");

        env.mock.top_up(50).await.unwrap();
        assert_claim_succeeded(&env.api.claim("12345", "p-500", "Heart").await.unwrap());
    }

    #[tokio::test]
    async fn test_stale_claim_left_alone_by_default() {
        let env = TestEnvironment::setup_with_config(TestEnvConfig::with_balance(0))
            .await
            .unwrap();
        stuck_claim(&env, "p-501").await;

        let worker = ReconcileWorker::new(env.ctx.clone(), &immediate_reconciler(false));
        let report = worker.run_once().await;
        assert_eq!(report.stale_claims, 1);
        assert_eq!(report.reverted, 0);

        assert_ledger_status(&env.mock.ledger_prize("p-501").await.unwrap(), "claiming");
    }

    /// 账本已被人工处理为 failed，本地镜像跟随
    #[tokio::test]
    async fn test_local_record_follows_ledger() {
        let env = TestEnvironment::setup_with_config(TestEnvConfig::with_balance(0))
            .await
            .unwrap();
        stuck_claim(&env, "p-502").await;

        env.ledger.prizes.update("p-502", |prize| {
            prize.status = PrizeState::Failed;
            prize.error_message = Some("cancelled by operator".to_string());
        });

        let report = env.reconciler().run_once().await;
        // 默认配置 15 分钟后才算滞留
        assert_eq!(report.stale_claims, 0);

        ReconcileWorker::new(env.ctx.clone(), &immediate_reconciler(false))
            .run_once()
            .await;

        let prizes = env.api.user_prizes("12345").await.unwrap();
        let record = &prizes.body["data"][0];
        assert_eq!(record["status"], "failed");
        assert_eq!(record["errorMessage"], "cancelled by operator");
    }
}
