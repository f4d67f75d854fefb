//! 领取流程测试套件
//!
//! 通过真实 HTTP 调用验证领取全链路：账本加锁、渠道发放、账本收尾。

use crate::helpers::*;
use crate::setup::{TestEnvConfig, TestEnvironment};

#[cfg(test)]
mod happy_path_tests {
    use super::*;

    /// 正常领取
    ///
    /// 1. 账本中创建 pending 奖品
    /// 2. 奖品所有者发起领取
    /// 3. 渠道扣减 15 星并记录发放
    /// 4. 账本记录被删除，本地记录为 sent
    #[tokio::test]
    async fn test_claim_heart_end_to_end() {
        let env = TestEnvironment::setup().await.unwrap();
        env.seed_prize("p-100", "12345", "Heart");

        let result = env.api.claim("12345", "p-100", "Heart").await.unwrap();
        assert_claim_succeeded(&result);
        assert_eq!(result.body["starCost"], 15);
        assert_eq!(result.body["giftName"], "Heart");

        assert_eq!(env.mock.balance().await.unwrap(), 985);
        let sent = env.mock.sent_gifts().await.unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["user_id"], "12345");
        assert_eq!(sent[0]["gift_id"], "d01a849b9ef17642d8f4");
        assert!(sent[0]["text"].as_str().unwrap().contains("p-100"));

        assert!(env.mock.ledger_prize("p-100").await.unwrap().is_none());

        let prizes = env.api.user_prizes("12345").await.unwrap();
        assert_eq!(prizes.body["data"][0]["status"], "sent");

        let status = env.api.status().await.unwrap();
        assert_eq!(status.body["data"]["balance"], 985);
        assert_eq!(status.body["data"]["stats"]["totalStarsSpent"], 15);
    }

    /// 使用渠道礼品 ID 领取
    #[tokio::test]
    async fn test_claim_by_provider_gift_id() {
        let env = TestEnvironment::setup().await.unwrap();
        env.seed_prize("p-101", "12345", "Heart");

        let result = env
            .api
            .claim("12345", "p-101", "d01a849b9ef17642d8f4")
            .await
            .unwrap();
        assert_claim_succeeded(&result);
        assert_eq!(result.body["giftName"], "Heart");
    }
}

#[cfg(test)]
mod duplicate_claim_tests {
    use super::*;

    /// 并发重复领取只发放一次
    #[tokio::test]
    async fn test_concurrent_claims_dispatch_once() {
        let env = TestEnvironment::setup().await.unwrap();
        env.seed_prize("p-200", "12345", "Heart");

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let api = env.api.clone();
                tokio::spawn(async move { api.claim("12345", "p-200", "Heart").await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            if result.is_success() {
                successes += 1;
            } else {
                // 领取进行中为 409，领取完成后账本记录已删除为 404
                assert!(
                    matches!(
                        result.code(),
                        Some("PRIZE_STATUS_CONFLICT") | Some("PRIZE_NOT_FOUND")
                    ),
                    "unexpected response: {}",
                    result.body
                );
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(env.mock.sent_gifts().await.unwrap().len(), 1);
        assert_eq!(env.mock.balance().await.unwrap(), 985);
    }

    /// 领取成功后再次领取
    #[tokio::test]
    async fn test_repeat_claim_after_success() {
        let env = TestEnvironment::setup().await.unwrap();
        env.seed_prize("p-201", "12345", "Heart");

        assert_claim_succeeded(&env.api.claim("12345", "p-201", "Heart").await.unwrap());

        let again = env.api.claim("12345", "p-201", "Heart").await.unwrap();
        assert_claim_failed(&again, 404, "PRIZE_NOT_FOUND");
        assert_eq!(env.mock.sent_gifts().await.unwrap().len(), 1);
    }
}

#[cfg(test)]
mod rejection_tests {
    use super::*;

    /// 非所有者领取不产生任何写入
    #[tokio::test]
    async fn test_non_owner_is_forbidden() {
        let env = TestEnvironment::setup().await.unwrap();
        env.seed_prize("p-300", "12345", "Heart");

        let result = env.api.claim("99999", "p-300", "Heart").await.unwrap();
        assert_claim_failed(&result, 403, "OWNERSHIP_MISMATCH");

        let prize = env.mock.ledger_prize("p-300").await.unwrap();
        assert_ledger_status(&prize, "pending");
        assert!(env.mock.sent_gifts().await.unwrap().is_empty());
    }

    /// 礼品不在映射中：回退到 pending，可修复后重领
    #[tokio::test]
    async fn test_unknown_gift_reverts_to_pending() {
        let env = TestEnvironment::setup().await.unwrap();
        env.seed_prize("p-301", "12345", "Unicorn");

        let result = env.api.claim("12345", "p-301", "Unicorn").await.unwrap();
        assert_claim_failed(&result, 500, "GIFT_MAPPING_ERROR");

        let prize = env.mock.ledger_prize("p-301").await.unwrap();
        assert_ledger_status(&prize, "pending");
        assert!(
            prize.unwrap()["error_message"]
                .as_str()
                .unwrap()
                .contains("Unicorn")
        );

        let retry = env.api.claim("12345", "p-301", "Heart").await.unwrap();
        assert_claim_succeeded(&retry);
    }

    /// 余额不足：保持 claiming，不发放
    #[tokio::test]
    async fn test_insufficient_balance_keeps_claiming() {
        let env = TestEnvironment::setup_with_config(TestEnvConfig::with_balance(10))
            .await
            .unwrap();
        env.seed_prize("p-302", "12345", "Heart");

        let result = env.api.claim("12345", "p-302", "Heart").await.unwrap();
        assert_claim_failed(&result, 400, "INSUFFICIENT_BALANCE");

        let prize = env.mock.ledger_prize("p-302").await.unwrap();
        assert_ledger_status(&prize, "claiming");
        assert!(env.mock.sent_gifts().await.unwrap().is_empty());

        // 充值后也不会自动重领，需要人工处理 claiming 记录
        env.mock.top_up(100).await.unwrap();
        let again = env.api.claim("12345", "p-302", "Heart").await.unwrap();
        assert_claim_failed(&again, 409, "PRIZE_STATUS_CONFLICT");
    }

    /// 余额不足且配置了回退：充值后可重领
    #[tokio::test]
    async fn test_insufficient_balance_revert_allows_retry() {
        let env = TestEnvironment::setup_with_config(TestEnvConfig {
            initial_balance: 10,
            revert_on_insufficient_balance: true,
            ..Default::default()
        })
        .await
        .unwrap();
        env.seed_prize("p-303", "12345", "Heart");

        let result = env.api.claim("12345", "p-303", "Heart").await.unwrap();
        assert_claim_failed(&result, 400, "INSUFFICIENT_BALANCE");
        assert_ledger_status(&env.mock.ledger_prize("p-303").await.unwrap(), "pending");

        assert_eq!(env.mock.top_up(100).await.unwrap(), 110);
        assert_claim_succeeded(&env.api.claim("12345", "p-303", "Heart").await.unwrap());
        assert_eq!(env.mock.balance().await.unwrap(), 95);
    }
}

#[cfg(test)]
mod provider_failure_tests {
    use super::*;

    /// 渠道发送失败：账本标记 failed，不自动重试
    #[tokio::test]
    async fn test_dispatch_failure_marks_failed() {
        let env = TestEnvironment::setup().await.unwrap();
        env.seed_prize("p-400", "12345", "Heart");
        env.mock.fail_next_sends(1, 500).await.unwrap();

        let result = env.api.claim("12345", "p-400", "Heart").await.unwrap();
        assert_claim_failed(&result, 500, "DISPATCH_FAILED");

        let prize = env.mock.ledger_prize("p-400").await.unwrap();
        assert_ledger_status(&prize, "failed");
        assert_eq!(env.mock.balance().await.unwrap(), 1000);

        // failed 是终态
        let again = env.api.claim("12345", "p-400", "Heart").await.unwrap();
        assert_claim_failed(&again, 409, "PRIZE_STATUS_CONFLICT");
        assert!(env.mock.sent_gifts().await.unwrap().is_empty());
    }
}
