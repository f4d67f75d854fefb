//! 礼品映射管理测试套件

use crate::helpers::*;
use crate::setup::TestEnvironment;

#[cfg(test)]
mod mapping_tests {
    use super::*;

    /// 新增映射后立即可领取
    #[tokio::test]
    async fn test_new_mapping_is_claimable() {
        let env = TestEnvironment::setup().await.unwrap();
        env.provider.set_price("gift-rose-001", 25);

        let result = env
            .api
            .upsert_mapping("Rose", Some("gift-rose-001"), 25)
            .await
            .unwrap();
        assert!(result.is_success(), "{}", result.body);
        assert_eq!(result.body["data"]["providerGiftId"], "gift-rose-001");

        env.seed_prize("p-600", "12345", "Rose");
        assert_claim_succeeded(&env.api.claim("12345", "p-600", "Rose").await.unwrap());
        assert_eq!(env.mock.balance().await.unwrap(), 975);
    }

    /// 清空渠道 ID 后领取失败并回退
    #[tokio::test]
    async fn test_unmapping_gift_blocks_claims() {
        let env = TestEnvironment::setup().await.unwrap();

        let result = env.api.upsert_mapping("Heart", None, 15).await.unwrap();
        assert!(result.is_success(), "{}", result.body);

        let status = env.api.status().await.unwrap();
        let mapped_before = status.body["data"]["mappedGifts"].as_u64().unwrap();
        assert!(mapped_before > 0);

        env.seed_prize("p-601", "12345", "Heart");
        let claim = env.api.claim("12345", "p-601", "Heart").await.unwrap();
        assert_claim_failed(&claim, 500, "GIFT_MAPPING_ERROR");
        assert_ledger_status(&env.mock.ledger_prize("p-601").await.unwrap(), "pending");
    }

    /// 渠道 ID 不能被两个礼品共用
    #[tokio::test]
    async fn test_duplicate_provider_id_rejected() {
        let env = TestEnvironment::setup().await.unwrap();

        let result = env
            .api
            .upsert_mapping("Rose", Some("d01a849b9ef17642d8f4"), 25)
            .await
            .unwrap();
        assert_eq!(result.status.as_u16(), 409);
        assert_eq!(result.code(), Some("PROVIDER_ID_CONFLICT"));

        let mappings = env.api.mappings().await.unwrap();
        let names: Vec<&str> = mappings.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|g| g["name"].as_str())
            .collect();
        assert!(!names.contains(&"Rose"));
    }
}
