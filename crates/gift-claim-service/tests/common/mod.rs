//! 集成测试共用的内存替身
//!
//! - `FakeLedger`: 带比较并交换语义的账本，记录所有写操作
//! - `FakeProvider`: 按价目表扣减余额的礼品渠道，记录发送次数

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gift_claim::catalog::GiftCatalogStore;
use gift_claim::clients::{ClientError, DispatchConfirmation, GiftProviderClient, PrizeLedgerClient};
use gift_claim::context::{AppContext, ClaimOptions};
use gift_claim::models::{GiftUpsert, LedgerPrize, PrizeStatus};
use gift_claim::notification::NotificationSender;
use gift_claim::service::ClaimCoordinator;
use tempfile::TempDir;

pub const HEART_ID: &str = "pid-heart";

// ==================== FakeLedger ====================

#[derive(Default)]
pub struct FakeLedger {
    prizes: Mutex<HashMap<String, LedgerPrize>>,
    /// 写操作记录：(prize_id, 目标状态)，删除记为 None
    writes: Mutex<Vec<(String, Option<PrizeStatus>)>>,
    /// 为 true 时 claimed 标记和删除都返回暂时性故障
    pub fail_finalize: AtomicBool,
}

impl FakeLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, prize_id: &str, user_id: &str, status: PrizeStatus) {
        self.prizes.lock().unwrap().insert(
            prize_id.to_string(),
            LedgerPrize {
                id: prize_id.to_string(),
                user_id: user_id.to_string(),
                status,
                gift_name: Some("Heart".to_string()),
                claim_token: None,
                error_message: None,
            },
        );
    }

    pub fn get(&self, prize_id: &str) -> Option<LedgerPrize> {
        self.prizes.lock().unwrap().get(prize_id).cloned()
    }

    pub fn status(&self, prize_id: &str) -> Option<PrizeStatus> {
        self.get(prize_id).map(|p| p.status)
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    fn record(&self, prize_id: &str, status: Option<PrizeStatus>) {
        self.writes
            .lock()
            .unwrap()
            .push((prize_id.to_string(), status));
    }
}

#[async_trait]
impl PrizeLedgerClient for FakeLedger {
    async fn fetch_prize(&self, prize_id: &str) -> Result<LedgerPrize, ClientError> {
        // 让出执行权，使并发领取在查询和加锁之间交错
        tokio::task::yield_now().await;
        self.get(prize_id)
            .ok_or_else(|| ClientError::NotFound(format!("prize {prize_id}")))
    }

    async fn lock_prize(&self, prize_id: &str, claim_token: &str) -> Result<(), ClientError> {
        self.record(prize_id, Some(PrizeStatus::Claiming));
        let mut prizes = self.prizes.lock().unwrap();
        let prize = prizes
            .get_mut(prize_id)
            .ok_or_else(|| ClientError::NotFound(format!("prize {prize_id}")))?;

        if prize.status != PrizeStatus::Pending {
            return Err(ClientError::Conflict(format!("status is {}", prize.status)));
        }
        prize.status = PrizeStatus::Claiming;
        prize.claim_token = Some(claim_token.to_string());
        Ok(())
    }

    async fn patch_status(
        &self,
        prize_id: &str,
        status: PrizeStatus,
        error_message: Option<String>,
    ) -> Result<(), ClientError> {
        self.record(prize_id, Some(status));
        if status == PrizeStatus::Claimed && self.fail_finalize.load(Ordering::SeqCst) {
            return Err(ClientError::Transient("ledger unavailable".into()));
        }

        let mut prizes = self.prizes.lock().unwrap();
        let prize = prizes
            .get_mut(prize_id)
            .ok_or_else(|| ClientError::NotFound(format!("prize {prize_id}")))?;
        prize.status = status;
        if status == PrizeStatus::Pending {
            prize.claim_token = None;
        }
        if error_message.is_some() {
            prize.error_message = error_message;
        }
        Ok(())
    }

    async fn delete_prize(&self, prize_id: &str) -> Result<(), ClientError> {
        self.record(prize_id, None);
        if self.fail_finalize.load(Ordering::SeqCst) {
            return Err(ClientError::Transient("ledger unavailable".into()));
        }
        self.prizes
            .lock()
            .unwrap()
            .remove(prize_id)
            .map(|_| ())
            .ok_or_else(|| ClientError::NotFound(format!("prize {prize_id}")))
    }
}

// ==================== FakeProvider ====================

pub struct FakeProvider {
    pub balance: AtomicI64,
    pub sends: AtomicU32,
    pub fail_send: AtomicBool,
    /// 每次发送前的等待时间
    pub send_delay: Mutex<Duration>,
    /// 发送成功后在该位置创建目录，用来让后续的目录文件写入失败
    block_after_send: Mutex<Option<PathBuf>>,
    prices: HashMap<String, i64>,
}

impl FakeProvider {
    pub fn new(balance: i64) -> Arc<Self> {
        Arc::new(Self {
            balance: AtomicI64::new(balance),
            sends: AtomicU32::new(0),
            fail_send: AtomicBool::new(false),
            send_delay: Mutex::new(Duration::ZERO),
            block_after_send: Mutex::new(None),
            prices: HashMap::from([(HEART_ID.to_string(), 15)]),
        })
    }

    pub fn send_count(&self) -> u32 {
        self.sends.load(Ordering::SeqCst)
    }

    pub fn set_send_delay(&self, delay: Duration) {
        *self.send_delay.lock().unwrap() = delay;
    }

    pub fn block_path_after_send(&self, path: PathBuf) {
        *self.block_after_send.lock().unwrap() = Some(path);
    }
}

#[async_trait]
impl GiftProviderClient for FakeProvider {
    async fn send_gift(
        &self,
        user_id: &str,
        provider_gift_id: &str,
        _message: &str,
    ) -> Result<DispatchConfirmation, ClientError> {
        self.sends.fetch_add(1, Ordering::SeqCst);

        let delay = *self.send_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.fail_send.load(Ordering::SeqCst) {
            return Err(ClientError::Permanent("STARGIFT_INVALID".into()));
        }
        let cost = self
            .prices
            .get(provider_gift_id)
            .copied()
            .ok_or_else(|| ClientError::Permanent("unknown gift".into()))?;
        if self.balance.fetch_sub(cost, Ordering::SeqCst) < cost {
            self.balance.fetch_add(cost, Ordering::SeqCst);
            return Err(ClientError::Permanent("BALANCE_TOO_LOW".into()));
        }

        if let Some(path) = self.block_after_send.lock().unwrap().take() {
            std::fs::create_dir(path).unwrap();
        }
        Ok(DispatchConfirmation::new(user_id, provider_gift_id))
    }

    async fn get_balance(&self) -> Result<i64, ClientError> {
        Ok(self.balance.load(Ordering::SeqCst))
    }
}

// ==================== 装配 ====================

pub struct Harness {
    pub dir: TempDir,
    pub ledger: Arc<FakeLedger>,
    pub provider: Arc<FakeProvider>,
    pub ctx: AppContext,
    pub coordinator: Arc<ClaimCoordinator>,
}

/// 目录中 Heart 映射到 `pid-heart`（15 星），Unmapped 没有渠道 ID
pub async fn harness(balance: i64, options: ClaimOptions) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let catalog = GiftCatalogStore::open_at(dir.path().join("catalog.json"), false)
        .await
        .unwrap();
    catalog
        .upsert(GiftUpsert::new("Heart", Some(HEART_ID), 15))
        .await
        .unwrap();
    catalog
        .upsert(GiftUpsert::new("Unmapped", None, 50))
        .await
        .unwrap();

    let ledger = FakeLedger::new();
    let provider = FakeProvider::new(balance);
    let ctx = AppContext::new(
        Arc::new(catalog),
        ledger.clone(),
        provider.clone(),
        NotificationSender::log_only(),
        options,
    );
    let coordinator = Arc::new(ClaimCoordinator::new(ctx.clone()));

    Harness {
        dir,
        ledger,
        provider,
        ctx,
        coordinator,
    }
}

pub fn fast_options() -> ClaimOptions {
    ClaimOptions {
        call_timeout: Duration::from_millis(500),
        ..ClaimOptions::default()
    }
}
