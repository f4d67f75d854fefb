//! 礼品目录存储

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use gift_shared::config::CatalogConfig;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use super::document::{CatalogDocument, CatalogState, CatalogStats, GiftEntry};
use super::seed::DEFAULT_GIFTS;
use crate::error::CatalogError;
use crate::models::{
    GiftDefinition, GiftIdentifier, GiftUpsert, IdentifierKind, PrizeRecord, PrizeStatus,
};

type Result<T> = std::result::Result<T, CatalogError>;

/// 一次成功发送的记录
#[derive(Debug, Clone)]
pub struct DispatchRecord {
    pub prize_id: String,
    pub gift_name: String,
    pub owner_user_id: String,
    pub star_cost: u32,
    pub provider_gift_id: String,
    pub ledger_settled: bool,
}

/// 礼品目录存储
///
/// 进程内共享，写操作全部串行化
pub struct GiftCatalogStore {
    path: PathBuf,
    state: RwLock<CatalogState>,
}

impl GiftCatalogStore {
    /// 按配置打开目录文件
    pub async fn open(config: &CatalogConfig) -> Result<Self> {
        Self::open_at(&config.path, config.seed_defaults).await
    }

    /// 打开指定路径的目录文件，不存在时创建
    ///
    /// `seed_defaults` 为 true 时补齐内置礼品列表中缺失的名称
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open_at(path: impl AsRef<Path>, seed_defaults: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let doc = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<CatalogDocument>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("目录文件不存在，创建新文件");
                CatalogDocument::default()
            }
            Err(e) => return Err(e.into()),
        };

        let store = Self {
            path,
            state: RwLock::new(CatalogState::from_document(doc)),
        };

        let seeded = store
            .mutate(|state| {
                let mut seeded = 0usize;
                if seed_defaults {
                    for (name, provider_id, star_cost) in DEFAULT_GIFTS {
                        if state.doc.gifts.contains_key(*name)
                            || state.by_provider_id.contains_key(*provider_id)
                        {
                            continue;
                        }
                        apply_upsert(
                            state,
                            GiftUpsert::new(*name, Some(*provider_id), *star_cost),
                        )?;
                        seeded += 1;
                    }
                }
                Ok(seeded)
            })
            .await?;

        let gifts = store.state.read().await.doc.gifts.len();
        info!(gifts, seeded, "礼品目录已加载");

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // ------------------------------------------------------------------
    // 礼品映射
    // ------------------------------------------------------------------

    /// 按显式标识查找礼品
    pub async fn resolve(&self, identifier: &GiftIdentifier) -> Option<GiftDefinition> {
        let state = self.state.read().await;
        resolve_in(&state, identifier)
    }

    /// 先按名称、再按渠道礼品 ID 查找，先命中者生效
    pub async fn resolve_any(&self, value: &str) -> Option<GiftDefinition> {
        let state = self.state.read().await;
        resolve_in(&state, &GiftIdentifier::name(value))
            .or_else(|| resolve_in(&state, &GiftIdentifier::provider_id(value)))
    }

    /// 新增或更新礼品定义
    #[instrument(skip(self), fields(gift = %upsert.name))]
    pub async fn upsert(&self, upsert: GiftUpsert) -> Result<GiftDefinition> {
        let definition = self.mutate(|state| apply_upsert(state, upsert)).await?;
        info!(
            provider_gift_id = ?definition.provider_gift_id,
            star_cost = definition.star_cost,
            "礼品映射已更新"
        );
        Ok(definition)
    }

    pub async fn list_gifts(&self) -> Vec<GiftDefinition> {
        let state = self.state.read().await;
        state
            .doc
            .gifts
            .iter()
            .map(|(name, entry)| entry.to_definition(name))
            .collect()
    }

    pub async fn stats(&self) -> CatalogStats {
        let state = self.state.read().await;
        let doc = &state.doc;

        let gifts_total = doc.gifts.len();
        let gifts_mapped = doc
            .gifts
            .values()
            .filter(|g| g.provider_gift_id.is_some())
            .count();
        let count = |status: PrizeStatus| doc.prizes.values().filter(|p| p.status == status).count();

        CatalogStats {
            gifts_total,
            gifts_mapped,
            gifts_unmapped: gifts_total - gifts_mapped,
            mapped_percentage: if gifts_total == 0 {
                0
            } else {
                ((gifts_mapped as f64 / gifts_total as f64) * 100.0).round() as u32
            },
            prizes_total: doc.prizes.len(),
            prizes_pending: count(PrizeStatus::Pending),
            prizes_sent: count(PrizeStatus::Sent),
            prizes_failed: count(PrizeStatus::Failed),
            total_stars_value: doc
                .prizes
                .values()
                .filter(|p| p.status == PrizeStatus::Sent)
                .filter_map(|p| p.star_cost)
                .map(u64::from)
                .sum(),
            total_gifts_sent: doc.statistics.total_gifts_sent,
            total_stars_spent: doc.statistics.total_stars_spent,
            last_sync: doc.last_sync,
        }
    }

    // ------------------------------------------------------------------
    // 本地奖品镜像
    // ------------------------------------------------------------------

    /// 登记奖品
    ///
    /// 已存在的记录视为重新领取：状态覆盖、重试次数加一。礼品已发出的记录不允许覆盖。
    #[instrument(skip(self))]
    pub async fn record_prize_locally(
        &self,
        prize_id: &str,
        gift_name: &str,
        owner_user_id: &str,
        status: PrizeStatus,
    ) -> Result<PrizeRecord> {
        self.mutate(|state| {
            let now = Utc::now();
            let record = match state.doc.prizes.get_mut(prize_id) {
                Some(existing) => {
                    if existing.status.is_dispatched() {
                        return Err(CatalogError::AlreadyDispatched(prize_id.to_string()));
                    }
                    existing.gift_name = gift_name.to_string();
                    existing.owner_user_id = owner_user_id.to_string();
                    existing.status = status;
                    existing.error_message = None;
                    existing.retry_count += 1;
                    existing.dispatch_started_at = None;
                    existing.updated_at = now;
                    existing.clone()
                }
                None => {
                    let record = PrizeRecord::new(prize_id, gift_name, owner_user_id, status, now);
                    state.doc.prizes.insert(prize_id.to_string(), record.clone());
                    record
                }
            };
            Ok(record)
        })
        .await
    }

    /// 更新本地奖品状态，只允许向前迁移
    #[instrument(skip(self))]
    pub async fn update_local_prize_status(
        &self,
        prize_id: &str,
        status: PrizeStatus,
        error_message: Option<String>,
    ) -> Result<PrizeRecord> {
        self.mutate(|state| {
            let record = state
                .doc
                .prizes
                .get_mut(prize_id)
                .ok_or_else(|| CatalogError::PrizeNotFound(prize_id.to_string()))?;

            if record.status != status && !record.status.can_transition_to(status) {
                return Err(CatalogError::InvalidTransition {
                    prize_id: prize_id.to_string(),
                    from: record.status,
                    to: status,
                });
            }

            record.status = status;
            record.error_message = error_message;
            record.updated_at = Utc::now();
            Ok(record.clone())
        })
        .await
    }

    /// 调用渠道发送之前落盘发送标记
    ///
    /// 标记写入失败时不能发送：对账任务依赖它判断滞留的 claiming 是否可以安全回退
    #[instrument(skip(self))]
    pub async fn mark_dispatch_started(
        &self,
        prize_id: &str,
        gift_name: &str,
        owner_user_id: &str,
    ) -> Result<PrizeRecord> {
        self.mutate(|state| {
            let now = Utc::now();
            let record = state
                .doc
                .prizes
                .entry(prize_id.to_string())
                .or_insert_with(|| {
                    PrizeRecord::new(prize_id, gift_name, owner_user_id, PrizeStatus::Claiming, now)
                });

            if record.status.is_dispatched() {
                return Err(CatalogError::AlreadyDispatched(prize_id.to_string()));
            }

            record.status = PrizeStatus::Claiming;
            record.dispatch_started_at = Some(now);
            record.updated_at = now;
            Ok(record.clone())
        })
        .await
    }

    /// 记录一次成功发送
    ///
    /// 状态置为 sent 并累加统计，两者在同一次写入中完成
    #[instrument(skip(self), fields(prize_id = %dispatch.prize_id))]
    pub async fn record_dispatch(&self, dispatch: &DispatchRecord) -> Result<PrizeRecord> {
        self.mutate(|state| {
            let now = Utc::now();
            let record = state
                .doc
                .prizes
                .entry(dispatch.prize_id.clone())
                .or_insert_with(|| {
                    PrizeRecord::new(
                        &dispatch.prize_id,
                        &dispatch.gift_name,
                        &dispatch.owner_user_id,
                        PrizeStatus::Claiming,
                        now,
                    )
                });

            if record.status.is_dispatched() {
                return Err(CatalogError::AlreadyDispatched(dispatch.prize_id.clone()));
            }

            record.status = PrizeStatus::Sent;
            record.gift_name = dispatch.gift_name.clone();
            record.star_cost = Some(dispatch.star_cost);
            record.provider_gift_id = Some(dispatch.provider_gift_id.clone());
            record.ledger_settled = dispatch.ledger_settled;
            record.error_message = None;
            record.updated_at = now;
            let record = record.clone();

            state.doc.statistics.total_gifts_sent += 1;
            state.doc.statistics.total_stars_spent += u64::from(dispatch.star_cost);

            Ok(record)
        })
        .await
    }

    /// 标记账本已确认
    pub async fn mark_ledger_settled(&self, prize_id: &str) -> Result<()> {
        self.mutate(|state| {
            let record = state
                .doc
                .prizes
                .get_mut(prize_id)
                .ok_or_else(|| CatalogError::PrizeNotFound(prize_id.to_string()))?;
            record.ledger_settled = true;
            record.updated_at = Utc::now();
            Ok(())
        })
        .await
    }

    pub async fn get_local_prize(&self, prize_id: &str) -> Option<PrizeRecord> {
        self.state.read().await.doc.prizes.get(prize_id).cloned()
    }

    pub async fn list_pending_prizes(&self) -> Vec<PrizeRecord> {
        self.filter_prizes(|p| p.status == PrizeStatus::Pending).await
    }

    pub async fn list_user_prizes(&self, user_id: &str) -> Vec<PrizeRecord> {
        let user_id = user_id.trim();
        self.filter_prizes(|p| p.owner_user_id.trim() == user_id).await
    }

    /// 已发出但账本未确认的记录
    pub async fn list_unsettled_dispatches(&self) -> Vec<PrizeRecord> {
        self.filter_prizes(|p| p.status == PrizeStatus::Sent && !p.ledger_settled)
            .await
    }

    /// 停留在 claiming 超过 `older_than` 的记录
    pub async fn list_stale_claims(&self, older_than: Duration) -> Vec<PrizeRecord> {
        let cutoff = Utc::now() - older_than;
        self.filter_prizes(|p| p.status == PrizeStatus::Claiming && p.updated_at <= cutoff)
            .await
    }

    pub async fn delete_local_prize(&self, prize_id: &str) -> Result<bool> {
        self.mutate(|state| Ok(state.doc.prizes.remove(prize_id).is_some()))
            .await
    }

    /// 清理超过保留期的已完成记录
    pub async fn cleanup(&self, retention_days: i64) -> Result<usize> {
        self.cleanup_before(Utc::now() - Duration::days(retention_days))
            .await
    }

    /// 删除 `cutoff` 之前更新的 sent/failed 记录
    ///
    /// 账本未确认的 sent 记录保留，留给对账处理
    #[instrument(skip(self))]
    pub async fn cleanup_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let removed = self
            .mutate(|state| {
                let before = state.doc.prizes.len();
                state.doc.prizes.retain(|_, p| {
                    let removable = match p.status {
                        PrizeStatus::Failed => true,
                        PrizeStatus::Sent => p.ledger_settled,
                        _ => false,
                    };
                    !(removable && p.updated_at < cutoff)
                });
                Ok(before - state.doc.prizes.len())
            })
            .await?;

        if removed > 0 {
            info!(removed, "已清理过期奖品记录");
        }
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // 内部实现
    // ------------------------------------------------------------------

    async fn filter_prizes(&self, predicate: impl Fn(&PrizeRecord) -> bool) -> Vec<PrizeRecord> {
        let state = self.state.read().await;
        state
            .doc
            .prizes
            .values()
            .filter(|p| predicate(p))
            .cloned()
            .collect()
    }

    /// 在写锁下执行读-改-写
    ///
    /// 修改作用于状态副本；副本落盘成功后才替换内存状态
    async fn mutate<T>(&self, op: impl FnOnce(&mut CatalogState) -> Result<T>) -> Result<T> {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        let value = op(&mut next)?;
        self.persist(&next.doc).await?;
        *guard = next;
        Ok(value)
    }

    async fn persist(&self, doc: &CatalogDocument) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(doc)?;
        let tmp_path = self.path.with_extension("json.tmp");

        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp_path, &self.path).await?;
        sync_parent_dir(&self.path).await?;
        debug!(bytes = bytes.len(), "目录文件已写入");
        Ok(())
    }
}

/// 把 rename 写入的目录项刷盘，断电后不会回到旧文件
#[cfg(unix)]
async fn sync_parent_dir(path: &Path) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    tokio::fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

fn resolve_in(state: &CatalogState, identifier: &GiftIdentifier) -> Option<GiftDefinition> {
    let value = identifier.value.trim();
    if value.is_empty() {
        return None;
    }

    match identifier.kind {
        IdentifierKind::Name => state
            .doc
            .gifts
            .get(value)
            .map(|entry| entry.to_definition(value)),
        IdentifierKind::ProviderId => {
            let name = state.by_provider_id.get(value)?;
            state
                .doc
                .gifts
                .get(name)
                .map(|entry| entry.to_definition(name))
        }
    }
}

fn apply_upsert(state: &mut CatalogState, upsert: GiftUpsert) -> Result<GiftDefinition> {
    let name = upsert.name.trim().to_string();
    if name.is_empty() {
        return Err(CatalogError::InvalidGift("礼品名称不能为空".to_string()));
    }
    if upsert.star_cost == 0 {
        return Err(CatalogError::InvalidGift(format!(
            "礼品星星数必须大于 0: {}",
            name
        )));
    }

    let provider_id = upsert
        .provider_gift_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from);

    // 名称不能与其他礼品的渠道 ID 相同，否则正向/反向查找会歧义
    if let Some(owner) = state.by_provider_id.get(&name)
        && owner != &name
    {
        return Err(CatalogError::IdentifierCollision(format!(
            "名称 {} 已是礼品 {} 的渠道 ID",
            name, owner
        )));
    }

    if let Some(provider_id) = provider_id.as_deref() {
        if let Some(existing) = state.by_provider_id.get(provider_id)
            && existing != &name
        {
            return Err(CatalogError::ProviderIdConflict {
                provider_gift_id: provider_id.to_string(),
                existing: existing.clone(),
            });
        }
        if provider_id != name && state.doc.gifts.contains_key(provider_id) {
            return Err(CatalogError::IdentifierCollision(format!(
                "渠道 ID {} 与已有礼品名称相同",
                provider_id
            )));
        }
    }

    let now = Utc::now();
    let previous = state.doc.gifts.get(&name).cloned();

    if let Some(old_id) = previous.as_ref().and_then(|p| p.provider_gift_id.as_deref()) {
        state.by_provider_id.remove(old_id);
    }
    if let Some(provider_id) = provider_id.as_deref() {
        state
            .by_provider_id
            .insert(provider_id.to_string(), name.clone());
        state.doc.last_sync = Some(now);
    }

    let display_name = upsert
        .display_name
        .filter(|d| !d.trim().is_empty())
        .or_else(|| previous.map(|p| p.display_name).filter(|d| !d.is_empty()))
        .unwrap_or_else(|| name.clone());

    let entry = GiftEntry {
        provider_gift_id: provider_id,
        star_cost: upsert.star_cost,
        display_name,
        updated_at: now,
    };
    let definition = entry.to_definition(&name);
    state.doc.gifts.insert(name, entry);

    Ok(definition)
}
