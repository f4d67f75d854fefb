//! 进程内领取占位表

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;
use uuid::Uuid;

/// 进程内正在处理的领取请求
///
/// 同一进程内对同一 prizeId 的并发请求在到达账本之前就被拒绝；
/// 跨进程的串行化仍依赖账本的加锁操作。
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    entries: DashMap<String, InFlightEntry>,
}

#[derive(Debug, Clone)]
struct InFlightEntry {
    token: String,
    started_at: Instant,
}

impl InFlightRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 尝试占位，已有请求在处理时返回 None
    pub fn try_acquire(self: &Arc<Self>, key: &str) -> Option<InFlightGuard> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(existing) => {
                debug!(
                    key = %key,
                    held_ms = existing.get().started_at.elapsed().as_millis() as u64,
                    "领取请求已在处理中"
                );
                None
            }
            Entry::Vacant(slot) => {
                let token = Uuid::new_v4().to_string();
                slot.insert(InFlightEntry {
                    token: token.clone(),
                    started_at: Instant::now(),
                });
                Some(InFlightGuard {
                    registry: self.clone(),
                    key: key.to_string(),
                    token,
                })
            }
        }
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 占位守卫
///
/// drop 时释放占位；只删除自己写入的条目
pub struct InFlightGuard {
    registry: Arc<InFlightRegistry>,
    key: String,
    token: String,
}

impl InFlightGuard {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// 本次领取的唯一凭证，同时用作账本加锁的 claim_token
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry
            .entries
            .remove_if(&self.key, |_, entry| entry.token == self.token);
    }
}
