//! 目录文件格式

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{GiftDefinition, PrizeRecord};

pub(crate) const DOCUMENT_VERSION: &str = "2.0";

/// 持久化的礼品条目，名称是外层 map 的 key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GiftEntry {
    #[serde(alias = "telegramId", default)]
    pub provider_gift_id: Option<String>,
    pub star_cost: u32,
    #[serde(default)]
    pub display_name: String,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl GiftEntry {
    pub fn to_definition(&self, name: &str) -> GiftDefinition {
        GiftDefinition {
            name: name.to_string(),
            provider_gift_id: self.provider_gift_id.clone(),
            star_cost: self.star_cost,
            display_name: if self.display_name.is_empty() {
                name.to_string()
            } else {
                self.display_name.clone()
            },
            updated_at: self.updated_at,
        }
    }
}

/// 累计发放统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStatistics {
    pub total_gifts_sent: u64,
    pub total_stars_spent: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CatalogDocument {
    #[serde(default)]
    pub gifts: BTreeMap<String, GiftEntry>,
    #[serde(default)]
    pub prizes: BTreeMap<String, PrizeRecord>,
    #[serde(default)]
    pub statistics: CatalogStatistics,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    DOCUMENT_VERSION.to_string()
}

impl Default for CatalogDocument {
    fn default() -> Self {
        Self {
            gifts: BTreeMap::new(),
            prizes: BTreeMap::new(),
            statistics: CatalogStatistics::default(),
            last_sync: None,
            version: default_version(),
        }
    }
}

/// 内存状态：文档本身加渠道 ID -> 名称的反向索引
#[derive(Debug, Clone, Default)]
pub(crate) struct CatalogState {
    pub doc: CatalogDocument,
    pub by_provider_id: HashMap<String, String>,
}

impl CatalogState {
    pub fn from_document(mut doc: CatalogDocument) -> Self {
        let mut by_provider_id = HashMap::new();

        for (name, entry) in doc.gifts.iter_mut() {
            let Some(provider_id) = entry.provider_gift_id.as_deref().map(str::trim) else {
                continue;
            };
            if provider_id.is_empty() {
                entry.provider_gift_id = None;
                continue;
            }
            if let Some(existing) = by_provider_id.get(provider_id) {
                warn!(
                    gift = %name,
                    existing = %existing,
                    provider_gift_id = %provider_id,
                    "目录文件中渠道礼品 ID 重复，忽略该映射"
                );
                entry.provider_gift_id = None;
                continue;
            }
            by_provider_id.insert(provider_id.to_string(), name.clone());
        }

        doc.version = default_version();
        Self {
            doc,
            by_provider_id,
        }
    }
}

/// 目录统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub gifts_total: usize,
    pub gifts_mapped: usize,
    pub gifts_unmapped: usize,
    pub mapped_percentage: u32,
    pub prizes_total: usize,
    pub prizes_pending: usize,
    pub prizes_sent: usize,
    pub prizes_failed: usize,
    /// 本地已发出奖品的星星总值
    pub total_stars_value: u64,
    pub total_gifts_sent: u64,
    pub total_stars_spent: u64,
    pub last_sync: Option<DateTime<Utc>>,
}
