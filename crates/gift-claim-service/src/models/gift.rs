//! 礼品定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::IdentifierKind;

/// 礼品目录条目
///
/// `name` 全局唯一；`provider_gift_id` 一旦设置，在所有条目中也必须唯一。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftDefinition {
    pub name: String,
    pub provider_gift_id: Option<String>,
    pub star_cost: u32,
    pub display_name: String,
    pub updated_at: DateTime<Utc>,
}

impl GiftDefinition {
    pub fn is_mapped(&self) -> bool {
        self.provider_gift_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }
}

/// 写入礼品目录的请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GiftUpsert {
    pub name: String,
    pub provider_gift_id: Option<String>,
    pub star_cost: u32,
    pub display_name: Option<String>,
}

impl GiftUpsert {
    pub fn new(name: impl Into<String>, provider_gift_id: Option<&str>, star_cost: u32) -> Self {
        Self {
            name: name.into(),
            provider_gift_id: provider_gift_id.map(String::from),
            star_cost,
            display_name: None,
        }
    }
}

/// 显式标注查找方式的礼品标识
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GiftIdentifier {
    pub kind: IdentifierKind,
    pub value: String,
}

impl GiftIdentifier {
    pub fn name(value: impl Into<String>) -> Self {
        Self {
            kind: IdentifierKind::Name,
            value: value.into(),
        }
    }

    pub fn provider_id(value: impl Into<String>) -> Self {
        Self {
            kind: IdentifierKind::ProviderId,
            value: value.into(),
        }
    }
}
