//! 内存存储
//!
//! 使用 DashMap 实现的高并发内存存储，适用于测试和开发环境。

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// 通用内存存储
///
/// 基于 DashMap 实现，单个 key 上的读改写在分片锁内完成，
/// 用来模拟账本的比较并交换语义。
#[derive(Debug)]
pub struct MemoryStore<T> {
    data: Arc<DashMap<String, T>>,
}

impl<T: Clone> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> MemoryStore<T> {
    /// 创建新的内存存储实例
    pub fn new() -> Self {
        Self {
            data: Arc::new(DashMap::new()),
        }
    }

    /// 插入或覆盖
    pub fn insert(&self, id: &str, value: T) {
        self.data.insert(id.to_string(), value);
    }

    /// 仅当 key 不存在时插入，返回是否插入成功
    pub fn insert_if_absent(&self, id: &str, value: T) -> bool {
        match self.data.entry(id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    /// 获取数据的克隆，不持有锁
    pub fn get(&self, id: &str) -> Option<T> {
        self.data.get(id).map(|v| v.clone())
    }

    /// 在持有该 key 写锁的情况下修改数据
    ///
    /// key 不存在时返回 None，否则返回闭包的结果
    pub fn update<R>(&self, id: &str, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.data.get_mut(id).map(|mut entry| f(entry.value_mut()))
    }

    /// 删除数据，返回被删除的值
    pub fn remove(&self, id: &str) -> Option<T> {
        self.data.remove(id).map(|(_, v)| v)
    }

    /// 列出所有数据
    pub fn list(&self) -> Vec<T> {
        self.data
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// 获取数据总数
    pub fn count(&self) -> usize {
        self.data.len()
    }

    /// 清空所有数据
    pub fn clear(&self) {
        self.data.clear();
    }
}

impl<T: Clone> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}
