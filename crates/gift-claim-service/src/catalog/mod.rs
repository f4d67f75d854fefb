//! 礼品目录与本地奖品镜像
//!
//! 目录文件是进程内唯一的持久化状态。所有写操作在同一把写锁下执行
//! 读-改-写，先写临时文件并 fsync，再原子重命名覆盖正式文件；
//! 只有落盘成功后才替换内存状态。

mod document;
mod seed;
mod store;

pub use document::{CatalogStatistics, CatalogStats};
pub use seed::DEFAULT_GIFTS;
pub use store::{DispatchRecord, GiftCatalogStore};
