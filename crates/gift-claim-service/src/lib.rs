//! 礼品领取服务
//!
//! 用户领取预先分配的奖品，前置条件全部满足时向其发放一次且仅一次数字礼品。
//!
//! ## 核心流程
//!
//! 参数校验 → 查询账本 → 所有者校验 → 状态校验 → 加锁（pending → claiming）
//! → 解析礼品映射 → 余额校验 → 发放 → 账本确认与清理 → 记录统计
//!
//! ## 模块结构
//!
//! - `models`: 礼品定义、奖品记录与状态机
//! - `catalog`: 礼品目录与本地领取记录的持久化存储
//! - `clients`: 奖品账本与礼品发放渠道的客户端
//! - `service`: 领取协调器
//! - `lock`: 进程内的领取去重
//! - `notification`: 审计通知
//! - `worker`: 对账 Worker
//! - `handlers` / `routes` / `state`: HTTP 接口
//!
//! ## 技术栈
//!
//! - Web 框架：Axum
//! - HTTP 客户端：reqwest
//! - 数据验证：validator
//! - 序列化：serde (camelCase)

pub mod catalog;
pub mod clients;
pub mod context;
pub mod error;
pub mod handlers;
pub mod lock;
pub mod models;
pub mod notification;
pub mod routes;
pub mod service;
pub mod state;
pub mod worker;

// 重新导出核心类型
pub use catalog::{CatalogStats, DispatchRecord, GiftCatalogStore};
pub use clients::{
    ClientError, DispatchConfirmation, GiftProviderClient, HttpPrizeLedgerClient,
    PrizeLedgerClient, TelegramGiftProvider,
};
pub use context::{AppContext, ClaimOptions};
pub use error::{ApiError, CatalogError, ClaimError, Result};
pub use models::{
    GiftDefinition, GiftIdentifier, GiftUpsert, IdentifierKind, LedgerPrize, PrizeRecord,
    PrizeStatus,
};
pub use notification::{ClaimEvent, ClaimNotifier, NotificationSender};
pub use service::ClaimCoordinator;
pub use service::dto::{ClaimRequest, ClaimResponse, ClaimSuccess};
pub use state::AppState;
pub use worker::{ReconcileReport, ReconcileWorker};
