//! 测试辅助工具

mod api_client;
mod assertions;

pub use api_client::{ApiResult, ClaimApiClient, MockAdminClient};
pub use assertions::*;
