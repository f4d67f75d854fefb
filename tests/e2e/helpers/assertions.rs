//! 断言辅助函数

use super::ApiResult;

/// 断言请求成功
pub fn assert_claim_succeeded(result: &ApiResult) {
    assert!(
        result.is_success(),
        "期望领取成功，实际: {} {}",
        result.status,
        result.body
    );
    assert_eq!(result.body["success"], true);
}

/// 断言请求以指定状态码和错误码失败
pub fn assert_claim_failed(result: &ApiResult, status: u16, code: &str) {
    assert_eq!(
        result.status.as_u16(),
        status,
        "状态码不符，响应体: {}",
        result.body
    );
    assert_eq!(result.code(), Some(code), "错误码不符，响应体: {}", result.body);
    assert_eq!(result.body["success"], false);
}

/// 断言账本中奖品的状态
pub fn assert_ledger_status(prize: &Option<serde_json::Value>, expected: &str) {
    let prize = prize.as_ref().expect("账本中奖品不存在");
    assert_eq!(prize["status"], expected, "账本记录: {}", prize);
}
