//! # API レスポンスエンベロープ
//!
//! 公開 API の統一レスポンス形式
//! `{ "status": "success", "message": "...", "data": T }` を提供する。

use serde::{Deserialize, Serialize};

/// レスポンスの処理結果ステータス
///
/// 成功レスポンスのみがこの型を使う。エラーは [`ErrorResponse`](crate::ErrorResponse)
/// （RFC 9457 Problem Details）で返す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
}

/// 公開 API の統一レスポンス型
///
/// すべての成功レスポンスは `status` フィールドを持つ。
/// `message` は人間向けの補足で、省略時は JSON に出力しない。
///
/// ## 使用例
///
/// ```
/// use nutrilens_shared::{ApiResponse, ResponseStatus};
///
/// let response = ApiResponse::new("hello").with_message("ok");
/// assert_eq!(response.status, ResponseStatus::Success);
/// assert_eq!(response.data, "hello");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status:  ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data:    T,
}

impl<T> ApiResponse<T> {
    /// 新しい `ApiResponse` を作成する
    pub fn new(data: T) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: None,
            data,
        }
    }

    /// 補足メッセージを付与する
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
