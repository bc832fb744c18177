//! # サーバーエラー定義
//!
//! ハンドラ・ユースケースで発生するエラーと、HTTP レスポンスへの変換を定義する。
//! レスポンスボディは RFC 9457 Problem Details。5xx の原因はログにのみ出力する。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use nutrilens_domain::DomainError;
use nutrilens_infra::{InfraError, deletion::CleanupError};
use nutrilens_shared::ErrorResponse;
use thiserror::Error;

/// サーバーで発生するエラー
#[derive(Debug, Error)]
pub enum ServerError {
    /// リソースが見つからない
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 不正なリクエスト
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),

    /// API キーが不正
    #[error("API キーが不正です")]
    Unauthorized,

    /// ログイン時のパスワード不一致
    #[error("パスワードが正しくありません")]
    InvalidPassword,

    /// 既存リソースとの衝突（登録済みのメールアドレスなど）
    #[error("競合: {0}")]
    Conflict(String),

    /// アップロードサイズ超過
    #[error("ファイルサイズが上限を超えています: {0}")]
    PayloadTooLarge(String),

    /// 推論エンドポイントの応答が不正
    #[error("推論エンドポイントの呼び出しに失敗: {0}")]
    BadGateway(#[source] InfraError),

    /// カスケード削除の失敗
    #[error(transparent)]
    Cleanup(#[from] CleanupError),

    /// 外部ストアの呼び出し失敗
    #[error("外部ストアの呼び出しに失敗: {0}")]
    Infra(#[from] InfraError),
}

impl From<DomainError> for ServerError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Validation(msg) => Self::BadRequest(msg),
            e @ DomainError::NotFound { .. } => Self::NotFound(e.to_string()),
        }
    }
}

impl ServerError {
    fn to_error_response(&self) -> ErrorResponse {
        match self {
            Self::NotFound(msg) => ErrorResponse::not_found(msg),
            Self::BadRequest(msg) => ErrorResponse::bad_request(msg),
            Self::Unauthorized => ErrorResponse::unauthorized("API キーが不正です"),
            Self::InvalidPassword => ErrorResponse::unauthorized("パスワードが正しくありません"),
            Self::Conflict(msg) => ErrorResponse::conflict(msg),
            Self::PayloadTooLarge(msg) => ErrorResponse::payload_too_large(msg),
            Self::BadGateway(_) => {
                ErrorResponse::bad_gateway("推論エンドポイントから有効な応答を得られませんでした")
            }
            Self::Cleanup(e @ CleanupError::NotFound { .. }) => {
                ErrorResponse::not_found(e.to_string())
            }
            Self::Cleanup(_) | Self::Infra(_) => ErrorResponse::internal_error(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let body = self.to_error_response();
        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = %self, "リクエストの処理に失敗");
        }

        (status, Json(body)).into_response()
    }
}
