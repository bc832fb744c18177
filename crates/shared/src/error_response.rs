//! # エラーレスポンス（RFC 9457 Problem Details）
//!
//! API が返すエラーボディ。`axum` への変換はサーバー側で行い、
//! このクレートは形だけを持つ。
//!
//! 問題の種類は [`Problem`] で列挙し、`type` URI・`title`・`status` を
//! 一箇所で対応づける。

use serde::{Deserialize, Serialize};

const ERROR_TYPE_BASE: &str = "https://nutrilens.example.com/errors";

/// API が返しうる問題の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Problem {
    BadRequest,
    Unauthorized,
    NotFound,
    Conflict,
    PayloadTooLarge,
    Internal,
    BadGateway,
}

impl Problem {
    /// `(type URI の末尾, title, status)`
    fn parts(self) -> (&'static str, &'static str, u16) {
        match self {
            Self::BadRequest => ("bad-request", "Bad Request", 400),
            Self::Unauthorized => ("unauthorized", "Unauthorized", 401),
            Self::NotFound => ("not-found", "Not Found", 404),
            Self::Conflict => ("conflict", "Conflict", 409),
            Self::PayloadTooLarge => ("payload-too-large", "Payload Too Large", 413),
            Self::Internal => ("internal-error", "Internal Server Error", 500),
            Self::BadGateway => ("bad-gateway", "Bad Gateway", 502),
        }
    }

    pub fn status(self) -> u16 {
        self.parts().2
    }
}

/// Problem Details 形式のエラーボディ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub title:      String,
    pub status:     u16,
    pub detail:     String,
}

impl ErrorResponse {
    pub fn new(problem: Problem, detail: impl Into<String>) -> Self {
        let (slug, title, status) = problem.parts();
        Self {
            error_type: format!("{ERROR_TYPE_BASE}/{slug}"),
            title: title.to_string(),
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(Problem::BadRequest, detail)
    }

    /// API キーの欠落・不一致、ログイン時のパスワード不一致
    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(Problem::Unauthorized, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(Problem::NotFound, detail)
    }

    /// 登録済みのメールアドレスでの新規登録
    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::new(Problem::Conflict, detail)
    }

    /// アップロード画像のサイズ超過
    pub fn payload_too_large(detail: impl Into<String>) -> Self {
        Self::new(Problem::PayloadTooLarge, detail)
    }

    /// 500。上流のエラー内容は detail に含めない。
    pub fn internal_error() -> Self {
        Self::new(Problem::Internal, "内部エラーが発生しました")
    }

    /// 推論サーバーの応答が不正な場合
    pub fn bad_gateway(detail: impl Into<String>) -> Self {
        Self::new(Problem::BadGateway, detail)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_not_foundはproblem_detailsの全フィールドを埋める() {
        let sut = ErrorResponse::not_found("User が見つかりません: u1");

        assert_eq!(
            sut,
            ErrorResponse {
                error_type: "https://nutrilens.example.com/errors/not-found".to_string(),
                title:      "Not Found".to_string(),
                status:     404,
                detail:     "User が見つかりません: u1".to_string(),
            }
        );
    }

    #[test]
    fn test_internal_errorは固定のdetailを返す() {
        let sut = ErrorResponse::internal_error();

        assert_eq!(sut.status, 500);
        assert_eq!(sut.detail, "内部エラーが発生しました");
    }

    #[test]
    fn test_typeフィールドとしてシリアライズされる() {
        let json = serde_json::to_value(ErrorResponse::payload_too_large("10 MiB 超")).unwrap();

        assert_eq!(
            json["type"],
            "https://nutrilens.example.com/errors/payload-too-large"
        );
        assert_eq!(json["status"], 413);
        assert!(json.get("error_type").is_none());
    }

    #[test]
    fn test_problemのstatusとレスポンスのstatusが一致する() {
        for problem in [
            Problem::BadRequest,
            Problem::Unauthorized,
            Problem::NotFound,
            Problem::Conflict,
            Problem::PayloadTooLarge,
            Problem::Internal,
            Problem::BadGateway,
        ] {
            assert_eq!(ErrorResponse::new(problem, "").status, problem.status());
        }
    }
}
