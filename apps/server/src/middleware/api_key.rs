//! # API キー認証ミドルウェア
//!
//! `x-api-key` ヘッダーを設定値と定数時間で比較する。
//! 一致しない場合は 401 Unauthorized を返す。
//!
//! ## 使い方
//!
//! ```rust,ignore
//! use axum::middleware::from_fn_with_state;
//!
//! Router::new()
//!     .route("/users", get(list_users))
//!     .route_layer(from_fn_with_state(ApiKeyState::new("secret"), require_api_key))
//! ```

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::error::ServerError;

/// API キーのヘッダー名
pub const API_KEY_HEADER: &str = "x-api-key";

/// API キー認証の状態
#[derive(Clone)]
pub struct ApiKeyState {
    expected: Arc<str>,
}

impl ApiKeyState {
    pub fn new(expected: &str) -> Self {
        Self {
            expected: Arc::from(expected),
        }
    }

    fn matches(&self, provided: &[u8]) -> bool {
        self.expected.as_bytes().ct_eq(provided).into()
    }
}

/// API キー認証ミドルウェア
pub async fn require_api_key(
    State(state): State<ApiKeyState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(API_KEY_HEADER)
        .is_some_and(|value| state.matches(value.as_bytes()));

    if !authorized {
        tracing::warn!(uri = %request.uri(), "API キーが不正なリクエストを拒否");
        return ServerError::Unauthorized.into_response();
    }

    next.run(request).await
}
