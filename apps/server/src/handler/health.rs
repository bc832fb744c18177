//! # ヘルスチェックハンドラ
//!
//! ```text
//! GET /health
//! ```
//!
//! API キー不要。Cloud Run の起動確認に使う。

use axum::Json;
use nutrilens_shared::HealthResponse;

/// ヘルスチェックエンドポイント
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
    ))
}
