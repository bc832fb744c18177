//! # NutriLens 共有ユーティリティ
//!
//! サーバーが返す JSON の形（成功エンベロープ、Problem Details、ヘルスチェック）と、
//! トレーシング初期化を提供する。
//!
//! - ドメイン知識は持たない
//! - axum に依存しない（`IntoResponse` への変換はサーバー側）
//! - トレーシング関連の依存は `observability` feature の内側に置く

pub mod api_response;
pub mod error_response;
pub mod health;
pub mod observability;

pub use api_response::{ApiResponse, ResponseStatus};
pub use error_response::{ErrorResponse, Problem};
pub use health::{HealthResponse, HealthStatus};
