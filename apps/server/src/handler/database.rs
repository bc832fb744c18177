//! # データベースハンドラ
//!
//! ```text
//! GET    /database
//! DELETE /database
//! ```
//!
//! GET は全トップレベルコレクションの内容をコレクション名ごとに返す。
//! DELETE は全トップレベルコレクションを削除し、コレクションごとのレポートを返す。
//! どちらもサブコレクションは辿らない。

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use nutrilens_shared::ApiResponse;

use crate::{
    error::ServerError,
    usecase::{DatabaseUseCaseImpl, DeletionUseCaseImpl},
};

pub struct DatabaseState {
    pub snapshot: DatabaseUseCaseImpl,
    pub deletion: Arc<DeletionUseCaseImpl>,
}

/// GET /database
#[tracing::instrument(skip_all)]
pub async fn get_database(
    State(state): State<Arc<DatabaseState>>,
) -> Result<impl IntoResponse, ServerError> {
    let collections = state.snapshot.snapshot().await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(collections))))
}

/// DELETE /database
#[tracing::instrument(skip_all)]
pub async fn delete_database(
    State(state): State<Arc<DatabaseState>>,
) -> Result<impl IntoResponse, ServerError> {
    let reports = state.deletion.delete_database().await?;
    let response = ApiResponse::new(reports).with_message("データベースを削除しました");
    Ok((StatusCode::OK, Json(response)))
}
