//! # ユーザーハンドラ
//!
//! ## エンドポイント
//!
//! - `GET /users` - ユーザー一覧
//! - `GET /users/{id}` - ユーザー詳細
//! - `PUT /users/{id}` - プロフィールの部分更新
//! - `DELETE /users/{id}` - ユーザーを参照先（写真・認証アカウント）ごと削除
//! - `DELETE /users` - 全ユーザーを参照先ごと削除

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use nutrilens_domain::{collection::EntityKind, profile::UserProfilePatch};
use nutrilens_shared::ApiResponse;

use crate::{
    error::ServerError,
    usecase::{DeletionUseCaseImpl, UserUseCaseImpl},
};

/// ユーザー API の共有状態
pub struct UserState {
    pub usecase:  UserUseCaseImpl,
    pub deletion: Arc<DeletionUseCaseImpl>,
}

/// GET /users
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<Arc<UserState>>,
) -> Result<impl IntoResponse, ServerError> {
    let users = state.usecase.list_users().await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(users))))
}

/// GET /users/{id}
#[tracing::instrument(skip_all, fields(%id))]
pub async fn get_user(
    State(state): State<Arc<UserState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let user = state.usecase.get_user(&id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(user))))
}

/// PUT /users/{id}
///
/// 指定されたフィールドのみ上書きし、書き込んだフィールドを返す。
#[tracing::instrument(skip_all, fields(%id))]
pub async fn update_user(
    State(state): State<Arc<UserState>>,
    Path(id): Path<String>,
    payload: Result<Json<UserProfilePatch>, JsonRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let Json(patch) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;

    let changes = state.usecase.update_profile(&id, &patch).await?;
    let response = ApiResponse::new(changes).with_message("プロフィールを更新しました");
    Ok((StatusCode::OK, Json(response)))
}

/// DELETE /users/{id}
#[tracing::instrument(skip_all, fields(%id))]
pub async fn delete_user(
    State(state): State<Arc<UserState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let outcome = state.deletion.delete_entity(&EntityKind::User, &id).await?;
    let response = ApiResponse::new(outcome).with_message("ユーザーを削除しました");
    Ok((StatusCode::OK, Json(response)))
}

/// DELETE /users
#[tracing::instrument(skip_all)]
pub async fn delete_all_users(
    State(state): State<Arc<UserState>>,
) -> Result<impl IntoResponse, ServerError> {
    let report = state.deletion.delete_collection(&EntityKind::User).await?;
    let response = ApiResponse::new(report).with_message("全ユーザーを削除しました");
    Ok((StatusCode::OK, Json(response)))
}
