//! # アカウントハンドラ
//!
//! ## エンドポイント
//!
//! - `POST /register` - ユーザー登録（201）
//! - `POST /login` - メールアドレスとパスワードでログイン
//! - `POST /forgotPassword` - パスワード再設定リンクの発行

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use nutrilens_domain::account::{LoginRequest, PasswordResetRequest, Registration};
use nutrilens_shared::ApiResponse;
use serde_json::json;

use crate::{error::ServerError, usecase::AccountUseCaseImpl};

pub struct AccountState {
    pub usecase: AccountUseCaseImpl,
}

/// POST /register
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<Arc<AccountState>>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let Json(registration) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;

    let user = state.usecase.register(registration).await?;
    let response = ApiResponse::new(user).with_message("ユーザーを登録しました");
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /login
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<Arc<AccountState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let Json(request) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;

    let user = state.usecase.login(request).await?;
    let response = ApiResponse::new(user).with_message("ログインしました");
    Ok((StatusCode::OK, Json(response)))
}

/// POST /forgotPassword
///
/// 再設定リンクは `data.resetLink` で返す。
#[tracing::instrument(skip_all)]
pub async fn forgot_password(
    State(state): State<Arc<AccountState>>,
    payload: Result<Json<PasswordResetRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let Json(request) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;

    let link = state.usecase.password_reset_link(request).await?;
    let response = ApiResponse::new(json!({ "resetLink": link }))
        .with_message("パスワード再設定リンクを発行しました");
    Ok((StatusCode::OK, Json(response)))
}
