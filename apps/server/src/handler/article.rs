//! # 記事ハンドラ
//!
//! ## エンドポイント
//!
//! - `GET /articles` - 記事一覧
//! - `GET /articles/{id}` - 記事詳細
//! - `POST /articles` - 記事を作成（multipart、画像は `article_picture`）
//! - `PUT /articles/{id}` - 記事の部分更新（multipart）
//! - `DELETE /articles/{id}` - 記事を画像ごと削除
//! - `DELETE /articles` - 全記事を画像ごと削除

use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use nutrilens_domain::collection::EntityKind;
use nutrilens_shared::ApiResponse;
use serde_json::json;

use super::form::FormData;
use crate::{
    error::ServerError,
    usecase::{ArticleForm, CatalogEditorUseCaseImpl, CatalogUseCaseImpl, DeletionUseCaseImpl},
};

/// 記事・食品 API の共有状態
pub struct CatalogState {
    pub catalog:  Arc<CatalogUseCaseImpl>,
    pub editor:   CatalogEditorUseCaseImpl,
    pub deletion: Arc<DeletionUseCaseImpl>,
}

async fn article_form(multipart: Multipart) -> Result<ArticleForm, ServerError> {
    let mut form = FormData::read(multipart).await?;
    Ok(ArticleForm {
        title:   form.text("title"),
        content: form.text("content"),
        picture: form.file("article_picture"),
    })
}

/// GET /articles
#[tracing::instrument(skip_all)]
pub async fn list_articles(
    State(state): State<Arc<CatalogState>>,
) -> Result<impl IntoResponse, ServerError> {
    let articles = state.catalog.list_articles().await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(articles))))
}

/// GET /articles/{id}
#[tracing::instrument(skip_all, fields(%id))]
pub async fn get_article(
    State(state): State<Arc<CatalogState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let article = state.catalog.get_article(&id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(article))))
}

/// POST /articles
#[tracing::instrument(skip_all)]
pub async fn create_article(
    State(state): State<Arc<CatalogState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ServerError> {
    let form = article_form(multipart).await?;

    let id = state.editor.create_article(form).await?;
    let response = ApiResponse::new(json!({ "articleId": id })).with_message("記事を作成しました");
    Ok((StatusCode::CREATED, Json(response)))
}

/// PUT /articles/{id}
#[tracing::instrument(skip_all, fields(%id))]
pub async fn update_article(
    State(state): State<Arc<CatalogState>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ServerError> {
    let form = article_form(multipart).await?;

    let changes = state.editor.update_article(&id, form).await?;
    let response = ApiResponse::new(changes).with_message("記事を更新しました");
    Ok((StatusCode::OK, Json(response)))
}

/// DELETE /articles/{id}
#[tracing::instrument(skip_all, fields(%id))]
pub async fn delete_article(
    State(state): State<Arc<CatalogState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let outcome = state
        .deletion
        .delete_entity(&EntityKind::Article, &id)
        .await?;
    let response = ApiResponse::new(outcome).with_message("記事を削除しました");
    Ok((StatusCode::OK, Json(response)))
}

/// DELETE /articles
#[tracing::instrument(skip_all)]
pub async fn delete_all_articles(
    State(state): State<Arc<CatalogState>>,
) -> Result<impl IntoResponse, ServerError> {
    let report = state
        .deletion
        .delete_collection(&EntityKind::Article)
        .await?;
    let response = ApiResponse::new(report).with_message("全記事を削除しました");
    Ok((StatusCode::OK, Json(response)))
}
