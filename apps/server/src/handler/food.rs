//! # 食品ハンドラ
//!
//! ## エンドポイント
//!
//! - `GET /makanan` - 全カテゴリの食品アイテム
//! - `GET /makanan/{kategori}` - カテゴリ内の食品アイテム（空なら 404）
//! - `GET /makanan/{kategori}/{id}` - 食品アイテム詳細
//! - `POST /makanan` - 食品アイテムを作成（multipart、画像は `makanan_picture`）
//! - `PUT /makanan/{kategori}/{id}` - 食品アイテムの部分更新（multipart）
//! - `DELETE /makanan/{kategori}/{id}` - 食品アイテムを画像ごと削除
//! - `DELETE /makanan/{kategori}` - カテゴリ内の全食品アイテムを削除（一括コミット）

use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use nutrilens_domain::collection::{DocumentId, EntityKind};
use nutrilens_shared::ApiResponse;
use serde_json::json;

use super::{article::CatalogState, form::FormData};
use crate::{error::ServerError, usecase::FoodItemForm};

fn food_kind(kategori: &str) -> Result<EntityKind, ServerError> {
    Ok(EntityKind::FoodItem {
        category: DocumentId::new(kategori)?,
    })
}

async fn food_item_form(multipart: Multipart) -> Result<FoodItemForm, ServerError> {
    let mut form = FormData::read(multipart).await?;
    Ok(FoodItemForm {
        kategori:  form.text("kategori"),
        nama:      form.text("nama"),
        deskripsi: form.text("deskripsi"),
        nutrition: form.text("nutrition"),
        picture:   form.file("makanan_picture"),
    })
}

/// GET /makanan
#[tracing::instrument(skip_all)]
pub async fn list_food_items(
    State(state): State<Arc<CatalogState>>,
) -> Result<impl IntoResponse, ServerError> {
    let items = state.catalog.list_food_items().await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(items))))
}

/// GET /makanan/{kategori}
#[tracing::instrument(skip_all, fields(%kategori))]
pub async fn list_food_items_by_category(
    State(state): State<Arc<CatalogState>>,
    Path(kategori): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let items = state.catalog.list_food_items_in(&kategori).await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(items))))
}

/// GET /makanan/{kategori}/{id}
#[tracing::instrument(skip_all, fields(%kategori, %id))]
pub async fn get_food_item(
    State(state): State<Arc<CatalogState>>,
    Path((kategori, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ServerError> {
    let item = state.catalog.get_food_item(&kategori, &id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(item))))
}

/// POST /makanan
///
/// カテゴリはフォームの `kategori` で指定する。
#[tracing::instrument(skip_all)]
pub async fn create_food_item(
    State(state): State<Arc<CatalogState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ServerError> {
    let form = food_item_form(multipart).await?;

    let id = state.editor.create_food_item(form).await?;
    let response =
        ApiResponse::new(json!({ "makananId": id })).with_message("食品アイテムを作成しました");
    Ok((StatusCode::CREATED, Json(response)))
}

/// PUT /makanan/{kategori}/{id}
///
/// フォームの `kategori` は無視する。
#[tracing::instrument(skip_all, fields(%kategori, %id))]
pub async fn update_food_item(
    State(state): State<Arc<CatalogState>>,
    Path((kategori, id)): Path<(String, String)>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ServerError> {
    let form = food_item_form(multipart).await?;

    let changes = state.editor.update_food_item(&kategori, &id, form).await?;
    let response = ApiResponse::new(changes).with_message("食品アイテムを更新しました");
    Ok((StatusCode::OK, Json(response)))
}

/// DELETE /makanan/{kategori}/{id}
#[tracing::instrument(skip_all, fields(%kategori, %id))]
pub async fn delete_food_item(
    State(state): State<Arc<CatalogState>>,
    Path((kategori, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ServerError> {
    let outcome = state
        .deletion
        .delete_entity(&food_kind(&kategori)?, &id)
        .await?;
    let response = ApiResponse::new(outcome).with_message("食品アイテムを削除しました");
    Ok((StatusCode::OK, Json(response)))
}

/// DELETE /makanan/{kategori}
#[tracing::instrument(skip_all, fields(%kategori))]
pub async fn delete_all_food_items(
    State(state): State<Arc<CatalogState>>,
    Path(kategori): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let report = state
        .deletion
        .delete_collection(&food_kind(&kategori)?)
        .await?;
    let response =
        ApiResponse::new(report).with_message(format!("カテゴリ {kategori} の食品アイテムを削除しました"));
    Ok((StatusCode::OK, Json(response)))
}
