//! # 画像分類ハンドラ
//!
//! ```text
//! POST /predict   (multipart/form-data, フィールド名 `file`)
//! ```

use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use nutrilens_infra::inference::ImageUpload;
use nutrilens_shared::ApiResponse;

use super::form::multipart_error;
use crate::{error::ServerError, usecase::PredictionUseCaseImpl};

const FILE_FIELD: &str = "file";

pub struct PredictState {
    pub usecase: PredictionUseCaseImpl,
}

/// POST /predict
#[tracing::instrument(skip_all)]
pub async fn predict(
    State(state): State<Arc<PredictState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ServerError> {
    let image = read_image(multipart).await?;
    tracing::debug!(file_name = %image.file_name, size = image.bytes.len(), "画像を受信");

    let result = state.usecase.predict(image).await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(result))))
}

/// `file` フィールドを読み取る
async fn read_image(mut multipart: Multipart) -> Result<ImageUpload, ServerError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        return Ok(ImageUpload {
            file_name,
            content_type,
            bytes,
        });
    }

    Err(ServerError::BadRequest(
        "file フィールドが含まれていません".to_string(),
    ))
}
