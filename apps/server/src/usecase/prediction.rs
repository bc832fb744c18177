//! 画像分類ユースケース
//!
//! 推論結果のクラス名で食品アイテムを引き当てる。

use std::sync::Arc;

use nutrilens_domain::prediction::PredictionResult;
use nutrilens_infra::inference::{ImageUpload, InferenceClient};

use super::catalog::CatalogUseCaseImpl;
use crate::error::ServerError;

/// アップロード画像の上限サイズ
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// 空の画像と上限を超える画像を拒否する
pub(crate) fn validate_image(image: &ImageUpload) -> Result<(), ServerError> {
    if image.bytes.is_empty() {
        return Err(ServerError::BadRequest("画像ファイルが空です".to_string()));
    }
    if image.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ServerError::PayloadTooLarge(format!(
            "{MAX_UPLOAD_BYTES} バイトを超える画像はアップロードできません"
        )));
    }
    Ok(())
}

/// 画像分類ユースケース
pub struct PredictionUseCaseImpl {
    inference: Arc<dyn InferenceClient>,
    catalog:   Arc<CatalogUseCaseImpl>,
}

impl PredictionUseCaseImpl {
    pub fn new(inference: Arc<dyn InferenceClient>, catalog: Arc<CatalogUseCaseImpl>) -> Self {
        Self { inference, catalog }
    }

    pub async fn predict(&self, image: ImageUpload) -> Result<PredictionResult, ServerError> {
        validate_image(&image)?;

        let prediction = self
            .inference
            .predict(image)
            .await
            .map_err(ServerError::BadGateway)?;

        let food_info = self
            .catalog
            .find_food_by_name(&prediction.predicted_class)
            .await?;
        if food_info.is_none() {
            tracing::info!(
                predicted_class = %prediction.predicted_class,
                "推論結果に一致する食品アイテムがありません"
            );
        }

        Ok(PredictionResult::new(prediction, food_info))
    }
}
