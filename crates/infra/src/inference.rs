//! # 推論エンドポイントクライアント
//!
//! 画像をマルチパート（`file` フィールド）で送信し、分類結果を受け取る。
//! リクエストには `x-api-key` ヘッダーを付与する。

use async_trait::async_trait;
use bytes::Bytes;
use nutrilens_domain::prediction::Prediction;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::error::InfraError;

const SERVICE: &str = "inference";

/// 推論対象の画像
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name:    String,
    pub content_type: Option<String>,
    pub bytes:        Bytes,
}

/// 推論クライアントのインターフェース
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn predict(&self, image: ImageUpload) -> Result<Prediction, InfraError>;
}

/// HTTP 推論クライアント
#[derive(Clone)]
pub struct HttpInferenceClient {
    client:   reqwest::Client,
    endpoint: String,
    api_key:  String,
}

impl HttpInferenceClient {
    pub fn new(client: reqwest::Client, endpoint: &str, api_key: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    #[tracing::instrument(skip_all, level = "debug", fields(file_name = %image.file_name, size = image.bytes.len()))]
    async fn predict(&self, image: ImageUpload) -> Result<Prediction, InfraError> {
        let mut part = Part::bytes(image.bytes.to_vec()).file_name(image.file_name);
        if let Some(content_type) = image.content_type.as_deref() {
            part = part
                .mime_str(content_type)
                .map_err(|e| InfraError::invalid_input(format!("Content-Type が不正です: {e}")))?;
        }

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .multipart(Form::new().part("file", part))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(InfraError::upstream(SERVICE, status.as_u16(), body));
        }

        parse_prediction(status.as_u16(), &body)
    }
}

/// 推論応答を解釈する
///
/// `predicted_class` が空または欠落している場合は上流エラーとする。
fn parse_prediction(status: u16, body: &str) -> Result<Prediction, InfraError> {
    let value: Value = serde_json::from_str(body)?;

    let has_class = value
        .get("predicted_class")
        .and_then(Value::as_str)
        .is_some_and(|class| !class.trim().is_empty());
    if !has_class {
        return Err(InfraError::upstream(
            SERVICE,
            status,
            "推論結果に predicted_class が含まれていません",
        ));
    }

    Ok(serde_json::from_value(value)?)
}
