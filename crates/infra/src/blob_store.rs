//! # ブロブストア（Cloud Storage）
//!
//! Cloud Storage JSON API でオブジェクトをアップロード・削除する。
//!
//! - アップロードは `uploadType=media` の単一リクエストで、`predefinedAcl=publicRead` を付けて公開する
//! - 削除の 404 は削除済み（[`Removal::AlreadyAbsent`]）として扱う

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use nutrilens_domain::reference::BlobLocator;

use crate::{
    deletion::Removal,
    error::InfraError,
    gcp::{AccessTokenSource, authorize, upstream_error},
};

const SERVICE: &str = "storage";

/// ブロブストアのインターフェース
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// オブジェクトを公開状態で書き込む（既存なら上書き）
    async fn upload_object(
        &self,
        locator: &BlobLocator,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<(), InfraError>;

    /// オブジェクトを削除する
    async fn delete_object(&self, locator: &BlobLocator) -> Result<Removal, InfraError>;
}

/// Cloud Storage JSON API クライアント
#[derive(Clone)]
pub struct CloudStorageBlobStore {
    client:   reqwest::Client,
    tokens:   Arc<dyn AccessTokenSource>,
    base_url: String,
    bucket:   String,
}

impl CloudStorageBlobStore {
    pub fn new(
        client: reqwest::Client,
        tokens: Arc<dyn AccessTokenSource>,
        base_url: &str,
        bucket: &str,
    ) -> Self {
        Self {
            client,
            tokens,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
        }
    }

    /// オブジェクト名は `/` を含めて URL エンコードする
    fn object_url(&self, locator: &BlobLocator) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            urlencoding::encode(locator.as_str())
        )
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/upload/storage/v1/b/{}/o",
            self.base_url,
            urlencoding::encode(&self.bucket)
        )
    }
}

#[async_trait]
impl BlobStore for CloudStorageBlobStore {
    #[tracing::instrument(skip_all, level = "debug", fields(%locator, size = bytes.len()))]
    async fn upload_object(
        &self,
        locator: &BlobLocator,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<(), InfraError> {
        let request = self
            .client
            .post(self.upload_url())
            .query(&[
                ("uploadType", "media"),
                ("name", locator.as_str()),
                ("predefinedAcl", "publicRead"),
            ])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);
        let response = authorize(request, self.tokens.as_ref()).await?.send().await?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(upstream_error(SERVICE, response).await)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%locator))]
    async fn delete_object(&self, locator: &BlobLocator) -> Result<Removal, InfraError> {
        let request = self.client.delete(self.object_url(locator));
        let response = authorize(request, self.tokens.as_ref()).await?.send().await?;

        match response.status() {
            status if status.is_success() => Ok(Removal::Deleted),
            reqwest::StatusCode::NOT_FOUND => Ok(Removal::AlreadyAbsent),
            _ => Err(upstream_error(SERVICE, response).await),
        }
    }
}
