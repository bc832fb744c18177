//! # Google API 共通基盤
//!
//! アクセストークンの取得と、Google REST API のエラーレスポンスの解釈を提供する。
//!
//! ## トークンの取得元
//!
//! | 実装 | 用途 |
//! |------|------|
//! | [`StaticToken`] | 固定トークン、またはトークンなし（エミュレータ） |
//! | [`MetadataServerToken`] | Cloud Run / GCE のメタデータサーバー |

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::error::InfraError;

/// メタデータサーバーのトークンエンドポイント
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// 期限切れ前にトークンを更新する猶予
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// アクセストークンの取得元
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// 現在有効なアクセストークンを返す（認証不要なら `None`）
    async fn access_token(&self) -> Result<Option<String>, InfraError>;
}

/// 固定のアクセストークン
///
/// `None` の場合は Authorization ヘッダーを付与しない（エミュレータ向け）。
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self(token)
    }
}

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<Option<String>, InfraError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    expires_in:   u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token:      String,
    expires_at: Instant,
}

/// メタデータサーバーから取得するアクセストークン
///
/// 取得したトークンは期限の 60 秒前までキャッシュする。
pub struct MetadataServerToken {
    client: reqwest::Client,
    url:    String,
    cached: RwLock<Option<CachedToken>>,
}

impl MetadataServerToken {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_url(client, METADATA_TOKEN_URL)
    }

    pub fn with_url(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            cached: RwLock::new(None),
        }
    }

    async fn fetch(&self) -> Result<CachedToken, InfraError> {
        let response = self
            .client
            .get(&self.url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| InfraError::credentials(format!("メタデータサーバーに接続できません: {e}")))?;

        if !response.status().is_success() {
            return Err(InfraError::credentials(format!(
                "メタデータサーバーがエラーを返しました: {}",
                response.status()
            )));
        }

        let body: MetadataTokenResponse = response
            .json()
            .await
            .map_err(|e| InfraError::credentials(format!("トークン応答が不正です: {e}")))?;

        Ok(CachedToken {
            token:      body.access_token,
            expires_at: Instant::now() + Duration::from_secs(body.expires_in),
        })
    }
}

#[async_trait]
impl AccessTokenSource for MetadataServerToken {
    async fn access_token(&self) -> Result<Option<String>, InfraError> {
        let fresh = |cached: &CachedToken| cached.expires_at > Instant::now() + REFRESH_MARGIN;

        if let Some(cached) = self.cached.read().await.as_ref()
            && fresh(cached)
        {
            return Ok(Some(cached.token.clone()));
        }

        let mut guard = self.cached.write().await;
        // 待機中に他のタスクが更新済みの場合はそれを使う
        if let Some(cached) = guard.as_ref()
            && fresh(cached)
        {
            return Ok(Some(cached.token.clone()));
        }

        tracing::debug!("アクセストークンを更新");
        let token = self.fetch().await?;
        let value = token.token.clone();
        *guard = Some(token);
        Ok(Some(value))
    }
}

/// トークンがあれば Bearer 認証を付与する
pub(crate) async fn authorize(
    request: reqwest::RequestBuilder,
    tokens: &dyn AccessTokenSource,
) -> Result<reqwest::RequestBuilder, InfraError> {
    Ok(match tokens.access_token().await? {
        Some(token) => request.bearer_auth(token),
        None => request,
    })
}

/// Google API のエラーレスポンス
///
/// ```json
/// {"error": {"code": 404, "message": "...", "status": "NOT_FOUND"}}
/// ```
#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status:  Option<String>,
}

/// エラーボディからメッセージを取り出す
///
/// Google 形式でなければボディ全体を返す。
pub(crate) fn google_error_message(body: &str) -> String {
    match serde_json::from_str::<GoogleErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(status) if !status.is_empty() => {
                format!("{status}: {}", envelope.error.message)
            }
            _ => envelope.error.message,
        },
        Err(_) => body.to_string(),
    }
}

/// 失敗レスポンスを [`InfraError::upstream`] に変換する
pub(crate) async fn upstream_error(service: &'static str, response: reqwest::Response) -> InfraError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    InfraError::upstream(service, status, google_error_message(&body))
}
