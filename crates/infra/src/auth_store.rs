//! # 認証ストア（Firebase Auth / Identity Toolkit）
//!
//! 認証プリンシパル（ユーザーアカウント）の作成・削除と、パスワード再設定リンクの発行。
//! 既に存在しないアカウントの削除は成功（[`Removal::AlreadyAbsent`]）として扱う。
//!
//! | 操作 | API |
//! |------|-----|
//! | 作成 | `POST /v1/projects/{project}/accounts` |
//! | 削除 | `POST /v1/projects/{project}/accounts:delete` |
//! | 再設定リンク | `POST /v1/projects/{project}/accounts:sendOobCode`（`returnOobLink`） |

use std::sync::Arc;

use async_trait::async_trait;
use nutrilens_domain::{account::Email, password::PlainPassword, reference::PrincipalId};
use serde::Deserialize;
use serde_json::json;

use crate::{
    deletion::Removal,
    error::InfraError,
    gcp::{AccessTokenSource, authorize, google_error_message},
};

const SERVICE: &str = "auth";

/// Identity Toolkit が返す「ユーザーが存在しない」エラー
const USER_NOT_FOUND: &str = "USER_NOT_FOUND";
/// 作成時のメールアドレス重複
const EMAIL_EXISTS: &str = "EMAIL_EXISTS";
/// 再設定リンク発行時の未登録メールアドレス
const EMAIL_NOT_FOUND: &str = "EMAIL_NOT_FOUND";

/// アカウント作成の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountCreation {
    Created(PrincipalId),
    /// 同じメールアドレスのアカウントが既にある
    EmailExists,
}

/// 認証ストアのインターフェース
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// メールアドレスとパスワードでアカウントを作成する
    async fn create_user(
        &self,
        email: &Email,
        password: &PlainPassword,
    ) -> Result<AccountCreation, InfraError>;

    /// 認証プリンシパルを削除する
    async fn delete_user(&self, uid: &PrincipalId) -> Result<Removal, InfraError>;

    /// パスワード再設定リンクを発行する（未登録のメールアドレスなら `None`）
    ///
    /// メールは送信せず、リンクだけを返す。
    async fn password_reset_link(&self, email: &Email) -> Result<Option<String>, InfraError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OobCodeResponse {
    oob_link: Option<String>,
}

enum Reply {
    Success(reqwest::Response),
    Failure { status: u16, message: String },
}

/// Identity Toolkit REST クライアント
#[derive(Clone)]
pub struct IdentityToolkitAuthStore {
    client:   reqwest::Client,
    tokens:   Arc<dyn AccessTokenSource>,
    base_url: String,
    project:  String,
}

impl IdentityToolkitAuthStore {
    /// # 引数
    ///
    /// - `base_url`: 例 `https://identitytoolkit.googleapis.com`（エミュレータなら
    ///   `http://localhost:9099/identitytoolkit.googleapis.com`）
    pub fn new(
        client: reqwest::Client,
        tokens: Arc<dyn AccessTokenSource>,
        base_url: &str,
        project_id: &str,
    ) -> Self {
        Self {
            client,
            tokens,
            base_url: base_url.trim_end_matches('/').to_string(),
            project: project_id.to_string(),
        }
    }

    /// `accounts` リソースの URL（`suffix` は `:delete` など）
    fn accounts_url(&self, suffix: &str) -> String {
        format!(
            "{}/v1/projects/{}/accounts{suffix}",
            self.base_url,
            urlencoding::encode(&self.project)
        )
    }

    /// JSON を POST する
    ///
    /// エラーステータスはエラーメッセージを取り出して [`Reply::Failure`] で返す。
    /// 呼び出し側がメッセージで分類する。
    async fn post(&self, url: String, body: serde_json::Value) -> Result<Reply, InfraError> {
        let request = self.client.post(url).json(&body);
        let response = authorize(request, self.tokens.as_ref()).await?.send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(Reply::Success(response));
        }

        let body = response.text().await.unwrap_or_default();
        Ok(Reply::Failure {
            status:  status.as_u16(),
            message: google_error_message(&body),
        })
    }
}

#[async_trait]
impl AuthStore for IdentityToolkitAuthStore {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn create_user(
        &self,
        email: &Email,
        password: &PlainPassword,
    ) -> Result<AccountCreation, InfraError> {
        let body = json!({ "email": email.as_str(), "password": password.as_str() });

        match self.post(self.accounts_url(""), body).await? {
            Reply::Success(response) => {
                let created: SignUpResponse = response.json().await?;
                let uid = PrincipalId::new(created.local_id)
                    .map_err(|e| InfraError::malformed(e.to_string()))?;
                Ok(AccountCreation::Created(uid))
            }
            Reply::Failure { message, .. } if message.contains(EMAIL_EXISTS) => {
                Ok(AccountCreation::EmailExists)
            }
            Reply::Failure { status, message } => Err(InfraError::upstream(SERVICE, status, message)),
        }
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%uid))]
    async fn delete_user(&self, uid: &PrincipalId) -> Result<Removal, InfraError> {
        let body = json!({ "localId": uid.as_str() });

        match self.post(self.accounts_url(":delete"), body).await? {
            Reply::Success(_) => Ok(Removal::Deleted),
            Reply::Failure { status, message } => classify_delete_failure(status, message),
        }
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn password_reset_link(&self, email: &Email) -> Result<Option<String>, InfraError> {
        let body = json!({
            "requestType": "PASSWORD_RESET",
            "email": email.as_str(),
            "returnOobLink": true,
        });

        match self.post(self.accounts_url(":sendOobCode"), body).await? {
            Reply::Success(response) => {
                let issued: OobCodeResponse = response.json().await?;
                issued
                    .oob_link
                    .map(Some)
                    .ok_or_else(|| InfraError::malformed("oobLink がありません"))
            }
            Reply::Failure { message, .. } if message.contains(EMAIL_NOT_FOUND) => Ok(None),
            Reply::Failure { status, message } => Err(InfraError::upstream(SERVICE, status, message)),
        }
    }
}

/// 削除の失敗レスポンスを分類する
///
/// `USER_NOT_FOUND` は削除済みとみなす。
fn classify_delete_failure(status: u16, message: String) -> Result<Removal, InfraError> {
    if message.contains(USER_NOT_FOUND) {
        return Ok(Removal::AlreadyAbsent);
    }
    Err(InfraError::upstream(SERVICE, status, message))
}
