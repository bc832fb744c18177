//! アカウントユースケース
//!
//! ユーザー登録・ログイン・パスワード再設定リンクの発行。
//!
//! 認証アカウントは Firebase Auth に作成し、プロフィールとパスワードハッシュは
//! `users` ドキュメントに保存する。ログインはドキュメントのハッシュで照合する。

use std::sync::Arc;

use nutrilens_domain::{
    account::{self, LoginRequest, PasswordResetRequest, Registration},
    clock::Clock,
    collection::{DocumentId, DocumentRef, EntityKind},
    document::DocumentRecord,
    password::PasswordHash,
};
use nutrilens_infra::{
    auth_store::{AccountCreation, AuthStore},
    error::InfraErrorKind,
    firestore::DocumentStore,
    password::PasswordChecker,
};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ServerError;

/// アカウントユースケース
pub struct AccountUseCaseImpl {
    documents: Arc<dyn DocumentStore>,
    auth:      Arc<dyn AuthStore>,
    passwords: Arc<dyn PasswordChecker>,
    clock:     Arc<dyn Clock>,
}

impl AccountUseCaseImpl {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        auth: Arc<dyn AuthStore>,
        passwords: Arc<dyn PasswordChecker>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            documents,
            auth,
            passwords,
            clock,
        }
    }

    /// ユーザーを登録し、保存したプロフィール（ハッシュを除く）を返す
    ///
    /// 1. 入力を検証し、年齢・BMI を計算
    /// 2. Firebase Auth にアカウントを作成
    /// 3. `users/{user_id}` にプロフィールとハッシュを保存
    ///
    /// 3 が失敗した場合は 2 で作成したアカウントを削除する。
    pub async fn register(&self, registration: Registration) -> Result<DocumentRecord, ServerError> {
        let new_account = registration.validate(self.clock.today())?;
        let hash = self.passwords.hash(&new_account.password)?;

        let uid = match self
            .auth
            .create_user(&new_account.email, &new_account.password)
            .await?
        {
            AccountCreation::Created(uid) => uid,
            AccountCreation::EmailExists => {
                return Err(ServerError::Conflict(format!(
                    "メールアドレスは既に使用されています: {}",
                    new_account.email
                )));
            }
        };

        let user_id = DocumentId::new(Uuid::now_v7().simple().to_string())?;
        let doc = DocumentRef::new(EntityKind::User.collection()?, user_id.clone());

        let mut fields = new_account.profile;
        fields.insert(account::fields::USER_ID.to_string(), Value::from(user_id.as_str()));
        fields.insert(
            account::fields::FIREBASE_UID.to_string(),
            Value::from(uid.as_str()),
        );
        fields.insert(
            account::fields::PASSWORD.to_string(),
            Value::from(hash.into_string()),
        );

        let stored = match self.documents.set_document(&doc, &fields).await {
            Ok(stored) => stored,
            Err(e) => {
                if let Err(rollback) = self.auth.delete_user(&uid).await {
                    tracing::warn!(
                        firebase_uid = %uid,
                        error = %rollback,
                        "登録失敗後の認証アカウント削除に失敗"
                    );
                }
                return Err(e.into());
            }
        };

        tracing::info!(user_id = %user_id, firebase_uid = %uid, "ユーザーを登録");
        Ok(account::without_credentials(stored))
    }

    /// メールアドレスとパスワードで照合し、ユーザー（ハッシュを除く）を返す
    ///
    /// # エラー
    ///
    /// - メールアドレスのユーザーがいない: `NotFound`
    /// - ドキュメントにハッシュか UID がない、ハッシュが Argon2 形式でない: `BadRequest`
    /// - パスワード不一致: `InvalidPassword`
    pub async fn login(&self, request: LoginRequest) -> Result<DocumentRecord, ServerError> {
        let (email, password) = request.into_credentials()?;
        let users = EntityKind::User.collection()?;

        let found = self
            .documents
            .find_by_field(&users, account::fields::EMAIL, &Value::from(email.as_str()), 1)
            .await?;
        let Some(user) = found.into_iter().next() else {
            return Err(ServerError::NotFound(format!(
                "ユーザーが見つかりません: {email}"
            )));
        };

        let (Some(stored_hash), Some(_)) = (
            user.string_field(account::fields::PASSWORD),
            user.string_field(account::fields::FIREBASE_UID),
        ) else {
            return Err(invalid_user_data(&user));
        };

        let verified = match self
            .passwords
            .verify(&password, &PasswordHash::new(stored_hash))
        {
            Ok(result) => result,
            Err(e) if matches!(e.kind(), InfraErrorKind::Password(_)) => {
                tracing::warn!(user_id = %user.id, error = %e, "保存済みのパスワードハッシュを検証できません");
                return Err(invalid_user_data(&user));
            }
            Err(e) => return Err(e.into()),
        };
        if verified.is_mismatch() {
            return Err(ServerError::InvalidPassword);
        }

        tracing::info!(user_id = %user.id, "ログイン");
        Ok(account::without_credentials(user))
    }

    /// パスワード再設定リンクを発行する
    pub async fn password_reset_link(
        &self,
        request: PasswordResetRequest,
    ) -> Result<String, ServerError> {
        let email = request.into_email()?;

        self.auth
            .password_reset_link(&email)
            .await?
            .ok_or_else(|| ServerError::NotFound(format!("メールアドレスが登録されていません: {email}")))
    }
}

fn invalid_user_data(user: &DocumentRecord) -> ServerError {
    ServerError::BadRequest(format!("ユーザーデータが不正です: {}", user.id))
}
