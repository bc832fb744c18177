//! # 外部参照
//!
//! ドキュメントが指すストレージオブジェクトと認証プリンシパルの識別子。
//!
//! ストレージ参照は公開 URL（`https://storage.googleapis.com/{bucket}/users/a.png`）
//! として保存されていることが多い。既知のプレフィックスを取り除いて
//! オブジェクトパスへ変換する。

use derive_more::Display;
use serde::Serialize;

use crate::DomainError;

/// ストレージの公開 URL 構成
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageBase {
    /// 公開ベース URL（例: `https://storage.googleapis.com`）
    pub public_base: String,
    /// バケット名
    pub bucket:      String,
}

impl StorageBase {
    pub fn new(public_base: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            public_base: public_base.into(),
            bucket:      bucket.into(),
        }
    }

    /// 公開 URL のプレフィックス（`{public_base}/{bucket}/`）
    pub fn public_prefix(&self) -> String {
        format!(
            "{}/{}/",
            self.public_base.trim_end_matches('/'),
            self.bucket
        )
    }

    /// オブジェクトの公開 URL
    ///
    /// [`BlobLocator::from_stored_value`] で元のオブジェクトパスに戻せる形。
    pub fn public_url(&self, locator: &BlobLocator) -> String {
        format!("{}{}", self.public_prefix(), locator.as_str())
    }

    /// `gs://` 形式のプレフィックス
    fn gs_prefix(&self) -> String {
        format!("gs://{}/", self.bucket)
    }
}

/// ストレージオブジェクトのパス（値オブジェクト）
///
/// バケット内のオブジェクト名。先頭の `/` は含まない。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize)]
#[display("{_0}")]
pub struct BlobLocator(String);

impl BlobLocator {
    pub fn new(path: impl Into<String>) -> Result<Self, DomainError> {
        let path = path.into();
        let path = path.trim().trim_start_matches('/');

        if path.is_empty() {
            return Err(DomainError::Validation(
                "オブジェクトパスは必須です".to_string(),
            ));
        }

        Ok(Self(path.to_string()))
    }

    /// ドキュメントに保存された値からオブジェクトパスを導出する
    ///
    /// - `{public_base}/{bucket}/` または `gs://{bucket}/` で始まる URL はプレフィックスを除去
    /// - スキームを持たない値はそのままオブジェクトパスとして扱う
    /// - それ以外の URL は解決できないため `Validation` エラー
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use nutrilens_domain::reference::{BlobLocator, StorageBase};
    ///
    /// let base = StorageBase::new("https://storage.googleapis.com", "nutrilens");
    /// let locator = BlobLocator::from_stored_value(
    ///     "https://storage.googleapis.com/nutrilens/users/a.png",
    ///     &base,
    /// )
    /// .unwrap();
    /// assert_eq!(locator.as_str(), "users/a.png");
    /// ```
    pub fn from_stored_value(value: &str, base: &StorageBase) -> Result<Self, DomainError> {
        let value = value.trim();

        for prefix in [base.public_prefix(), base.gs_prefix()] {
            if let Some(path) = value.strip_prefix(prefix.as_str()) {
                return Self::new(path);
            }
        }

        if value.contains("://") {
            return Err(DomainError::Validation(format!(
                "ストレージ参照を解決できません: {value}"
            )));
        }

        Self::new(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 認証プリンシパル ID（値オブジェクト）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize)]
#[display("{_0}")]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();

        if value.is_empty() {
            return Err(DomainError::Validation(
                "プリンシパル ID は必須です".to_string(),
            ));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
