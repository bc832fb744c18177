//! # サーバー設定
//!
//! 環境変数からサーバーの設定を読み込む。
//! 不正な値は、どの変数が原因かを含む [`ConfigError`] になる。

use std::env;

use thiserror::Error;

const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com";
const DEFAULT_IDENTITY_TOOLKIT_BASE_URL: &str = "https://identitytoolkit.googleapis.com";
const DEFAULT_STORAGE_BASE_URL: &str = "https://storage.googleapis.com";

/// 設定の読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    #[error("{name} の値が不正です: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Google API のアクセストークン取得方法
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoogleAuthMode {
    /// メタデータサーバーから取得する（Cloud Run / GCE）
    Metadata,
    /// `GOOGLE_ACCESS_TOKEN` の値を使う
    Static(String),
    /// トークンを付与しない（エミュレーター）
    None,
}

impl GoogleAuthMode {
    /// ログ用の名前（トークン値は含めない）
    pub fn name(&self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::Static(_) => "static",
            Self::None => "none",
        }
    }
}

/// サーバーの設定
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// バインドアドレス
    pub host:                      String,
    /// ポート番号
    pub port:                      u16,
    /// `x-api-key` ヘッダーの期待値
    pub api_key:                   String,
    pub gcp_project_id:            String,
    pub storage_bucket:            String,
    /// 推論エンドポイントの URL
    pub ml_backend_url:            String,
    pub firestore_base_url:        String,
    pub identity_toolkit_base_url: String,
    pub storage_api_base_url:      String,
    /// ドキュメントに保存された公開 URL の接頭辞
    pub storage_public_base_url:   String,
    pub google_auth:               GoogleAuthMode,
    /// カスケード削除で同時に処理するエンティティ数
    pub cleanup_max_in_flight:     usize,
    /// 一時的な障害のリトライ回数
    pub cleanup_max_retries:       u32,
}

impl ServerConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の変数ソースから設定を読み込む
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &'static str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));
        let or_default = |name: &'static str, default: &str| {
            var(name).unwrap_or_else(|| default.to_string())
        };

        let google_auth = match var("GOOGLE_AUTH_MODE").as_deref() {
            None | Some("metadata") => match var("GOOGLE_ACCESS_TOKEN") {
                Some(token) => GoogleAuthMode::Static(token),
                None => GoogleAuthMode::Metadata,
            },
            Some("static") => GoogleAuthMode::Static(required("GOOGLE_ACCESS_TOKEN")?),
            Some("none") => GoogleAuthMode::None,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name:  "GOOGLE_AUTH_MODE",
                    value: other.to_string(),
                });
            }
        };

        Ok(Self {
            host: or_default("HOST", "0.0.0.0"),
            port: parse_or("PORT", var("PORT"), 8080)?,
            api_key: required("API_KEY")?,
            gcp_project_id: required("GCP_PROJECT_ID")?,
            storage_bucket: required("STORAGE_BUCKET")?,
            ml_backend_url: required("ML_BACKEND_URL")?,
            firestore_base_url: or_default("FIRESTORE_BASE_URL", DEFAULT_FIRESTORE_BASE_URL),
            identity_toolkit_base_url: or_default(
                "IDENTITY_TOOLKIT_BASE_URL",
                DEFAULT_IDENTITY_TOOLKIT_BASE_URL,
            ),
            storage_api_base_url: or_default("STORAGE_API_BASE_URL", DEFAULT_STORAGE_BASE_URL),
            storage_public_base_url: or_default(
                "STORAGE_PUBLIC_BASE_URL",
                DEFAULT_STORAGE_BASE_URL,
            ),
            google_auth,
            cleanup_max_in_flight: parse_or(
                "CLEANUP_MAX_IN_FLIGHT",
                var("CLEANUP_MAX_IN_FLIGHT"),
                nutrilens_infra::deletion::DEFAULT_MAX_IN_FLIGHT,
            )?,
            cleanup_max_retries: parse_or(
                "CLEANUP_MAX_RETRIES",
                var("CLEANUP_MAX_RETRIES"),
                nutrilens_infra::deletion::retry::DEFAULT_MAX_RETRIES,
            )?,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
