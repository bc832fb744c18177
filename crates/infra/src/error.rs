//! # インフラ層エラー
//!
//! Firestore・Identity Toolkit・Cloud Storage・推論エンドポイントとの通信で
//! 起きたエラーを [`InfraError`] にまとめる。
//!
//! エラー本体（[`InfraErrorKind`]）に加え、生成時点の [`SpanTrace`] を保持する。
//! `From` 実装と各コンストラクタはすべて [`InfraError::from_kind`] を通るので、
//! どの経路で作っても呼び出し経路が記録される。
//!
//! 上流の HTTP ステータスは加工せずに残す。カスケード削除のリトライ判定
//! （[`InfraError::is_transient`]）はこれを見る。

use std::fmt;

use derive_more::Display;
use thiserror::Error;
use tracing_error::SpanTrace;

/// インフラ層のエラー
///
/// 種別での分岐は [`kind()`](InfraError::kind) で行う。
#[derive(Display)]
#[display("{kind}")]
pub struct InfraError {
    kind:       InfraErrorKind,
    span_trace: SpanTrace,
}

#[derive(Debug, Error)]
pub enum InfraErrorKind {
    /// 接続失敗・タイムアウト・ボディ読み取り失敗
    #[error("HTTP 通信エラー: {0}")]
    Http(#[source] reqwest::Error),

    /// 上流がエラーステータスを返した
    #[error("{service} がエラーを返しました（{status}）: {message}")]
    Upstream {
        /// "firestore" / "auth" / "storage" / "inference"
        service: &'static str,
        status:  u16,
        message: String,
    },

    #[error("JSON の変換に失敗: {0}")]
    Serialization(#[source] serde_json::Error),

    /// アクセストークンを取得できない
    #[error("認証情報の取得に失敗: {0}")]
    Credentials(String),

    /// 呼び出し側が渡した値で要求を組み立てられない
    #[error("入力エラー: {0}")]
    InvalidInput(String),

    /// 上流の応答やストアの値が想定した形をしていない
    #[error("不正なデータ: {0}")]
    Malformed(String),

    /// パスワードのハッシュ化・検証の失敗（保存値が PHC 形式でない場合を含む）
    #[error("パスワードハッシュの処理に失敗: {0}")]
    Password(String),
}

impl InfraError {
    /// 種別から生成し、現在のスパンを記録する
    pub fn from_kind(kind: InfraErrorKind) -> Self {
        Self {
            kind,
            span_trace: SpanTrace::capture(),
        }
    }

    pub fn upstream(service: &'static str, status: u16, message: impl Into<String>) -> Self {
        Self::from_kind(InfraErrorKind::Upstream {
            service,
            status,
            message: message.into(),
        })
    }

    pub fn credentials(msg: impl Into<String>) -> Self {
        Self::from_kind(InfraErrorKind::Credentials(msg.into()))
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::from_kind(InfraErrorKind::InvalidInput(msg.into()))
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::from_kind(InfraErrorKind::Malformed(msg.into()))
    }

    pub fn password(msg: impl Into<String>) -> Self {
        Self::from_kind(InfraErrorKind::Password(msg.into()))
    }

    pub fn kind(&self) -> &InfraErrorKind {
        &self.kind
    }

    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// 上流の HTTP ステータス（`Upstream` 以外は `None`）
    pub fn upstream_status(&self) -> Option<u16> {
        match &self.kind {
            InfraErrorKind::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// リトライで回復しうる障害か
    ///
    /// 通信エラー（デコード失敗・リクエスト構築失敗を除く）と、上流の 429 / 5xx。
    pub fn is_transient(&self) -> bool {
        match &self.kind {
            InfraErrorKind::Http(e) => !(e.is_decode() || e.is_builder()),
            InfraErrorKind::Upstream { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl fmt::Debug for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfraError")
            .field("kind", &self.kind)
            .field("span_trace", &self.span_trace)
            .finish()
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

impl From<reqwest::Error> for InfraError {
    fn from(source: reqwest::Error) -> Self {
        Self::from_kind(InfraErrorKind::Http(source))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(source: serde_json::Error) -> Self {
        Self::from_kind(InfraErrorKind::Serialization(source))
    }
}
