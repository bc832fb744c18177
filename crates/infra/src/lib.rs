//! # NutriLens インフラ層
//!
//! 外部サービスとの通信と、カスケード削除の実行を担当する。
//!
//! ## 責務
//!
//! - **ドキュメントストア**: Firestore REST API クライアント
//! - **認証ストア**: Identity Toolkit（Firebase Auth）のアカウント作成・削除・再設定リンク発行
//! - **パスワード**: Argon2id によるハッシュ化と検証
//! - **ブロブストア**: Cloud Storage のオブジェクトのアップロードと削除
//! - **推論クライアント**: 画像分類エンドポイントの呼び出し
//! - **カスケード削除**: 上記ストアを束ねて、参照先ごと安全に削除する
//!
//! ## 依存関係
//!
//! ```text
//! server → infra → domain
//!    ↘               ↑
//!      ──────────────
//! ```
//!
//! ドメイン層はインフラ層に依存しない。
//!
//! ## モジュール構成
//!
//! - [`firestore`] - ドキュメントストア
//! - [`auth_store`] - 認証ストア
//! - [`blob_store`] - ブロブストア
//! - [`inference`] - 推論クライアント
//! - [`password`] - パスワードハッシュ
//! - [`deletion`] - カスケード削除コーディネーター
//! - [`gcp`] - アクセストークン取得と共通エラー処理
//! - [`error`] - インフラ層エラー定義

pub mod auth_store;
pub mod blob_store;
pub mod deletion;
pub mod error;
pub mod firestore;
pub mod gcp;
pub mod inference;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod password;

pub use error::InfraError;
