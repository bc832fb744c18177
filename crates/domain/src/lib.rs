//! # NutriLens ドメイン層
//!
//! 外部ストアにまたがるカスケード削除と、ユーザープロフィール・推論結果の
//! ドメインモデルを定義する。
//!
//! ## 依存関係の方向
//!
//! ```text
//! server → infra → domain
//! ```
//!
//! ドメイン層はインフラ層（ドキュメント DB、認証、ストレージ）には
//! 一切依存しない。外部参照の解釈や削除結果の集計は純粋な値として扱う。
//!
//! ## モジュール構成
//!
//! - [`account`] - ユーザー登録・ログイン・パスワード再設定の入力値
//! - [`clock`] - 時刻プロバイダ
//! - [`collection`] - コレクション・ドキュメントの識別と参照スキーマ
//! - [`document`] - ドキュメントレコード
//! - [`reference`] - ストレージオブジェクト・認証プリンシパルの識別子
//! - [`deletion`] - 削除計画・削除結果・一括削除レポート
//! - [`password`] - 平文パスワードとハッシュ
//! - [`profile`] - ユーザープロフィールの部分更新
//! - [`prediction`] - 画像分類の推論結果
//! - [`error`] - ドメイン層で発生するエラーの定義
//!
//! ## 使用例
//!
//! ```rust
//! use nutrilens_domain::{DomainError, collection::EntityKind};
//!
//! let spec = EntityKind::User.spec().unwrap();
//! assert_eq!(spec.path.as_str(), "users");
//!
//! let error = DomainError::NotFound {
//!     entity_type: "User",
//!     id:          "u1".to_string(),
//! };
//! ```

pub mod account;
pub mod clock;
pub mod collection;
pub mod deletion;
pub mod document;
pub mod error;
pub mod password;
pub mod prediction;
pub mod profile;
pub mod reference;

pub use error::DomainError;
