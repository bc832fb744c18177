//! # ユースケース層
//!
//! ハンドラから呼ばれるアプリケーションロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: ストアを `Arc<dyn Trait>` で外部から注入
//! - **薄いハンドラ**: ハンドラは入出力の変換のみを行い、ロジックはユースケースに集約

pub mod account;
pub mod catalog;
pub mod catalog_editor;
pub mod database;
pub mod deletion;
pub mod prediction;
pub mod user;

pub use account::AccountUseCaseImpl;
pub use catalog::CatalogUseCaseImpl;
pub use catalog_editor::{ArticleForm, CatalogEditorUseCaseImpl, FoodItemForm};
pub use database::DatabaseUseCaseImpl;
pub use deletion::DeletionUseCaseImpl;
pub use prediction::{MAX_UPLOAD_BYTES, PredictionUseCaseImpl};
pub use user::UserUseCaseImpl;
