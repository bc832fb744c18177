//! # NutriLens サーバーライブラリ
//!
//! ルーター・ハンドラ・ユースケースを公開する。
//! 結合テストから `build_app` でルーターを組み立てられるようにする。

pub mod app_builder;
pub mod config;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod usecase;

pub use app_builder::{AppDeps, build_app};
pub use config::ServerConfig;
