//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュール（この `handler.rs`）で re-export し、フラットな API を提供
//! - ハンドラは薄く保ち、ロジックはユースケースに委譲

pub mod account;
pub mod article;
pub mod database;
pub mod food;
pub mod form;
pub mod health;
pub mod predict;
pub mod user;

pub use account::{AccountState, forgot_password, login, register};
pub use article::{
    CatalogState,
    create_article,
    delete_all_articles,
    delete_article,
    get_article,
    list_articles,
    update_article,
};
pub use database::{DatabaseState, delete_database, get_database};
pub use food::{
    create_food_item,
    delete_all_food_items,
    delete_food_item,
    get_food_item,
    list_food_items,
    list_food_items_by_category,
    update_food_item,
};
pub use health::health_check;
pub use predict::{PredictState, predict};
pub use user::{UserState, delete_all_users, delete_user, get_user, list_users, update_user};
