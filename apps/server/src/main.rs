//! # NutriLens API サーバー
//!
//! 栄養管理アプリのバックエンド。アカウント登録・ログイン、ユーザー・記事・食品カタログの参照と編集、
//! 外部ストアにまたがるカスケード削除、画像分類を提供する。
//!
//! ## 構成
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────────────┐
//! │   クライアント  │────▶│  API サーバー │────▶│ Firestore            │
//! └──────────────┘     └──────────────┘     │ Firebase Auth        │
//!                             │             │ Cloud Storage        │
//!                             ▼             └──────────────────────┘
//!                      ┌──────────────┐
//!                      │  推論サーバー  │
//!                      └──────────────┘
//! ```
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `PORT` | No | ポート番号（デフォルト: `8080`） |
//! | `API_KEY` | **Yes** | `x-api-key` ヘッダーの期待値 |
//! | `GCP_PROJECT_ID` | **Yes** | GCP プロジェクト ID |
//! | `STORAGE_BUCKET` | **Yes** | Cloud Storage バケット名 |
//! | `ML_BACKEND_URL` | **Yes** | 推論エンドポイント URL |
//! | `GOOGLE_AUTH_MODE` | No | `metadata` / `static` / `none` |
//! | `LOG_FORMAT` | No | `json` / `pretty` |
//!
//! その他の変数は [`ServerConfig`] を参照。
//!
//! ## 起動方法
//!
//! ```bash
//! # エミュレーター
//! GOOGLE_AUTH_MODE=none FIRESTORE_BASE_URL=http://localhost:8081 cargo run -p nutrilens-server
//! ```

use std::net::SocketAddr;

use anyhow::Context;
use nutrilens_server::{AppDeps, ServerConfig, build_app};
use nutrilens_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    init_tracing(TracingConfig::from_env("nutrilens-server"));

    let config = ServerConfig::from_env().context("設定の読み込みに失敗しました")?;
    tracing::info!(
        project = %config.gcp_project_id,
        bucket = %config.storage_bucket,
        auth_mode = config.google_auth.name(),
        "API サーバーを起動します"
    );

    let deps = AppDeps::from_config(&config).context("外部サービスのクライアントの初期化に失敗しました")?;
    let app = build_app(deps);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("バインドアドレスが不正です")?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API サーバーが起動しました");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Ctrl+C を待つ
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "シグナルの待機に失敗");
    }
    tracing::info!("シャットダウンします");
}
