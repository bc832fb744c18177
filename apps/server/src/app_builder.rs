//! # アプリケーション構築
//!
//! DI（ストア・ユースケース・State）の初期化とルーター構築を担当する。
//! `main.rs` は設定読み込みとサーバー起動に集中する。

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use nutrilens_domain::{
    clock::{Clock, SystemClock},
    reference::StorageBase,
};
use nutrilens_infra::{
    InfraError,
    auth_store::{AuthStore, IdentityToolkitAuthStore},
    blob_store::{BlobStore, CloudStorageBlobStore},
    deletion::{CleanupCoordinator, RetryPolicy},
    firestore::{DocumentStore, FirestoreClient},
    gcp::{AccessTokenSource, MetadataServerToken, StaticToken},
    inference::{HttpInferenceClient, InferenceClient},
    password::{Argon2PasswordChecker, PasswordChecker},
};
use nutrilens_shared::observability::{MakeRequestUuidV7, make_request_span};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    config::{GoogleAuthMode, ServerConfig},
    handler::{
        AccountState,
        CatalogState,
        DatabaseState,
        PredictState,
        UserState,
        create_article,
        create_food_item,
        delete_all_articles,
        delete_all_food_items,
        delete_all_users,
        delete_article,
        delete_database,
        delete_food_item,
        delete_user,
        forgot_password,
        get_article,
        get_database,
        get_food_item,
        get_user,
        health_check,
        list_articles,
        list_food_items,
        list_food_items_by_category,
        list_users,
        login,
        predict,
        register,
        update_article,
        update_food_item,
        update_user,
    },
    middleware::{ApiKeyState, require_api_key},
    usecase::{
        AccountUseCaseImpl,
        CatalogEditorUseCaseImpl,
        CatalogUseCaseImpl,
        DatabaseUseCaseImpl,
        DeletionUseCaseImpl,
        MAX_UPLOAD_BYTES,
        PredictionUseCaseImpl,
        UserUseCaseImpl,
    },
};

/// マルチパートのヘッダー等に許容する余裕
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// 外部 API 呼び出しのタイムアウト
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// ルーターが依存する外部ストアと設定
pub struct AppDeps {
    pub documents:     Arc<dyn DocumentStore>,
    pub auth:          Arc<dyn AuthStore>,
    pub blobs:         Arc<dyn BlobStore>,
    pub inference:     Arc<dyn InferenceClient>,
    pub passwords:     Arc<dyn PasswordChecker>,
    pub clock:         Arc<dyn Clock>,
    pub storage_base:  StorageBase,
    pub retry:         RetryPolicy,
    pub max_in_flight: usize,
    pub api_key:       String,
}

impl AppDeps {
    /// 設定から実サービスのクライアントを構築する
    pub fn from_config(config: &ServerConfig) -> Result<Self, InfraError> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        let tokens: Arc<dyn AccessTokenSource> = match &config.google_auth {
            GoogleAuthMode::Metadata => Arc::new(MetadataServerToken::new(client.clone())),
            GoogleAuthMode::Static(token) => Arc::new(StaticToken::new(Some(token.clone()))),
            GoogleAuthMode::None => Arc::new(StaticToken::default()),
        };

        Ok(Self {
            documents:     Arc::new(FirestoreClient::new(
                client.clone(),
                tokens.clone(),
                &config.firestore_base_url,
                &config.gcp_project_id,
            )),
            auth:          Arc::new(IdentityToolkitAuthStore::new(
                client.clone(),
                tokens.clone(),
                &config.identity_toolkit_base_url,
                &config.gcp_project_id,
            )),
            blobs:         Arc::new(CloudStorageBlobStore::new(
                client.clone(),
                tokens,
                &config.storage_api_base_url,
                &config.storage_bucket,
            )),
            inference:     Arc::new(HttpInferenceClient::new(
                client,
                &config.ml_backend_url,
                &config.api_key,
            )),
            passwords:     Arc::new(Argon2PasswordChecker::new()?),
            clock:         Arc::new(SystemClock),
            storage_base:  StorageBase::new(
                config.storage_public_base_url.as_str(),
                config.storage_bucket.as_str(),
            ),
            retry:         RetryPolicy::default().with_max_retries(config.cleanup_max_retries),
            max_in_flight: config.cleanup_max_in_flight,
            api_key:       config.api_key.clone(),
        })
    }
}

/// ユースケース → State → Router の順に組み立てる
///
/// `/health` 以外のルートは API キー認証を通す。
pub fn build_app(deps: AppDeps) -> Router {
    let coordinator = CleanupCoordinator::new(
        deps.documents.clone(),
        deps.auth.clone(),
        deps.blobs.clone(),
        deps.storage_base.clone(),
    )
    .with_retry_policy(deps.retry)
    .with_max_in_flight(deps.max_in_flight);
    let deletion = Arc::new(DeletionUseCaseImpl::new(Arc::new(coordinator)));
    let catalog = Arc::new(CatalogUseCaseImpl::new(deps.documents.clone()));

    let account_state = Arc::new(AccountState {
        usecase: AccountUseCaseImpl::new(
            deps.documents.clone(),
            deps.auth,
            deps.passwords,
            deps.clock.clone(),
        ),
    });
    let user_state = Arc::new(UserState {
        usecase:  UserUseCaseImpl::new(deps.documents.clone(), deps.clock.clone()),
        deletion: deletion.clone(),
    });
    let catalog_state = Arc::new(CatalogState {
        catalog:  catalog.clone(),
        editor:   CatalogEditorUseCaseImpl::new(
            deps.documents.clone(),
            deps.blobs,
            deps.storage_base,
            deps.clock,
        ),
        deletion: deletion.clone(),
    });
    let database_state = Arc::new(DatabaseState {
        snapshot: DatabaseUseCaseImpl::new(deps.documents),
        deletion,
    });
    let predict_state = Arc::new(PredictState {
        usecase: PredictionUseCaseImpl::new(deps.inference, catalog),
    });

    let upload_limit = DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES);

    let api = Router::new()
        // アカウント API
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/forgotPassword", post(forgot_password))
        .with_state(account_state)
        // ユーザー API
        .route("/users", get(list_users).delete(delete_all_users))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .with_state(user_state)
        // 記事 API
        .route(
            "/articles",
            get(list_articles)
                .post(create_article)
                .delete(delete_all_articles)
                .layer(upload_limit),
        )
        .route(
            "/articles/{id}",
            get(get_article)
                .put(update_article)
                .delete(delete_article)
                .layer(upload_limit),
        )
        // 食品 API
        .route(
            "/makanan",
            get(list_food_items).post(create_food_item).layer(upload_limit),
        )
        .route(
            "/makanan/{kategori}",
            get(list_food_items_by_category).delete(delete_all_food_items),
        )
        .route(
            "/makanan/{kategori}/{id}",
            get(get_food_item)
                .put(update_food_item)
                .delete(delete_food_item)
                .layer(upload_limit),
        )
        .with_state(catalog_state)
        // データベース全体
        .route("/database", get(get_database).delete(delete_database))
        .with_state(database_state)
        // 画像分類
        .route(
            "/predict",
            post(predict).layer(upload_limit),
        )
        .with_state(predict_state)
        .route_layer(from_fn_with_state(
            ApiKeyState::new(&deps.api_key),
            require_api_key,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(api)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
}
