//! API 結合テスト
//!
//! `build_app` で組み立てたルーターをインメモリストアで駆動し、
//! 認証・レスポンス形式・アカウント・カタログ編集・カスケード削除の
//! HTTP 上の振る舞いを検証する。
//!
//! 実行方法:
//! ```bash
//! cargo test -p nutrilens-server --test api_test
//! ```

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use chrono::{TimeZone, Utc};
use nutrilens_domain::{clock::FixedClock, prediction::Prediction, reference::StorageBase};
use nutrilens_infra::{
    InfraError,
    deletion::RetryPolicy,
    inference::{ImageUpload, InferenceClient},
    mock::{InMemoryAuthStore, InMemoryBlobStore, InMemoryDocumentStore, InjectedFailure},
    password::Argon2PasswordChecker,
};
use nutrilens_server::{AppDeps, build_app, middleware::API_KEY_HEADER};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

const API_KEY: &str = "test-api-key";
const BOUNDARY: &str = "nutrilens-boundary";
const JPEG: &[u8] = b"\xff\xd8\xff";
const PUBLIC_PREFIX: &str = "https://storage.googleapis.com/nutrilens-bucket/";

/// 推論クライアントのスタブ（常に同じクラスを返す）
struct StubInference {
    predicted_class: Option<String>,
}

#[async_trait]
impl InferenceClient for StubInference {
    async fn predict(&self, _image: ImageUpload) -> Result<Prediction, InfraError> {
        match &self.predicted_class {
            Some(class) => Ok(Prediction {
                predicted_class: class.clone(),
                confidence:      Some(0.87),
            }),
            None => Err(InfraError::upstream("inference", 200, "predicted_class なし")),
        }
    }
}

struct TestApp {
    documents: InMemoryDocumentStore,
    auth:      InMemoryAuthStore,
    blobs:     InMemoryBlobStore,
    inference: Option<String>,
}

impl TestApp {
    fn new() -> Self {
        Self {
            documents: InMemoryDocumentStore::new(),
            auth:      InMemoryAuthStore::new(),
            blobs:     InMemoryBlobStore::new(),
            inference: Some("Apel".to_string()),
        }
    }

    fn router(&self) -> Router {
        build_app(AppDeps {
            documents:     Arc::new(self.documents.clone()),
            auth:          Arc::new(self.auth.clone()),
            blobs:         Arc::new(self.blobs.clone()),
            inference:     Arc::new(StubInference {
                predicted_class: self.inference.clone(),
            }),
            passwords:     Arc::new(Argon2PasswordChecker::with_params(1024, 1, 1).unwrap()),
            clock:         Arc::new(FixedClock::new(
                Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            )),
            storage_base:  StorageBase::new("https://storage.googleapis.com", "nutrilens-bucket"),
            retry:         RetryPolicy {
                max_retries:     1,
                initial_backoff: Duration::ZERO,
                max_backoff:     Duration::ZERO,
            },
            max_in_flight: 4,
            api_key:       API_KEY.to_string(),
        })
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router().oneshot(request).await.unwrap()
    }
}

fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(API_KEY_HEADER, API_KEY)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(API_KEY_HEADER, API_KEY)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// テキスト項目と任意のファイル項目（項目名・ファイル名・内容）を持つフォーム
fn form_request(
    method: Method,
    uri: &str,
    texts: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in texts {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((field, file_name, content)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(API_KEY_HEADER, API_KEY)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn multipart_request(field: &str, content: &[u8]) -> Request<Body> {
    form_request(
        Method::POST,
        "/predict",
        &[],
        Some((field, "food.jpg", content)),
    )
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ===== 認証・共通 =====

#[tokio::test]
async fn test_healthはapiキーなしで応答する() {
    let app = TestApp::new();

    let response = app
        .send(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_apiキーがなければ401のproblem_detailsを返す() {
    let app = TestApp::new();

    let response = app
        .send(
            Request::builder()
                .method(Method::DELETE)
                .uri("/users/u1")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["status"], 401);
    assert_eq!(body["title"], "Unauthorized");
    assert!(app.documents.calls().is_empty());
}

// ===== アカウント =====

fn registration() -> Value {
    json!({
        "name": "Siti",
        "email": "siti@example.com",
        "password": "rahasia123",
        "birthdate": "2000-01-15",
        "weight": 64,
        "height": 160
    })
}

#[tokio::test]
async fn test_登録は201でハッシュを含まないプロフィールを返す() {
    let app = TestApp::new();

    let response = app
        .send(json_request(Method::POST, "/register", registration()))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let data = &body["data"];
    assert_eq!(data["email"], "siti@example.com");
    assert_eq!(data["age"], 24);
    assert_eq!(data["dietPreference"], "Not Specified");
    assert_eq!(data["firebase_uid"], "uid-siti@example.com");
    assert!(data.get("password").is_none());
    let id = data["id"].as_str().unwrap();
    let stored = app.documents.get("users", id).unwrap();
    assert!(stored["password"].as_str().unwrap().starts_with("$argon2id$"));
    assert!(app.auth.contains("uid-siti@example.com"));
}

#[tokio::test]
async fn test_登録済みのメールアドレスでの登録は409を返す() {
    let app = TestApp::new();
    app.auth.insert_with_email("uid-lama", "siti@example.com");

    let response = app
        .send(json_request(Method::POST, "/register", registration()))
        .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["title"], "Conflict");
    assert_eq!(app.documents.len("users"), 0);
}

#[tokio::test]
async fn test_必須項目が欠けた登録は400で欠けた項目名を返す() {
    let app = TestApp::new();

    let response = app
        .send(json_request(
            Method::POST,
            "/register",
            json!({ "name": "Siti", "email": "siti@example.com" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body["detail"],
        "必須項目がありません: password, birthdate, weight, height"
    );
    assert!(app.auth.calls().is_empty());
}

#[tokio::test]
async fn test_登録したパスワードでログインできる() {
    let app = TestApp::new();
    app.send(json_request(Method::POST, "/register", registration()))
        .await;

    let response = app
        .send(json_request(
            Method::POST,
            "/login",
            json!({ "email": "siti@example.com", "password": "rahasia123" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["name"], "Siti");
    assert!(body["data"].get("password").is_none());
}

#[tokio::test]
async fn test_パスワードが違うログインは401を返す() {
    let app = TestApp::new();
    app.send(json_request(Method::POST, "/register", registration()))
        .await;

    let response = app
        .send(json_request(
            Method::POST,
            "/login",
            json!({ "email": "siti@example.com", "password": "salah-sandi" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["detail"], "パスワードが正しくありません");
}

#[tokio::test]
async fn test_未登録のメールアドレスでのログインは404を返す() {
    let app = TestApp::new();

    let response = app
        .send(json_request(
            Method::POST,
            "/login",
            json!({ "email": "budi@example.com", "password": "rahasia123" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_パスワード再設定は登録済みのメールアドレスにリンクを返す() {
    let app = TestApp::new();
    app.auth.insert_with_email("uid-1", "siti@example.com");

    let found = app
        .send(json_request(
            Method::POST,
            "/forgotPassword",
            json!({ "email": "siti@example.com" }),
        ))
        .await;
    let missing = app
        .send(json_request(
            Method::POST,
            "/forgotPassword",
            json!({ "email": "budi@example.com" }),
        ))
        .await;

    assert_eq!(found.status(), StatusCode::OK);
    let body = body_json(found).await;
    assert!(
        body["data"]["resetLink"]
            .as_str()
            .unwrap()
            .contains("mode=resetPassword")
    );
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

// ===== データベース参照 =====

#[tokio::test]
async fn test_データベース参照はコレクションごとのドキュメントを返す() {
    let app = TestApp::new();
    app.documents.insert(
        "users",
        "u1",
        json!({ "name": "Siti", "password": "$argon2id$v=19$x" }),
    );
    app.documents
        .insert("articles", "a1", json!({ "title": "Sarapan" }));

    let response = app.send(request(Method::GET, "/database")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["data"],
        json!({
            "articles": [{ "id": "a1", "title": "Sarapan" }],
            "users": [{ "id": "u1", "name": "Siti" }]
        })
    );
}

// ===== カタログ編集 =====

#[tokio::test]
async fn test_記事を画像つきで作成すると公開urlを保存する() {
    let app = TestApp::new();

    let response = app
        .send(form_request(
            Method::POST,
            "/articles",
            &[("title", "Sarapan sehat"), ("content", "Isi artikel")],
            Some(("article_picture", "menu.jpg", JPEG)),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let id = body["data"]["articleId"].as_str().unwrap();
    let stored = app.documents.get("articles", id).unwrap();
    let object = format!("articles/{id}/menu.jpg");
    assert_eq!(stored["title"], "Sarapan sehat");
    assert_eq!(stored["article_picture"], json!(format!("{PUBLIC_PREFIX}{object}")));
    assert!(app.blobs.contains(&object));
}

#[tokio::test]
async fn test_作成した記事は画像ごと削除できる() {
    let app = TestApp::new();
    let created = app
        .send(form_request(
            Method::POST,
            "/articles",
            &[("title", "Sarapan"), ("content", "Isi")],
            Some(("article_picture", "menu.jpg", JPEG)),
        ))
        .await;
    let id = body_json(created).await["data"]["articleId"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .send(request(Method::DELETE, &format!("/articles/{id}")))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.blobs.deleted(), vec![format!("articles/{id}/menu.jpg")]);
    assert_eq!(app.documents.len("articles"), 0);
}

#[tokio::test]
async fn test_本文のない記事の作成は400を返す() {
    let app = TestApp::new();

    let response = app
        .send(form_request(
            Method::POST,
            "/articles",
            &[("title", "Sarapan")],
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.documents.len("articles"), 0);
}

#[tokio::test]
async fn test_記事の更新は指定フィールドのみ書き込む() {
    let app = TestApp::new();
    let picture = format!("{PUBLIC_PREFIX}articles/a1/lama.jpg");
    app.documents.insert(
        "articles",
        "a1",
        json!({ "title": "Lama", "content": "Isi", "article_picture": picture }),
    );

    let response = app
        .send(form_request(
            Method::PUT,
            "/articles/a1",
            &[("title", "Baru")],
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["title"], "Baru");
    assert_eq!(body["data"]["updated_at"], "2024-06-01T00:00:00.000Z");
    let stored = app.documents.get("articles", "a1").unwrap();
    assert_eq!(stored["content"], "Isi");
    assert_eq!(stored["article_picture"], json!(picture));
}

#[tokio::test]
async fn test_存在しない記事の更新は404を返す() {
    let app = TestApp::new();

    let response = app
        .send(form_request(
            Method::PUT,
            "/articles/ghost",
            &[("title", "Baru")],
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_食品アイテムを作成するとカテゴリにも登録される() {
    let app = TestApp::new();

    let response = app
        .send(form_request(
            Method::POST,
            "/makanan",
            &[
                ("kategori", "buah"),
                ("nama", "Apel"),
                ("deskripsi", "Buah merah"),
                ("nutrition", r#"{"kalori":52,"protein":0.3}"#),
            ],
            Some(("makanan_picture", "apel.jpg", JPEG)),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let id = body["data"]["makananId"].as_str().unwrap().to_string();
    assert!(id.starts_with("makanan_"));

    let listed = body_json(app.send(request(Method::GET, "/makanan/buah")).await).await;
    assert_eq!(listed["data"][0]["id"], json!(id));
    assert_eq!(listed["data"][0]["kategori"], "buah");
    assert_eq!(listed["data"][0]["nutrition"]["kalori"], 52);
    assert_eq!(
        listed["data"][0]["makanan_picture"],
        json!(format!("{PUBLIC_PREFIX}makanan/buah/{id}/apel.jpg"))
    );
}

#[tokio::test]
async fn test_nutritionがjsonでない食品アイテムの作成は400を返す() {
    let app = TestApp::new();

    let response = app
        .send(form_request(
            Method::POST,
            "/makanan",
            &[
                ("kategori", "buah"),
                ("nama", "Apel"),
                ("deskripsi", "Buah merah"),
                ("nutrition", "kalori=52"),
            ],
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.documents.len("makanan"), 0);
}

#[tokio::test]
async fn test_食品アイテムの画像を差し替えると古い画像を削除する() {
    let app = TestApp::new();
    app.blobs.insert("makanan/buah/f1/lama.jpg");
    app.documents.insert(
        "makanan/buah/items",
        "f1",
        json!({
            "nama": "Apel",
            "makanan_picture": format!("{PUBLIC_PREFIX}makanan/buah/f1/lama.jpg")
        }),
    );

    let response = app
        .send(form_request(
            Method::PUT,
            "/makanan/buah/f1",
            &[("deskripsi", "Buah merah segar")],
            Some(("makanan_picture", "baru.jpg", JPEG)),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let stored = app.documents.get("makanan/buah/items", "f1").unwrap();
    assert_eq!(stored["nama"], "Apel");
    assert_eq!(stored["deskripsi"], "Buah merah segar");
    assert_eq!(
        stored["makanan_picture"],
        json!(format!("{PUBLIC_PREFIX}makanan/buah/f1/baru.jpg"))
    );
    assert_eq!(app.blobs.deleted(), vec!["makanan/buah/f1/lama.jpg".to_string()]);
}

#[tokio::test]
async fn test_存在しない食品アイテムの更新は404を返す() {
    let app = TestApp::new();

    let response = app
        .send(form_request(
            Method::PUT,
            "/makanan/buah/ghost",
            &[("nama", "Apel")],
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ===== カスケード削除 =====

#[tokio::test]
async fn test_ユーザー削除で写真と認証アカウントとドキュメントが削除される() {
    let app = TestApp::new();
    app.documents.insert(
        "users",
        "u1",
        json!({ "user_picture": "users/u1/photo.png", "firebase_uid": "uid-123" }),
    );
    app.blobs.insert("users/u1/photo.png");
    app.auth.insert("uid-123");

    let response = app.send(request(Method::DELETE, "/users/u1")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["documentDeleted"], true);
    assert_eq!(body["data"]["storageDeleted"], 1);
    assert_eq!(body["data"]["authDeleted"], true);
    assert!(!app.blobs.contains("users/u1/photo.png"));
    assert!(!app.auth.contains("uid-123"));
    assert!(app.documents.get("users", "u1").is_none());
}

#[tokio::test]
async fn test_2回目のユーザー削除は404を返す() {
    let app = TestApp::new();
    app.documents.insert("users", "u1", json!({}));

    let first = app.send(request(Method::DELETE, "/users/u1")).await;
    let second = app.send(request(Method::DELETE, "/users/u1")).await;

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::NOT_FOUND);
    let body = body_json(second).await;
    assert_eq!(body["title"], "Not Found");
}

#[tokio::test]
async fn test_全ユーザー削除は失敗を含むエンティティを記録して200を返す() {
    let app = TestApp::new();
    app.documents
        .insert("users", "a", json!({ "firebase_uid": "uid-a" }));
    app.documents.insert("users", "b", json!({}));
    app.documents
        .insert("users", "c", json!({ "firebase_uid": "uid-c" }));
    app.auth.insert("uid-a");
    app.auth.fail("uid-c", InjectedFailure::Permanent);

    let response = app.send(request(Method::DELETE, "/users")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let data = &body["data"];
    assert_eq!(data["collection"], "users");
    assert_eq!(data["total"], 3);
    assert_eq!(data["succeeded"], 2);
    assert_eq!(data["warned"], 1);
    assert_eq!(data["outcomes"][1]["authDeleted"], true);
    assert_eq!(data["outcomes"][2]["status"], "warned");
    assert_eq!(data["outcomes"][2]["errors"][0]["target"], "auth");
    assert_eq!(app.documents.len("users"), 0);
}

#[tokio::test]
async fn test_コレクションの列挙に失敗すると500を返す() {
    let app = TestApp::new();
    app.documents.fail("list:articles", InjectedFailure::Permanent);

    let response = app.send(request(Method::DELETE, "/articles")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["detail"], "内部エラーが発生しました");
}

#[tokio::test]
async fn test_カテゴリ内の食品アイテムを画像ごと削除する() {
    let app = TestApp::new();
    app.documents.insert(
        "makanan/buah/items",
        "apel",
        json!({ "makanan_picture": "https://storage.googleapis.com/nutrilens-bucket/makanan/apel.jpg" }),
    );
    app.blobs.insert("makanan/apel.jpg");

    let response = app.send(request(Method::DELETE, "/makanan/buah")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.documents.len("makanan/buah/items"), 0);
    assert!(!app.blobs.contains("makanan/apel.jpg"));
}

#[tokio::test]
async fn test_データベース全削除はコレクションごとのレポートを返す() {
    let app = TestApp::new();
    app.documents
        .insert("users", "u1", json!({ "firebase_uid": "uid-1" }));
    app.documents.insert("articles", "a1", json!({}));
    app.auth.insert("uid-1");

    let response = app.send(request(Method::DELETE, "/database")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let collections: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|report| report["collection"].as_str().unwrap())
        .collect();
    assert_eq!(collections, vec!["articles", "users"]);
    assert!(!app.auth.contains("uid-1"));
}

// ===== 参照・更新 =====

#[tokio::test]
async fn test_食品一覧は各アイテムにカテゴリ名を付与する() {
    let app = TestApp::new();
    app.documents.insert("makanan", "buah", json!({}));
    app.documents
        .insert("makanan/buah/items", "f1", json!({ "nama": "Apel" }));

    let response = app.send(request(Method::GET, "/makanan")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["data"],
        json!([{ "id": "f1", "nama": "Apel", "kategori": "buah" }])
    );
}

#[tokio::test]
async fn test_空のカテゴリは404を返す() {
    let app = TestApp::new();

    let response = app.send(request(Method::GET, "/makanan/kosong")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_プロフィール更新は書き込んだフィールドを返す() {
    let app = TestApp::new();
    app.documents
        .insert("users", "u1", json!({ "name": "Siti", "height": 160 }));

    let response = app
        .send(json_request(
            Method::PUT,
            "/users/u1",
            json!({ "weight": "64", "dietPreference": "vegetarian" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["weight"], json!(64.0));
    assert_eq!(body["data"]["dietPreference"], "vegetarian");
    assert!(body["data"].get("name").is_none());
    assert_eq!(app.documents.get("users", "u1").unwrap()["name"], "Siti");
}

#[tokio::test]
async fn test_不正なjsonのプロフィール更新は400を返す() {
    let app = TestApp::new();
    app.documents.insert("users", "u1", json!({}));

    let response = app
        .send(
            Request::builder()
                .method(Method::PUT)
                .uri("/users/u1")
                .header(API_KEY_HEADER, API_KEY)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ===== 画像分類 =====

#[tokio::test]
async fn test_推論結果に一致する食品情報を返す() {
    let app = TestApp::new();
    app.documents.insert("makanan", "buah", json!({}));
    app.documents
        .insert("makanan/buah/items", "f1", json!({ "nama": "Apel" }));

    let response = app.send(multipart_request("file", b"\xff\xd8\xff")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["predicted_class"], "Apel");
    assert_eq!(body["data"]["food_info"]["kategori"], "buah");
}

#[tokio::test]
async fn test_一致する食品がなければfood_infoはnullになる() {
    let app = TestApp::new();

    let response = app.send(multipart_request("file", b"\xff\xd8\xff")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["food_info"], Value::Null);
}

#[tokio::test]
async fn test_fileフィールドがなければ400を返す() {
    let app = TestApp::new();

    let response = app.send(multipart_request("image", b"\xff\xd8\xff")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_推論結果にクラスがなければ502を返す() {
    let mut app = TestApp::new();
    app.inference = None;

    let response = app.send(multipart_request("file", b"\xff\xd8\xff")).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
