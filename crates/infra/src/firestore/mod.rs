//! # ドキュメントストア（Firestore）
//!
//! Firestore REST API v1 を使ったドキュメントの列挙・取得・削除・更新・検索。
//!
//! ## エンドポイント
//!
//! | 操作 | API |
//! |------|-----|
//! | 列挙 | `GET {documents}/{collection}?pageSize=..&pageToken=..` |
//! | 取得 | `GET {documents}/{collection}/{id}` |
//! | 削除 | `DELETE {documents}/{collection}/{id}` |
//! | 一括削除 | `POST {documents}:commit` |
//! | コレクション列挙 | `POST {documents}:listCollectionIds` |
//! | 部分更新 | `PATCH {documents}/{collection}/{id}?updateMask.fieldPaths=..` |
//! | 作成・上書き | `PATCH {documents}/{collection}/{id}` |
//! | 検索 | `POST {documents}[/{parent}]:runQuery` |
//!
//! コレクション名とドキュメント ID は URL のパスセグメントごとに
//! パーセントエンコードする。`?` や `#` を含む ID が別のドキュメントや
//! クエリ文字列として解釈されることはない。

pub mod value;

use std::sync::Arc;

use async_trait::async_trait;
use nutrilens_domain::{
    collection::{CollectionPath, DocumentId, DocumentRef},
    document::DocumentRecord,
};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::{
    error::InfraError,
    gcp::{AccessTokenSource, authorize, upstream_error},
};

const SERVICE: &str = "firestore";

/// 列挙時の 1 ページあたりの件数
const PAGE_SIZE: usize = 300;

/// `:commit` 1 回あたりの書き込み上限
pub const MAX_WRITES_PER_COMMIT: usize = 500;

/// ドキュメントストアのインターフェース
///
/// テスト時はインメモリ実装に差し替え可能。
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// コレクション内の全ドキュメントを列挙する
    async fn list_documents(
        &self,
        collection: &CollectionPath,
    ) -> Result<Vec<DocumentRecord>, InfraError>;

    /// ドキュメントを取得する（存在しなければ `None`）
    async fn get_document(&self, doc: &DocumentRef) -> Result<Option<DocumentRecord>, InfraError>;

    /// ドキュメントを削除する（存在しなくても成功）
    async fn delete_document(&self, doc: &DocumentRef) -> Result<(), InfraError>;

    /// 複数のドキュメントを一括で削除する
    ///
    /// 書き込み上限ごとに分割してコミットする。
    async fn commit_deletes(&self, docs: &[DocumentRef]) -> Result<(), InfraError>;

    /// トップレベルのコレクションを列挙する
    async fn list_collections(&self) -> Result<Vec<CollectionPath>, InfraError>;

    /// 既存ドキュメントの指定フィールドを更新する（存在しなければ `None`）
    async fn update_fields(
        &self,
        doc: &DocumentRef,
        fields: &Map<String, Value>,
    ) -> Result<Option<DocumentRecord>, InfraError>;

    /// ドキュメントを作成する（既存なら全フィールドを置き換える）
    async fn set_document(
        &self,
        doc: &DocumentRef,
        fields: &Map<String, Value>,
    ) -> Result<DocumentRecord, InfraError>;

    /// 指定フィールドだけを書き込む（存在しなければ作成する）
    async fn merge_fields(
        &self,
        doc: &DocumentRef,
        fields: &Map<String, Value>,
    ) -> Result<DocumentRecord, InfraError>;

    /// フィールドの値が一致するドキュメントを検索する
    async fn find_by_field(
        &self,
        collection: &CollectionPath,
        field: &str,
        expected: &Value,
        limit: usize,
    ) -> Result<Vec<DocumentRecord>, InfraError>;
}

/// Firestore REST のドキュメント表現
#[derive(Debug, Deserialize)]
struct WireDocument {
    name:   String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl WireDocument {
    fn into_record(self) -> Result<DocumentRecord, InfraError> {
        let id = self.name.rsplit('/').next().unwrap_or_default();
        let id = DocumentId::new(id).map_err(|e| InfraError::malformed(e.to_string()))?;
        Ok(DocumentRecord::new(id, value::decode_fields(&self.fields)?))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents:       Vec<WireDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListCollectionIdsResponse {
    #[serde(default)]
    collection_ids:  Vec<String>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunQueryItem {
    document: Option<WireDocument>,
}

/// Firestore REST クライアント
#[derive(Clone)]
pub struct FirestoreClient {
    client:   reqwest::Client,
    tokens:   Arc<dyn AccessTokenSource>,
    base_url: String,
    /// `projects/{project}/databases/(default)/documents`
    root:     String,
}

impl FirestoreClient {
    /// 新しい FirestoreClient を作成する
    ///
    /// # 引数
    ///
    /// - `base_url`: API のベース URL（例: `https://firestore.googleapis.com`、エミュレータなら `http://localhost:8080`）
    /// - `project_id`: GCP プロジェクト ID
    pub fn new(
        client: reqwest::Client,
        tokens: Arc<dyn AccessTokenSource>,
        base_url: &str,
        project_id: &str,
    ) -> Self {
        Self {
            client,
            tokens,
            base_url: base_url.trim_end_matches('/').to_string(),
            root: format!("projects/{project_id}/databases/(default)/documents"),
        }
    }

    /// ドキュメントルートからの相対パスを URL にする
    ///
    /// `path` はエンコード前のセグメント列。
    fn url(&self, path: &str) -> String {
        if path.is_empty() {
            format!("{}/v1/{}", self.base_url, self.root)
        } else {
            format!("{}/v1/{}/{}", self.base_url, self.root, encode_path(path))
        }
    }

    fn document_name(&self, doc: &DocumentRef) -> String {
        format!("{}/{}", self.root, doc.path())
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, InfraError> {
        Ok(authorize(request, self.tokens.as_ref()).await?.send().await?)
    }

    /// `PATCH` でフィールドを書き込む
    ///
    /// `mask` が `None` ならドキュメント全体を置き換える。
    /// `must_exist` が真なら存在しないドキュメントは作成せず `None` を返す。
    async fn patch(
        &self,
        doc: &DocumentRef,
        fields: &Map<String, Value>,
        mask: Option<&Map<String, Value>>,
        must_exist: bool,
    ) -> Result<Option<DocumentRecord>, InfraError> {
        let mut query: Vec<(&str, String)> = mask
            .into_iter()
            .flat_map(Map::keys)
            .map(|name| ("updateMask.fieldPaths", field_path(name)))
            .collect();
        if must_exist {
            query.push(("currentDocument.exists", "true".to_string()));
        }

        let body = json!({ "fields": value::encode_fields(fields) });
        let response = self
            .send(self.client.patch(self.url(&doc.path())).query(&query).json(&body))
            .await?;

        if must_exist && response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(upstream_error(SERVICE, response).await);
        }

        let document: WireDocument = response.json().await?;
        document.into_record().map(Some)
    }
}

/// スラッシュ区切りのパスをセグメントごとにパーセントエンコードする
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// フィールドパスを Firestore のマスク表記にする
///
/// 英数字とアンダースコア以外を含む名前はバッククォートで囲む。
fn field_path(name: &str) -> String {
    let simple = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    #[tracing::instrument(skip_all, level = "debug", fields(%collection))]
    async fn list_documents(
        &self,
        collection: &CollectionPath,
    ) -> Result<Vec<DocumentRecord>, InfraError> {
        let url = self.url(collection.as_str());
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", PAGE_SIZE.to_string())];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let response = self.send(self.client.get(&url).query(&query)).await?;
            if !response.status().is_success() {
                return Err(upstream_error(SERVICE, response).await);
            }

            let page: ListDocumentsResponse = response.json().await?;
            for document in page.documents {
                records.push(document.into_record()?);
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(records)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%doc))]
    async fn get_document(&self, doc: &DocumentRef) -> Result<Option<DocumentRecord>, InfraError> {
        let response = self.send(self.client.get(self.url(&doc.path()))).await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(upstream_error(SERVICE, response).await);
        }

        let document: WireDocument = response.json().await?;
        document.into_record().map(Some)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%doc))]
    async fn delete_document(&self, doc: &DocumentRef) -> Result<(), InfraError> {
        let response = self.send(self.client.delete(self.url(&doc.path()))).await?;

        // Firestore は存在しないドキュメントの削除も成功として扱う
        if response.status().is_success() || response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(upstream_error(SERVICE, response).await)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(count = docs.len()))]
    async fn commit_deletes(&self, docs: &[DocumentRef]) -> Result<(), InfraError> {
        let url = format!("{}:commit", self.url(""));

        for chunk in docs.chunks(MAX_WRITES_PER_COMMIT) {
            let writes: Vec<Value> = chunk
                .iter()
                .map(|doc| json!({ "delete": self.document_name(doc) }))
                .collect();

            let response = self
                .send(self.client.post(&url).json(&json!({ "writes": writes })))
                .await?;
            if !response.status().is_success() {
                return Err(upstream_error(SERVICE, response).await);
            }
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn list_collections(&self) -> Result<Vec<CollectionPath>, InfraError> {
        let url = format!("{}:listCollectionIds", self.url(""));
        let mut collections = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut body = json!({ "pageSize": PAGE_SIZE });
            if let Some(token) = page_token.take() {
                body["pageToken"] = Value::String(token);
            }

            let response = self.send(self.client.post(&url).json(&body)).await?;
            if !response.status().is_success() {
                return Err(upstream_error(SERVICE, response).await);
            }

            let page: ListCollectionIdsResponse = response.json().await?;
            for id in page.collection_ids {
                collections.push(
                    CollectionPath::new(id).map_err(|e| InfraError::malformed(e.to_string()))?,
                );
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(collections)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%doc))]
    async fn update_fields(
        &self,
        doc: &DocumentRef,
        fields: &Map<String, Value>,
    ) -> Result<Option<DocumentRecord>, InfraError> {
        self.patch(doc, fields, Some(fields), true).await
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%doc))]
    async fn set_document(
        &self,
        doc: &DocumentRef,
        fields: &Map<String, Value>,
    ) -> Result<DocumentRecord, InfraError> {
        self.patch(doc, fields, None, false)
            .await?
            .ok_or_else(|| InfraError::malformed(format!("書き込み結果が返りませんでした: {doc}")))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%doc))]
    async fn merge_fields(
        &self,
        doc: &DocumentRef,
        fields: &Map<String, Value>,
    ) -> Result<DocumentRecord, InfraError> {
        self.patch(doc, fields, Some(fields), false)
            .await?
            .ok_or_else(|| InfraError::malformed(format!("書き込み結果が返りませんでした: {doc}")))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%collection, %field))]
    async fn find_by_field(
        &self,
        collection: &CollectionPath,
        field: &str,
        expected: &Value,
        limit: usize,
    ) -> Result<Vec<DocumentRecord>, InfraError> {
        let url = format!("{}:runQuery", self.url(collection.parent_document().unwrap_or("")));
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection.collection_id() }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": field_path(field) },
                        "op": "EQUAL",
                        "value": value::encode_value(expected),
                    }
                },
                "limit": limit,
            }
        });

        let response = self.send(self.client.post(&url).json(&body)).await?;
        if !response.status().is_success() {
            return Err(upstream_error(SERVICE, response).await);
        }

        // 一致なしの場合も `readTime` のみの要素が 1 件返る
        let items: Vec<RunQueryItem> = response.json().await?;
        items
            .into_iter()
            .filter_map(|item| item.document)
            .map(WireDocument::into_record)
            .collect()
    }
}
