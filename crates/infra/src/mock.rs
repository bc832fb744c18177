//! # テスト用インメモリストア
//!
//! コーディネーターとユースケースのテストで使用するインメモリ実装。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! nutrilens-infra = { workspace = true, features = ["test-utils"] }
//! ```
//!
//! 各ストアは呼び出しを記録し、キー単位で障害を注入できる。

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use bytes::Bytes;
use nutrilens_domain::{
    account::Email,
    collection::{CollectionPath, DocumentId, DocumentRef},
    document::DocumentRecord,
    password::PlainPassword,
    reference::{BlobLocator, PrincipalId},
};
use serde_json::{Map, Value};

use crate::{
    auth_store::{AccountCreation, AuthStore},
    blob_store::BlobStore,
    deletion::Removal,
    error::InfraError,
    firestore::DocumentStore,
};

/// 注入する障害の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    /// 常に失敗する（403）
    Permanent,
    /// 指定回数だけ失敗し、その後は成功する（503）
    Transient { remaining: u32 },
}

#[derive(Clone, Default)]
struct FailureInjector {
    failures: Arc<Mutex<HashMap<String, InjectedFailure>>>,
}

impl FailureInjector {
    fn set(&self, key: impl Into<String>, failure: InjectedFailure) {
        self.failures.lock().unwrap().insert(key.into(), failure);
    }

    fn check(&self, service: &'static str, key: &str) -> Result<(), InfraError> {
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(key) {
            None => Ok(()),
            Some(InjectedFailure::Permanent) => {
                Err(InfraError::upstream(service, 403, format!("injected: {key}")))
            }
            Some(InjectedFailure::Transient { remaining }) => {
                if *remaining == 0 {
                    failures.remove(key);
                    return Ok(());
                }
                *remaining -= 1;
                Err(InfraError::upstream(service, 503, format!("injected: {key}")))
            }
        }
    }
}

// ===== InMemoryDocumentStore =====

/// ドキュメントストアへの呼び出し
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentCall {
    List(String),
    Get(String),
    Delete(String),
    Commit(Vec<String>),
    ListCollections,
    Update(String),
    Set(String),
    Merge(String),
    Query(String),
}

type Collections = BTreeMap<String, BTreeMap<String, Map<String, Value>>>;

/// インメモリのドキュメントストア
///
/// 障害注入のキーは `list:{collection}` / `get:{doc}` / `delete:{doc}` /
/// `commit` / `list_collections` / `update:{doc}` / `set:{doc}` / `merge:{doc}` /
/// `query:{collection}`。
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<Mutex<Collections>>,
    calls:       Arc<Mutex<Vec<DocumentCall>>>,
    failures:    FailureInjector,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// ドキュメントを追加する（`fields` は JSON オブジェクト）
    pub fn insert(&self, collection: &str, id: &str, fields: Value) {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.collections
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
    }

    pub fn get(&self, collection: &str, id: &str) -> Option<Map<String, Value>> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    pub fn calls(&self) -> Vec<DocumentCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail(&self, key: &str, failure: InjectedFailure) {
        self.failures.set(key, failure);
    }

    fn record(&self, call: DocumentCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, key: &str) -> Result<(), InfraError> {
        self.failures.check("firestore", key)
    }

    fn remove(&self, doc: &DocumentRef) {
        if let Some(docs) = self
            .collections
            .lock()
            .unwrap()
            .get_mut(doc.collection.as_str())
        {
            docs.remove(doc.id.as_str());
        }
    }
}

fn to_record(id: &str, fields: &Map<String, Value>) -> Result<DocumentRecord, InfraError> {
    let id = DocumentId::new(id).map_err(|e| InfraError::malformed(e.to_string()))?;
    Ok(DocumentRecord::new(id, fields.clone()))
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn list_documents(
        &self,
        collection: &CollectionPath,
    ) -> Result<Vec<DocumentRecord>, InfraError> {
        self.record(DocumentCall::List(collection.to_string()));
        self.check(&format!("list:{collection}"))?;

        let collections = self.collections.lock().unwrap();
        let Some(docs) = collections.get(collection.as_str()) else {
            return Ok(Vec::new());
        };
        docs.iter()
            .map(|(id, fields)| to_record(id, fields))
            .collect()
    }

    async fn get_document(&self, doc: &DocumentRef) -> Result<Option<DocumentRecord>, InfraError> {
        self.record(DocumentCall::Get(doc.path()));
        self.check(&format!("get:{doc}"))?;

        self.get(doc.collection.as_str(), doc.id.as_str())
            .map(|fields| to_record(doc.id.as_str(), &fields))
            .transpose()
    }

    async fn delete_document(&self, doc: &DocumentRef) -> Result<(), InfraError> {
        self.record(DocumentCall::Delete(doc.path()));
        self.check(&format!("delete:{doc}"))?;

        self.remove(doc);
        Ok(())
    }

    async fn commit_deletes(&self, docs: &[DocumentRef]) -> Result<(), InfraError> {
        self.record(DocumentCall::Commit(
            docs.iter().map(DocumentRef::path).collect(),
        ));
        self.check("commit")?;

        for doc in docs {
            self.remove(doc);
        }
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<CollectionPath>, InfraError> {
        self.record(DocumentCall::ListCollections);
        self.check("list_collections")?;

        let roots: BTreeSet<String> = self
            .collections
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, docs)| !docs.is_empty())
            .filter_map(|(path, _)| path.split('/').next().map(str::to_string))
            .collect();

        roots
            .into_iter()
            .map(|root| CollectionPath::new(root).map_err(|e| InfraError::malformed(e.to_string())))
            .collect()
    }

    async fn update_fields(
        &self,
        doc: &DocumentRef,
        fields: &Map<String, Value>,
    ) -> Result<Option<DocumentRecord>, InfraError> {
        self.record(DocumentCall::Update(doc.path()));
        self.check(&format!("update:{doc}"))?;

        let mut collections = self.collections.lock().unwrap();
        let Some(stored) = collections
            .get_mut(doc.collection.as_str())
            .and_then(|docs| docs.get_mut(doc.id.as_str()))
        else {
            return Ok(None);
        };
        for (key, value) in fields {
            stored.insert(key.clone(), value.clone());
        }
        to_record(doc.id.as_str(), stored).map(Some)
    }

    async fn set_document(
        &self,
        doc: &DocumentRef,
        fields: &Map<String, Value>,
    ) -> Result<DocumentRecord, InfraError> {
        self.record(DocumentCall::Set(doc.path()));
        self.check(&format!("set:{doc}"))?;

        self.collections
            .lock()
            .unwrap()
            .entry(doc.collection.to_string())
            .or_default()
            .insert(doc.id.to_string(), fields.clone());
        to_record(doc.id.as_str(), fields)
    }

    async fn merge_fields(
        &self,
        doc: &DocumentRef,
        fields: &Map<String, Value>,
    ) -> Result<DocumentRecord, InfraError> {
        self.record(DocumentCall::Merge(doc.path()));
        self.check(&format!("merge:{doc}"))?;

        let mut collections = self.collections.lock().unwrap();
        let stored = collections
            .entry(doc.collection.to_string())
            .or_default()
            .entry(doc.id.to_string())
            .or_default();
        for (key, value) in fields {
            stored.insert(key.clone(), value.clone());
        }
        to_record(doc.id.as_str(), stored)
    }

    async fn find_by_field(
        &self,
        collection: &CollectionPath,
        field: &str,
        expected: &Value,
        limit: usize,
    ) -> Result<Vec<DocumentRecord>, InfraError> {
        self.record(DocumentCall::Query(collection.to_string()));
        self.check(&format!("query:{collection}"))?;

        let collections = self.collections.lock().unwrap();
        let Some(docs) = collections.get(collection.as_str()) else {
            return Ok(Vec::new());
        };
        docs.iter()
            .filter(|(_, fields)| fields.get(field) == Some(expected))
            .take(limit)
            .map(|(id, fields)| to_record(id, fields))
            .collect()
    }
}

// ===== InMemoryAuthStore =====

/// 認証ストアへの呼び出し
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthCall {
    Create(String),
    Delete(String),
    ResetLink(String),
}

/// インメモリの認証ストア
///
/// 障害注入のキーは UID（削除）または メールアドレス（作成・再設定リンク）。
/// 作成したアカウントの UID は `uid-{メールアドレス}`。
#[derive(Clone, Default)]
pub struct InMemoryAuthStore {
    /// UID → メールアドレス（メールアドレスなしで登録したものは `None`）
    principals: Arc<Mutex<BTreeMap<String, Option<String>>>>,
    calls:      Arc<Mutex<Vec<AuthCall>>>,
    failures:   FailureInjector,
}

impl InMemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, uid: &str) {
        self.principals.lock().unwrap().insert(uid.to_string(), None);
    }

    pub fn insert_with_email(&self, uid: &str, email: &str) {
        self.principals
            .lock()
            .unwrap()
            .insert(uid.to_string(), Some(email.to_string()));
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.principals.lock().unwrap().contains_key(uid)
    }

    pub fn len(&self) -> usize {
        self.principals.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<AuthCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail(&self, key: &str, failure: InjectedFailure) {
        self.failures.set(key, failure);
    }

    fn uid_for(&self, email: &str) -> Option<String> {
        self.principals
            .lock()
            .unwrap()
            .iter()
            .find(|(_, registered)| registered.as_deref() == Some(email))
            .map(|(uid, _)| uid.clone())
    }
}

#[async_trait]
impl AuthStore for InMemoryAuthStore {
    async fn create_user(
        &self,
        email: &Email,
        _password: &PlainPassword,
    ) -> Result<AccountCreation, InfraError> {
        self.calls
            .lock()
            .unwrap()
            .push(AuthCall::Create(email.to_string()));
        self.failures.check("auth", email.as_str())?;

        if self.uid_for(email.as_str()).is_some() {
            return Ok(AccountCreation::EmailExists);
        }

        let uid = format!("uid-{email}");
        self.insert_with_email(&uid, email.as_str());
        let uid = PrincipalId::new(uid).map_err(|e| InfraError::malformed(e.to_string()))?;
        Ok(AccountCreation::Created(uid))
    }

    async fn delete_user(&self, uid: &PrincipalId) -> Result<Removal, InfraError> {
        self.calls
            .lock()
            .unwrap()
            .push(AuthCall::Delete(uid.as_str().to_string()));
        self.failures.check("auth", uid.as_str())?;

        if self.principals.lock().unwrap().remove(uid.as_str()).is_some() {
            Ok(Removal::Deleted)
        } else {
            Ok(Removal::AlreadyAbsent)
        }
    }

    async fn password_reset_link(&self, email: &Email) -> Result<Option<String>, InfraError> {
        self.calls
            .lock()
            .unwrap()
            .push(AuthCall::ResetLink(email.to_string()));
        self.failures.check("auth", email.as_str())?;

        Ok(self.uid_for(email.as_str()).map(|uid| {
            format!("https://nutrilens.firebaseapp.com/__/auth/action?mode=resetPassword&oobCode={uid}")
        }))
    }
}

// ===== InMemoryBlobStore =====

/// インメモリのブロブストア
///
/// 障害注入のキーは削除ならオブジェクト名、アップロードなら `upload:{name}`。
#[derive(Clone, Default)]
pub struct InMemoryBlobStore {
    objects:  Arc<Mutex<BTreeSet<String>>>,
    calls:    Arc<Mutex<Vec<String>>>,
    deleted:  Arc<Mutex<Vec<String>>>,
    uploaded: Arc<Mutex<Vec<UploadedObject>>>,
    failures: FailureInjector,
}

/// アップロードされたオブジェクト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    pub name:         String,
    pub content_type: String,
    pub size:         usize,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: &str) {
        self.objects.lock().unwrap().insert(name.to_string());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.lock().unwrap().contains(name)
    }

    /// 削除を試みたオブジェクト名（リトライを含む）
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// 実際に削除されたオブジェクト名
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    /// アップロードされたオブジェクト（記録順）
    pub fn uploaded(&self) -> Vec<UploadedObject> {
        self.uploaded.lock().unwrap().clone()
    }

    pub fn fail(&self, name: &str, failure: InjectedFailure) {
        self.failures.set(name, failure);
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload_object(
        &self,
        locator: &BlobLocator,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<(), InfraError> {
        let name = locator.as_str().to_string();
        self.failures.check("storage", &format!("upload:{name}"))?;

        self.objects.lock().unwrap().insert(name.clone());
        self.uploaded.lock().unwrap().push(UploadedObject {
            name,
            content_type: content_type.to_string(),
            size: bytes.len(),
        });
        Ok(())
    }

    async fn delete_object(&self, locator: &BlobLocator) -> Result<Removal, InfraError> {
        let name = locator.as_str().to_string();
        self.calls.lock().unwrap().push(name.clone());
        self.failures.check("storage", &name)?;

        if self.objects.lock().unwrap().remove(&name) {
            self.deleted.lock().unwrap().push(name);
            Ok(Removal::Deleted)
        } else {
            Ok(Removal::AlreadyAbsent)
        }
    }
}
