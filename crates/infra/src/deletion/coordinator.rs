//! # CleanupCoordinator
//!
//! 単一エンティティ・コレクション全体・データベース全体のカスケード削除を実行する。
//!
//! ## 削除順序
//!
//! - `delete_one`: ドキュメント取得 → 参照抽出 → ストレージと認証を並行削除 → ドキュメント削除
//! - `delete_all`: 列挙 → エンティティごとにストレージ・認証・ドキュメントを並行削除
//!   （`Batched` ではドキュメントを最後に一括コミット）
//!
//! エンティティ間の処理は独立しており、1 件の失敗が他に波及しない。

use std::sync::Arc;

use futures::{StreamExt, future::join_all, stream};
use nutrilens_domain::{
    collection::{CollectionSpec, DocumentId, DocumentRef},
    deletion::{BatchReport, DeletionOutcome, DeletionTarget, DeletionTask},
    reference::{BlobLocator, StorageBase},
};

use super::{BatchStage, CleanupError, DocumentCommit, Removal, retry::{RetryPolicy, retry_transient}};
use crate::{
    auth_store::AuthStore,
    blob_store::BlobStore,
    error::InfraError,
    firestore::DocumentStore,
};

/// 同時に処理するエンティティ数のデフォルト
pub const DEFAULT_MAX_IN_FLIGHT: usize = 32;

/// 参照先の削除結果
struct ReferenceResults {
    storage: Vec<Result<Removal, InfraError>>,
    auth:    Option<Result<Removal, InfraError>>,
}

/// カスケード削除コーディネーター
///
/// 各ストアはトレイトオブジェクトとして注入され、テスト時はインメモリ実装に差し替える。
pub struct CleanupCoordinator {
    documents:     Arc<dyn DocumentStore>,
    auth:          Arc<dyn AuthStore>,
    blobs:         Arc<dyn BlobStore>,
    storage_base:  StorageBase,
    retry:         RetryPolicy,
    max_in_flight: usize,
}

impl CleanupCoordinator {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        auth: Arc<dyn AuthStore>,
        blobs: Arc<dyn BlobStore>,
        storage_base: StorageBase,
    ) -> Self {
        Self {
            documents,
            auth,
            blobs,
            storage_base,
            retry: RetryPolicy::default(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// 同時に処理するエンティティ数の上限（最小 1）
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    /// 単一エンティティを削除する
    ///
    /// ドキュメントが外部参照の唯一の情報源のため、参照先を削除してから
    /// 最後にドキュメントを削除する。
    ///
    /// # エラー
    ///
    /// - ドキュメントが存在しない: [`CleanupError::NotFound`]
    /// - ドキュメントの取得・削除に失敗: [`CleanupError::UpstreamFailure`]
    #[tracing::instrument(skip_all, fields(collection = %spec.path, %id))]
    pub async fn delete_one(
        &self,
        spec: &CollectionSpec,
        id: &DocumentId,
    ) -> Result<DeletionOutcome, CleanupError> {
        let doc = DocumentRef::new(spec.path.clone(), id.clone());

        let record = self
            .documents
            .get_document(&doc)
            .await
            .map_err(CleanupError::UpstreamFailure)?
            .ok_or_else(|| CleanupError::NotFound {
                entity_type: spec.entity_type,
                collection:  spec.path.to_string(),
                id:          id.to_string(),
            })?;

        let task = DeletionTask::from_record(&record, spec, &self.storage_base);
        let mut outcome = DeletionOutcome::for_task(&task);

        let references = self.delete_references(&task).await;
        apply_references(&task, references, &mut outcome);

        self.delete_document(&task.document)
            .await
            .map_err(CleanupError::UpstreamFailure)?;
        outcome.record_document_deleted();

        tracing::info!(status = %outcome.status(), "エンティティを削除");
        Ok(outcome)
    }

    /// コレクション内の全エンティティを削除する
    ///
    /// 結果は列挙順に並ぶ。サブリソースの失敗は各エンティティの結果に記録される。
    ///
    /// # エラー
    ///
    /// 列挙または一括コミットに失敗した場合は [`CleanupError::PartialOrTotalFailure`]。
    #[tracing::instrument(skip_all, fields(collection = %spec.path, ?commit))]
    pub async fn delete_all(
        &self,
        spec: &CollectionSpec,
        commit: DocumentCommit,
    ) -> Result<BatchReport, CleanupError> {
        let records = self
            .documents
            .list_documents(&spec.path)
            .await
            .map_err(|source| CleanupError::PartialOrTotalFailure {
                stage: BatchStage::Enumeration,
                source,
            })?;

        let tasks: Vec<DeletionTask> = records
            .iter()
            .map(|record| DeletionTask::from_record(record, spec, &self.storage_base))
            .collect();

        let mut outcomes: Vec<DeletionOutcome> = stream::iter(0..tasks.len())
            .map(|index| self.delete_entity(&tasks[index], commit))
            .buffered(self.max_in_flight)
            .collect()
            .await;

        if commit == DocumentCommit::Batched && !tasks.is_empty() {
            let docs: Vec<DocumentRef> = tasks.iter().map(|task| task.document.clone()).collect();
            retry_transient(&self.retry, "commit_deletes", || {
                self.documents.commit_deletes(&docs)
            })
            .await
            .map_err(|source| CleanupError::PartialOrTotalFailure {
                stage: BatchStage::Commit,
                source,
            })?;
            for outcome in &mut outcomes {
                outcome.record_document_deleted();
            }
        }

        let report = BatchReport::from_outcomes(spec.path.as_str(), outcomes);
        tracing::info!(
            total = report.total,
            succeeded = report.succeeded,
            warned = report.warned,
            failed = report.failed,
            "コレクションを一括削除"
        );
        Ok(report)
    }

    /// データベース内の全トップレベルコレクションを削除する
    ///
    /// 各コレクションは汎用スキーマ（認証参照のみ）で削除する。サブコレクションは辿らない。
    /// コレクション単位の列挙失敗はそのコレクションのレポートに記録し、残りの処理を続ける。
    ///
    /// # エラー
    ///
    /// コレクション一覧の取得に失敗した場合は [`CleanupError::PartialOrTotalFailure`]。
    #[tracing::instrument(skip_all)]
    pub async fn delete_database(&self) -> Result<Vec<BatchReport>, CleanupError> {
        let collections = self.documents.list_collections().await.map_err(|source| {
            CleanupError::PartialOrTotalFailure {
                stage: BatchStage::Enumeration,
                source,
            }
        })?;

        let mut reports = Vec::with_capacity(collections.len());
        for path in collections {
            let spec = CollectionSpec::generic(path);
            match self.delete_all(&spec, DocumentCommit::PerEntity).await {
                Ok(report) => reports.push(report),
                Err(error) => {
                    tracing::error!(
                        collection = %spec.path,
                        error = %error,
                        "コレクションの削除に失敗"
                    );
                    reports.push(BatchReport::enumeration_failed(
                        spec.path.as_str(),
                        error.to_string(),
                    ));
                }
            }
        }

        Ok(reports)
    }

    /// 1 エンティティ分のサブリソースを並行に削除する
    async fn delete_entity(&self, task: &DeletionTask, commit: DocumentCommit) -> DeletionOutcome {
        let mut outcome = DeletionOutcome::for_task(task);

        match commit {
            DocumentCommit::PerEntity => {
                let (references, document) = tokio::join!(
                    self.delete_references(task),
                    self.delete_document(&task.document)
                );
                apply_references(task, references, &mut outcome);
                match document {
                    Ok(()) => outcome.record_document_deleted(),
                    Err(error) => {
                        tracing::warn!(
                            entity_id = %task.entity_id,
                            error = %error,
                            "ドキュメントの削除に失敗"
                        );
                        outcome.record_failure(DeletionTarget::Document, error.to_string());
                    }
                }
            }
            DocumentCommit::Batched => {
                let references = self.delete_references(task).await;
                apply_references(task, references, &mut outcome);
            }
        }

        outcome
    }

    /// ストレージオブジェクトと認証プリンシパルを並行に削除する
    async fn delete_references(&self, task: &DeletionTask) -> ReferenceResults {
        let storage = join_all(task.storage_refs.iter().map(|locator| self.delete_blob(locator)));
        let auth = async {
            match &task.auth_ref {
                Some(uid) => Some(
                    retry_transient(&self.retry, "delete_user", || self.auth.delete_user(uid))
                        .await,
                ),
                None => None,
            }
        };

        let (storage, auth) = tokio::join!(storage, auth);
        ReferenceResults { storage, auth }
    }

    async fn delete_blob(&self, locator: &BlobLocator) -> Result<Removal, InfraError> {
        retry_transient(&self.retry, "delete_object", || {
            self.blobs.delete_object(locator)
        })
        .await
    }

    async fn delete_document(&self, doc: &DocumentRef) -> Result<(), InfraError> {
        retry_transient(&self.retry, "delete_document", || {
            self.documents.delete_document(doc)
        })
        .await
    }
}

/// 参照先の削除結果を記録する
///
/// 失敗は警告ログを出して記録し、処理は続行する。
fn apply_references(task: &DeletionTask, results: ReferenceResults, outcome: &mut DeletionOutcome) {
    for (locator, result) in task.storage_refs.iter().zip(results.storage) {
        match result {
            Ok(_) => outcome.record_storage_deleted(),
            Err(error) => {
                tracing::warn!(
                    entity_id = %task.entity_id,
                    object = %locator,
                    error = %error,
                    "ストレージオブジェクトの削除に失敗"
                );
                outcome.record_failure(
                    DeletionTarget::Storage,
                    format!("{locator}: {error}"),
                );
            }
        }
    }

    match results.auth {
        Some(Ok(_)) => outcome.record_auth_deleted(),
        Some(Err(error)) => {
            tracing::warn!(
                entity_id = %task.entity_id,
                error = %error,
                "認証プリンシパルの削除に失敗"
            );
            outcome.record_failure(DeletionTarget::Auth, error.to_string());
        }
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use nutrilens_domain::{collection::EntityKind, deletion::OutcomeStatus};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::mock::{
        AuthCall,
        DocumentCall,
        InMemoryAuthStore,
        InMemoryBlobStore,
        InMemoryDocumentStore,
        InjectedFailure,
    };

    struct Fixture {
        documents:   InMemoryDocumentStore,
        auth:        InMemoryAuthStore,
        blobs:       InMemoryBlobStore,
        coordinator: CleanupCoordinator,
    }

    fn fixture() -> Fixture {
        let documents = InMemoryDocumentStore::new();
        let auth = InMemoryAuthStore::new();
        let blobs = InMemoryBlobStore::new();
        let coordinator = CleanupCoordinator::new(
            Arc::new(documents.clone()),
            Arc::new(auth.clone()),
            Arc::new(blobs.clone()),
            StorageBase::new("https://storage.googleapis.com", "nutrilens"),
        )
        .with_retry_policy(RetryPolicy {
            max_retries:     2,
            initial_backoff: std::time::Duration::ZERO,
            max_backoff:     std::time::Duration::ZERO,
        });

        Fixture {
            documents,
            auth,
            blobs,
            coordinator,
        }
    }

    fn users() -> CollectionSpec {
        EntityKind::User.spec().unwrap()
    }

    fn id(value: &str) -> DocumentId {
        DocumentId::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_delete_oneでドキュメントを最後に削除する() {
        let f = fixture();
        f.documents.insert(
            "users",
            "u1",
            json!({ "user_picture": "users/u1/photo.png", "firebase_uid": "uid-123" }),
        );
        f.blobs.insert("users/u1/photo.png");
        f.auth.insert("uid-123");

        let outcome = f.coordinator.delete_one(&users(), &id("u1")).await.unwrap();

        assert_eq!(outcome.status(), OutcomeStatus::Succeeded);
        assert_eq!(f.blobs.deleted(), vec!["users/u1/photo.png".to_string()]);
        assert_eq!(f.auth.calls(), vec![AuthCall::Delete("uid-123".to_string())]);
        assert_eq!(
            f.documents.calls().last(),
            Some(&DocumentCall::Delete("users/u1".to_string()))
        );
    }

    #[tokio::test]
    async fn test_delete_oneで存在しないドキュメントはnot_foundを返す() {
        let f = fixture();

        let result = f.coordinator.delete_one(&users(), &id("missing")).await;

        assert!(matches!(result, Err(CleanupError::NotFound { .. })));
        assert!(f.auth.calls().is_empty());
        assert!(f.blobs.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_oneで認証の削除失敗は記録され処理は続く() {
        let f = fixture();
        f.documents
            .insert("users", "u1", json!({ "firebase_uid": "uid-1" }));
        f.auth.fail("uid-1", InjectedFailure::Permanent);

        let outcome = f.coordinator.delete_one(&users(), &id("u1")).await.unwrap();

        assert_eq!(outcome.status(), OutcomeStatus::Warned);
        assert!(outcome.document_deleted);
        assert!(!outcome.auth_deleted);
        assert_eq!(outcome.errors[0].target, DeletionTarget::Auth);
        assert!(f.documents.get("users", "u1").is_none());
    }

    #[tokio::test]
    async fn test_delete_oneでドキュメント削除失敗はupstream_failureを返す() {
        let f = fixture();
        f.documents.insert("users", "u1", json!({}));
        f.documents
            .fail("delete:users/u1", InjectedFailure::Permanent);

        let result = f.coordinator.delete_one(&users(), &id("u1")).await;

        assert!(matches!(result, Err(CleanupError::UpstreamFailure(_))));
    }

    #[tokio::test]
    async fn test_一時的な障害はリトライで回復する() {
        let f = fixture();
        f.documents
            .insert("users", "u1", json!({ "user_picture": "users/u1.png" }));
        f.blobs.insert("users/u1.png");
        f.blobs
            .fail("users/u1.png", InjectedFailure::Transient { remaining: 2 });

        let outcome = f.coordinator.delete_one(&users(), &id("u1")).await.unwrap();

        assert_eq!(outcome.status(), OutcomeStatus::Succeeded);
        assert_eq!(f.blobs.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_delete_allは列挙順に結果を返す() {
        let mut f = fixture();
        f.coordinator = f.coordinator.with_max_in_flight(2);
        for n in ["a", "b", "c", "d"] {
            f.documents.insert("articles", n, json!({}));
        }

        let report = f
            .coordinator
            .delete_all(&EntityKind::Article.spec().unwrap(), DocumentCommit::PerEntity)
            .await
            .unwrap();

        let ids: Vec<&str> = report.outcomes.iter().map(|o| o.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_delete_allの列挙失敗はpartial_or_total_failureを返す() {
        let f = fixture();
        f.documents.fail("list:users", InjectedFailure::Permanent);

        let result = f
            .coordinator
            .delete_all(&users(), DocumentCommit::PerEntity)
            .await;

        assert!(matches!(
            result,
            Err(CleanupError::PartialOrTotalFailure {
                stage: BatchStage::Enumeration,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_batchedではサブリソース削除後に一括コミットする() {
        let f = fixture();
        let spec = EntityKind::FoodItem { category: id("buah") }.spec().unwrap();
        f.documents.insert(
            "makanan/buah/items",
            "f1",
            json!({ "makanan_picture": "https://storage.googleapis.com/nutrilens/makanan/apel.png" }),
        );
        f.documents.insert("makanan/buah/items", "f2", json!({}));
        f.blobs.insert("makanan/apel.png");

        let report = f
            .coordinator
            .delete_all(&spec, DocumentCommit::Batched)
            .await
            .unwrap();

        assert_eq!(report.succeeded, 2);
        assert_eq!(f.blobs.deleted(), vec!["makanan/apel.png".to_string()]);
        assert_eq!(
            f.documents.calls().last(),
            Some(&DocumentCall::Commit(vec![
                "makanan/buah/items/f1".to_string(),
                "makanan/buah/items/f2".to_string(),
            ]))
        );
        assert!(
            !f.documents
                .calls()
                .iter()
                .any(|call| matches!(call, DocumentCall::Delete(_)))
        );
    }

    #[tokio::test]
    async fn test_batchedのコミット失敗はpartial_or_total_failureを返す() {
        let f = fixture();
        f.documents.insert("articles", "a1", json!({}));
        f.documents.fail("commit", InjectedFailure::Permanent);

        let result = f
            .coordinator
            .delete_all(&EntityKind::Article.spec().unwrap(), DocumentCommit::Batched)
            .await;

        assert!(matches!(
            result,
            Err(CleanupError::PartialOrTotalFailure {
                stage: BatchStage::Commit,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_delete_databaseは全トップレベルコレクションを汎用スキーマで削除する() {
        let f = fixture();
        f.documents
            .insert("users", "u1", json!({ "firebase_uid": "uid-1", "user_picture": "users/u1.png" }));
        f.documents.insert("logs", "l1", json!({}));
        f.documents.fail("list:logs", InjectedFailure::Permanent);
        f.auth.insert("uid-1");

        let reports = f.coordinator.delete_database().await.unwrap();

        let collections: Vec<&str> = reports.iter().map(|r| r.collection.as_str()).collect();
        assert_eq!(collections, vec!["logs", "users"]);
        assert!(reports[0].error.is_some());
        assert_eq!(reports[1].succeeded, 1);
        assert_eq!(f.auth.calls(), vec![AuthCall::Delete("uid-1".to_string())]);
        // 汎用スキーマはストレージ参照を辿らない
        assert!(f.blobs.calls().is_empty());
    }
}
