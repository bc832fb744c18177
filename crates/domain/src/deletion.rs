//! # カスケード削除のドメインモデル
//!
//! 1 エンティティの削除は 3 つのストアにまたがる:
//!
//! - ストレージオブジェクト（0 個以上）
//! - 認証プリンシパル（0 または 1 個）
//! - ドキュメント本体
//!
//! 各ストアは独立して失敗しうるため、削除結果は例外ではなく
//! [`DeletionOutcome`] に記録して集計する。ドキュメントが外部参照の
//! 唯一の情報源であり、参照はドキュメント削除より前に読み取る。
//!
//! ## ステータスの判定
//!
//! | 状態 | 判定 |
//! |------|------|
//! | `Succeeded` | ドキュメント削除済みかつエラーなし |
//! | `Warned` | ドキュメント削除済みだがストレージ / 認証でエラーあり |
//! | `Failed` | ドキュメントが削除されていない |

use std::collections::BTreeSet;

use serde::{Serialize, Serializer, ser::SerializeStruct};

use crate::{
    collection::{CollectionSpec, DocumentId, DocumentRef},
    document::DocumentRecord,
    reference::{BlobLocator, PrincipalId, StorageBase},
};

/// 削除対象のストア種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeletionTarget {
    Document,
    Storage,
    Auth,
}

/// サブリソース削除の失敗記録
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionFailure {
    pub target:  DeletionTarget,
    pub message: String,
}

impl DeletionFailure {
    pub fn new(target: DeletionTarget, message: impl Into<String>) -> Self {
        Self {
            target,
            message: message.into(),
        }
    }
}

/// 1 エンティティ分の削除計画
///
/// リクエスト時にドキュメントから組み立て、永続化はしない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionTask {
    pub entity_id:        DocumentId,
    pub document:         DocumentRef,
    pub storage_refs:     BTreeSet<BlobLocator>,
    pub auth_ref:         Option<PrincipalId>,
    /// 読み取り時点で解決できなかった参照
    pub reference_errors: Vec<DeletionFailure>,
}

impl DeletionTask {
    /// ドキュメントとスキーマから削除計画を作成する
    ///
    /// 解決できないストレージ参照は `reference_errors` に記録し、
    /// そのオブジェクトへの削除呼び出しは行わない。
    pub fn from_record(record: &DocumentRecord, spec: &CollectionSpec, base: &StorageBase) -> Self {
        let mut storage_refs = BTreeSet::new();
        let mut reference_errors = Vec::new();

        if let Some(field) = spec.schema.storage_field {
            for value in record.string_values(field) {
                match BlobLocator::from_stored_value(value, base) {
                    Ok(locator) => {
                        storage_refs.insert(locator);
                    }
                    Err(e) => {
                        reference_errors.push(DeletionFailure::new(
                            DeletionTarget::Storage,
                            e.to_string(),
                        ));
                    }
                }
            }
        }

        let auth_ref = spec
            .schema
            .auth_field
            .and_then(|field| record.string_field(field))
            .and_then(|uid| PrincipalId::new(uid).ok());

        Self {
            entity_id: record.id.clone(),
            document: DocumentRef::new(spec.path.clone(), record.id.clone()),
            storage_refs,
            auth_ref,
            reference_errors,
        }
    }

    /// 外部参照を一切持たないか
    pub fn has_no_references(&self) -> bool {
        self.storage_refs.is_empty() && self.auth_ref.is_none() && self.reference_errors.is_empty()
    }
}

/// 削除結果のステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OutcomeStatus {
    Succeeded,
    Warned,
    Failed,
}

/// 1 エンティティ分の削除結果
///
/// `errors` は記録順を保持する。シリアライズ時は `status` を導出して出力する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionOutcome {
    pub entity_id:        String,
    pub document_deleted: bool,
    pub storage_deleted:  usize,
    pub storage_total:    usize,
    pub auth_deleted:     bool,
    pub errors:           Vec<DeletionFailure>,
}

impl DeletionOutcome {
    /// 削除計画から初期状態の結果を作成する
    ///
    /// 認証参照がない場合、認証は「削除済み」とみなす。
    pub fn for_task(task: &DeletionTask) -> Self {
        Self {
            entity_id:        task.entity_id.as_str().to_string(),
            document_deleted: false,
            storage_deleted:  0,
            storage_total:    task.storage_refs.len() + task.reference_errors.len(),
            auth_deleted:     task.auth_ref.is_none(),
            errors:           task.reference_errors.clone(),
        }
    }

    pub fn record_storage_deleted(&mut self) {
        self.storage_deleted += 1;
    }

    pub fn record_auth_deleted(&mut self) {
        self.auth_deleted = true;
    }

    pub fn record_document_deleted(&mut self) {
        self.document_deleted = true;
    }

    pub fn record_failure(&mut self, target: DeletionTarget, message: impl Into<String>) {
        self.errors.push(DeletionFailure::new(target, message));
    }

    pub fn status(&self) -> OutcomeStatus {
        if !self.document_deleted {
            OutcomeStatus::Failed
        } else if self.errors.is_empty() {
            OutcomeStatus::Succeeded
        } else {
            OutcomeStatus::Warned
        }
    }
}

impl Serialize for DeletionOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DeletionOutcome", 7)?;
        state.serialize_field("entityId", &self.entity_id)?;
        state.serialize_field("documentDeleted", &self.document_deleted)?;
        state.serialize_field("storageDeleted", &self.storage_deleted)?;
        state.serialize_field("storageTotal", &self.storage_total)?;
        state.serialize_field("authDeleted", &self.auth_deleted)?;
        state.serialize_field("errors", &self.errors)?;
        state.serialize_field("status", &self.status())?;
        state.end()
    }
}

/// コレクション単位の一括削除レポート
///
/// `outcomes` は列挙順。`error` は列挙自体に失敗した場合のみ設定される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub collection: String,
    pub total:      usize,
    pub succeeded:  usize,
    pub warned:     usize,
    pub failed:     usize,
    pub outcomes:   Vec<DeletionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error:      Option<String>,
}

impl BatchReport {
    pub fn from_outcomes(collection: impl Into<String>, outcomes: Vec<DeletionOutcome>) -> Self {
        let count = |status: OutcomeStatus| outcomes.iter().filter(|o| o.status() == status).count();

        Self {
            collection: collection.into(),
            total: outcomes.len(),
            succeeded: count(OutcomeStatus::Succeeded),
            warned: count(OutcomeStatus::Warned),
            failed: count(OutcomeStatus::Failed),
            outcomes,
            error: None,
        }
    }

    /// 列挙に失敗したコレクションのレポート
    pub fn enumeration_failed(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::from_outcomes(collection, Vec::new())
        }
    }

    /// 全エンティティがエラーなしで削除されたか
    pub fn is_clean(&self) -> bool {
        self.error.is_none() && self.succeeded == self.total
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    use super::*;
    use crate::collection::{CollectionPath, EntityKind};

    fn base() -> StorageBase {
        StorageBase::new("https://storage.googleapis.com", "nutrilens")
    }

    fn record(id: &str, fields: Value) -> DocumentRecord {
        let Value::Object(map) = fields else {
            panic!("object expected");
        };
        DocumentRecord::new(DocumentId::new(id).unwrap(), map)
    }

    #[test]
    fn test_from_recordでストレージと認証の参照を読み取る() {
        let spec = EntityKind::User.spec().unwrap();
        let record = record(
            "u1",
            json!({ "user_picture": "users/u1/photo.png", "firebase_uid": "uid-123" }),
        );

        let task = DeletionTask::from_record(&record, &spec, &base());

        assert_eq!(task.document.path(), "users/u1");
        assert_eq!(
            task.storage_refs.iter().map(BlobLocator::as_str).collect::<Vec<_>>(),
            vec!["users/u1/photo.png"]
        );
        assert_eq!(task.auth_ref.as_ref().map(PrincipalId::as_str), Some("uid-123"));
        assert!(task.reference_errors.is_empty());
    }

    #[test]
    fn test_from_recordで参照がなければ空の計画になる() {
        let spec = EntityKind::User.spec().unwrap();
        let record = record("u2", json!({ "name": "Bob", "user_picture": "" }));

        let task = DeletionTask::from_record(&record, &spec, &base());

        assert!(task.has_no_references());
    }

    #[test]
    fn test_from_recordでスキーマ外のフィールドは無視する() {
        let spec = EntityKind::Article.spec().unwrap();
        let record = record(
            "a1",
            json!({ "article_picture": "articles/a1/c.png", "firebase_uid": "uid-9" }),
        );

        let task = DeletionTask::from_record(&record, &spec, &base());

        assert_eq!(task.storage_refs.len(), 1);
        assert_eq!(task.auth_ref, None);
    }

    #[test]
    fn test_from_recordで解決できないurlはエラーとして記録する() {
        let spec = CollectionSpec {
            path:        CollectionPath::new("articles").unwrap(),
            schema:      EntityKind::Article.schema(),
            entity_type: "Article",
        };
        let record = record("a1", json!({ "article_picture": "https://example.com/x.png" }));

        let task = DeletionTask::from_record(&record, &spec, &base());
        let outcome = DeletionOutcome::for_task(&task);

        assert!(task.storage_refs.is_empty());
        assert_eq!(outcome.storage_total, 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].target, DeletionTarget::Storage);
    }

    #[test]
    fn test_statusはドキュメント未削除ならfailedになる() {
        let outcome = DeletionOutcome {
            entity_id:        "u1".to_string(),
            document_deleted: false,
            storage_deleted:  1,
            storage_total:    1,
            auth_deleted:     true,
            errors:           vec![],
        };

        assert_eq!(outcome.status(), OutcomeStatus::Failed);
    }

    #[test]
    fn test_statusはエラーがあればwarnedになる() {
        let mut outcome = DeletionOutcome {
            entity_id:        "u1".to_string(),
            document_deleted: false,
            storage_deleted:  0,
            storage_total:    0,
            auth_deleted:     false,
            errors:           vec![],
        };
        outcome.record_failure(DeletionTarget::Auth, "boom");
        outcome.record_document_deleted();

        assert_eq!(outcome.status(), OutcomeStatus::Warned);
    }

    #[test]
    fn test_outcomeのserializeでcamel_caseとstatusを出力する() {
        let outcome = DeletionOutcome {
            entity_id:        "u1".to_string(),
            document_deleted: true,
            storage_deleted:  1,
            storage_total:    1,
            auth_deleted:     true,
            errors:           vec![],
        };

        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(
            json,
            json!({
                "entityId": "u1",
                "documentDeleted": true,
                "storageDeleted": 1,
                "storageTotal": 1,
                "authDeleted": true,
                "errors": [],
                "status": "succeeded"
            })
        );
    }

    #[test]
    fn test_batch_reportはステータスごとに集計する() {
        let make = |id: &str, document_deleted: bool, errors: Vec<DeletionFailure>| DeletionOutcome {
            entity_id: id.to_string(),
            document_deleted,
            storage_deleted: 0,
            storage_total: 0,
            auth_deleted: true,
            errors,
        };
        let outcomes = vec![
            make("a", true, vec![]),
            make("b", true, vec![DeletionFailure::new(DeletionTarget::Storage, "x")]),
            make("c", false, vec![DeletionFailure::new(DeletionTarget::Document, "y")]),
        ];

        let report = BatchReport::from_outcomes("users", outcomes);

        assert_eq!(
            (report.total, report.succeeded, report.warned, report.failed),
            (3, 1, 1, 1)
        );
        assert!(!report.is_clean());
        assert_eq!(report.outcomes[1].entity_id, "b");
    }

    #[test]
    fn test_enumeration_failedはerrorを出力する() {
        let report = BatchReport::enumeration_failed("logs", "列挙に失敗しました");

        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["total"], 0);
        assert_eq!(json["error"], "列挙に失敗しました");
    }
}
