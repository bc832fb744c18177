//! ユーザーユースケース
//!
//! ユーザーの参照とプロフィールの部分更新を行う。

use std::sync::Arc;

use nutrilens_domain::{
    DomainError,
    account,
    clock::Clock,
    collection::{DocumentId, DocumentRef, EntityKind},
    document::DocumentRecord,
    profile::UserProfilePatch,
};
use nutrilens_infra::firestore::DocumentStore;
use serde_json::{Map, Value};

use crate::error::ServerError;

/// ユーザーユースケース
pub struct UserUseCaseImpl {
    documents: Arc<dyn DocumentStore>,
    clock:     Arc<dyn Clock>,
}

impl UserUseCaseImpl {
    pub fn new(documents: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { documents, clock }
    }

    pub async fn list_users(&self) -> Result<Vec<DocumentRecord>, ServerError> {
        let spec = EntityKind::User.spec()?;
        let users = self.documents.list_documents(&spec.path).await?;
        Ok(users.into_iter().map(account::without_credentials).collect())
    }

    pub async fn get_user(&self, id: &str) -> Result<DocumentRecord, ServerError> {
        let doc = user_ref(id)?;

        self.documents
            .get_document(&doc)
            .await?
            .map(account::without_credentials)
            .ok_or_else(|| not_found(&doc).into())
    }

    /// プロフィールを部分更新し、書き込んだフィールドを返す
    ///
    /// 1. 保存済みドキュメントを取得
    /// 2. 更新内容をマージ（年齢・BMI を再計算）
    /// 3. 変更フィールドのみ書き込む
    pub async fn update_profile(
        &self,
        id: &str,
        patch: &UserProfilePatch,
    ) -> Result<Map<String, Value>, ServerError> {
        let doc = user_ref(id)?;

        let stored = self
            .documents
            .get_document(&doc)
            .await?
            .ok_or_else(|| not_found(&doc))?;

        let changes = patch.merge_into(&stored, self.clock.today())?;

        // 取得後に削除された場合
        if self.documents.update_fields(&doc, &changes).await?.is_none() {
            return Err(not_found(&doc).into());
        }

        tracing::info!(user_id = %doc.id, fields = changes.len(), "プロフィールを更新");
        Ok(changes)
    }
}

fn user_ref(id: &str) -> Result<DocumentRef, DomainError> {
    Ok(DocumentRef::new(
        EntityKind::User.collection()?,
        DocumentId::new(id)?,
    ))
}

fn not_found(doc: &DocumentRef) -> DomainError {
    DomainError::NotFound {
        entity_type: EntityKind::User.entity_type(),
        id:          doc.id.to_string(),
    }
}
