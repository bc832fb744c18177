//! カスケード削除ユースケース
//!
//! エンティティ種別ごとの削除方式を決め、コーディネーターに委譲する。

use std::sync::Arc;

use nutrilens_domain::{
    collection::{DocumentId, EntityKind},
    deletion::{BatchReport, DeletionOutcome},
};
use nutrilens_infra::deletion::{CleanupCoordinator, DocumentCommit};

use crate::error::ServerError;

/// カスケード削除ユースケース
pub struct DeletionUseCaseImpl {
    coordinator: Arc<CleanupCoordinator>,
}

impl DeletionUseCaseImpl {
    pub fn new(coordinator: Arc<CleanupCoordinator>) -> Self {
        Self { coordinator }
    }

    /// 1 エンティティを参照先ごと削除する
    pub async fn delete_entity(
        &self,
        kind: &EntityKind,
        id: &str,
    ) -> Result<DeletionOutcome, ServerError> {
        let spec = kind.spec()?;
        let id = DocumentId::new(id)?;

        Ok(self.coordinator.delete_one(&spec, &id).await?)
    }

    /// コレクション内の全エンティティを参照先ごと削除する
    pub async fn delete_collection(&self, kind: &EntityKind) -> Result<BatchReport, ServerError> {
        let spec = kind.spec()?;

        Ok(self
            .coordinator
            .delete_all(&spec, commit_mode(kind))
            .await?)
    }

    /// 全トップレベルコレクションを削除する
    pub async fn delete_database(&self) -> Result<Vec<BatchReport>, ServerError> {
        Ok(self.coordinator.delete_database().await?)
    }
}

/// 食品アイテムはサブリソース削除後にまとめてコミットする
fn commit_mode(kind: &EntityKind) -> DocumentCommit {
    match kind {
        EntityKind::FoodItem { .. } => DocumentCommit::Batched,
        EntityKind::User | EntityKind::Article => DocumentCommit::PerEntity,
    }
}
