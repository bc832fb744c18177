//! # カスケード削除基盤
//!
//! エンティティの削除を 3 つのストア（ドキュメント・認証・ストレージ）に展開する。
//!
//! ## 概要
//!
//! - [`CleanupCoordinator`] が削除対象を列挙し、エンティティごとの
//!   サブリソース削除を並行に実行する
//! - サブリソースの失敗は処理を中断せず、エンティティ単位の
//!   [`DeletionOutcome`](nutrilens_domain::deletion::DeletionOutcome) に記録する
//! - 一時的な障害は [`retry::retry_transient`] で再試行する

mod coordinator;
pub mod retry;

pub use coordinator::{CleanupCoordinator, DEFAULT_MAX_IN_FLIGHT};
use derive_more::Display;
pub use retry::RetryPolicy;
use thiserror::Error;

use crate::error::InfraError;

/// 単一リソースの削除結果
///
/// どちらも成功として扱う（削除は冪等）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// 削除した
    Deleted,
    /// 既に存在しなかった
    AlreadyAbsent,
}

/// 一括削除でのドキュメント削除方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentCommit {
    /// エンティティごとにドキュメントを削除する
    #[default]
    PerEntity,
    /// 全エンティティのサブリソース削除後に一括コミットする
    Batched,
}

/// 一括削除の失敗段階
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BatchStage {
    #[display("enumeration")]
    Enumeration,
    #[display("commit")]
    Commit,
}

/// カスケード削除のエラー
///
/// サブリソースの失敗はここに現れない（結果に記録される）。
#[derive(Debug, Error)]
pub enum CleanupError {
    /// 削除対象のドキュメントが存在しない
    #[error("{entity_type} が見つかりません: {collection}/{id}")]
    NotFound {
        entity_type: &'static str,
        collection:  String,
        id:          String,
    },

    /// ドキュメントの取得・削除に失敗した
    #[error("上流ストアの呼び出しに失敗: {0}")]
    UpstreamFailure(#[source] InfraError),

    /// 一括削除の列挙またはコミットに失敗した
    #[error("一括削除に失敗（{stage}）: {source}")]
    PartialOrTotalFailure {
        stage:  BatchStage,
        #[source]
        source: InfraError,
    },
}
