//! データベース参照ユースケース
//!
//! 全トップレベルコレクションの内容をコレクション名ごとにまとめて返す。
//! サブコレクションは辿らない。`users` のパスワードハッシュは取り除く。

use std::{collections::BTreeMap, sync::Arc};

use nutrilens_domain::{account, collection::USERS, document::DocumentRecord};
use nutrilens_infra::firestore::DocumentStore;

use crate::error::ServerError;

/// データベース参照ユースケース
pub struct DatabaseUseCaseImpl {
    documents: Arc<dyn DocumentStore>,
}

impl DatabaseUseCaseImpl {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    /// コレクション名 → ドキュメント一覧
    pub async fn snapshot(&self) -> Result<BTreeMap<String, Vec<DocumentRecord>>, ServerError> {
        let mut snapshot = BTreeMap::new();

        for collection in self.documents.list_collections().await? {
            let mut records = self.documents.list_documents(&collection).await?;
            if collection.as_str() == USERS {
                records = records
                    .into_iter()
                    .map(account::without_credentials)
                    .collect();
            }
            snapshot.insert(collection.as_str().to_string(), records);
        }

        tracing::debug!(collections = snapshot.len(), "データベースを読み出し");
        Ok(snapshot)
    }
}
