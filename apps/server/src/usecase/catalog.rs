//! 記事・食品カタログユースケース
//!
//! 食品アイテムは `makanan/{kategori}/items` に格納される。
//! 一覧では各アイテムにカテゴリ名（`kategori`）を付与する。

use std::sync::Arc;

use nutrilens_domain::{
    DomainError,
    collection::{CollectionPath, DocumentId, DocumentRef, EntityKind, FOOD_CATEGORIES},
    document::DocumentRecord,
    prediction::FoodInfo,
};
use nutrilens_infra::firestore::DocumentStore;
use serde_json::Value;

use crate::error::ServerError;

/// 食品アイテムの名前フィールド
const FOOD_NAME_FIELD: &str = "nama";

/// カタログユースケース
pub struct CatalogUseCaseImpl {
    documents: Arc<dyn DocumentStore>,
}

impl CatalogUseCaseImpl {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    pub async fn list_articles(&self) -> Result<Vec<DocumentRecord>, ServerError> {
        self.list(&EntityKind::Article).await
    }

    pub async fn get_article(&self, id: &str) -> Result<DocumentRecord, ServerError> {
        self.get(&EntityKind::Article, id).await
    }

    /// 全カテゴリの食品アイテムを列挙する
    pub async fn list_food_items(&self) -> Result<Vec<FoodInfo>, ServerError> {
        let mut items = Vec::new();
        for category in self.categories().await? {
            items.extend(self.food_items_in(category).await?);
        }
        Ok(items)
    }

    /// 1 カテゴリの食品アイテムを列挙する（空なら NotFound）
    pub async fn list_food_items_in(&self, kategori: &str) -> Result<Vec<FoodInfo>, ServerError> {
        let items = self.food_items_in(DocumentId::new(kategori)?).await?;
        if items.is_empty() {
            return Err(ServerError::NotFound(format!(
                "カテゴリ {kategori} に食品アイテムがありません"
            )));
        }
        Ok(items)
    }

    pub async fn get_food_item(&self, kategori: &str, id: &str) -> Result<DocumentRecord, ServerError> {
        let kind = EntityKind::FoodItem {
            category: DocumentId::new(kategori)?,
        };
        self.get(&kind, id).await
    }

    /// `nama` が一致する食品アイテムをカテゴリ順に探す
    pub async fn find_food_by_name(&self, name: &str) -> Result<Option<FoodInfo>, ServerError> {
        let expected = Value::from(name);

        for category in self.categories().await? {
            let collection = food_collection(&category)?;
            let found = self
                .documents
                .find_by_field(&collection, FOOD_NAME_FIELD, &expected, 1)
                .await?;
            if let Some(item) = found.into_iter().next() {
                return Ok(Some(FoodInfo {
                    item,
                    kategori: category.into_string(),
                }));
            }
        }

        Ok(None)
    }

    async fn list(&self, kind: &EntityKind) -> Result<Vec<DocumentRecord>, ServerError> {
        let path = kind.collection()?;
        Ok(self.documents.list_documents(&path).await?)
    }

    async fn get(&self, kind: &EntityKind, id: &str) -> Result<DocumentRecord, ServerError> {
        let doc = DocumentRef::new(kind.collection()?, DocumentId::new(id)?);

        self.documents.get_document(&doc).await?.ok_or_else(|| {
            DomainError::NotFound {
                entity_type: kind.entity_type(),
                id:          doc.path(),
            }
            .into()
        })
    }

    async fn categories(&self) -> Result<Vec<DocumentId>, ServerError> {
        let root = CollectionPath::new(FOOD_CATEGORIES)?;
        let categories = self.documents.list_documents(&root).await?;
        Ok(categories.into_iter().map(|record| record.id).collect())
    }

    async fn food_items_in(&self, category: DocumentId) -> Result<Vec<FoodInfo>, ServerError> {
        let collection = food_collection(&category)?;
        let records = self.documents.list_documents(&collection).await?;
        let kategori = category.into_string();

        Ok(records
            .into_iter()
            .map(|item| FoodInfo {
                item,
                kategori: kategori.clone(),
            })
            .collect())
    }
}

fn food_collection(category: &DocumentId) -> Result<CollectionPath, DomainError> {
    EntityKind::FoodItem {
        category: category.clone(),
    }
    .collection()
}
