//! 記事・食品カタログの作成と更新
//!
//! 画像が添付された場合は Cloud Storage にアップロードし、公開 URL を
//! ドキュメントの画像フィールドに保存する。オブジェクト名は
//! 削除時に同じ URL から逆算できる形にする。
//!
//! | 種別 | ドキュメント | オブジェクト名 |
//! |---|---|---|
//! | 記事 | `articles/{id}` | `articles/{id}/{ファイル名}` |
//! | 食品 | `makanan/{kategori}/items/{id}` | `makanan/{kategori}/{id}/{ファイル名}` |
//!
//! ドキュメントの書き込みに失敗した場合、アップロード済みの画像は削除する。
//! 更新で画像を差し替えた場合、古い画像は書き込み成功後に削除する。

use std::sync::Arc;

use nutrilens_domain::{
    DomainError,
    clock::Clock,
    collection::{CollectionPath, DocumentId, DocumentRef, EntityKind, FOOD_CATEGORIES},
    reference::{BlobLocator, StorageBase},
};
use nutrilens_infra::{blob_store::BlobStore, firestore::DocumentStore, inference::ImageUpload};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::prediction::validate_image;
use crate::error::ServerError;

const ARTICLE_PICTURE_FIELD: &str = "article_picture";
const FOOD_PICTURE_FIELD: &str = "makanan_picture";

/// ファイル名が空の場合のオブジェクト名
const DEFAULT_FILE_NAME: &str = "upload";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// 記事フォーム（`POST /articles` / `PUT /articles/{id}`）
#[derive(Debug, Default)]
pub struct ArticleForm {
    pub title:   Option<String>,
    pub content: Option<String>,
    pub picture: Option<ImageUpload>,
}

/// 食品アイテムフォーム（`POST /makanan` / `PUT /makanan/{kategori}/{id}`）
#[derive(Debug, Default)]
pub struct FoodItemForm {
    /// 作成時のみ使う。更新時のカテゴリはパスで指定する。
    pub kategori:  Option<String>,
    pub nama:      Option<String>,
    pub deskripsi: Option<String>,
    /// JSON オブジェクトの文字列
    pub nutrition: Option<String>,
    pub picture:   Option<ImageUpload>,
}

/// アップロード済みの画像
struct StoredPicture {
    locator: BlobLocator,
    url:     String,
}

/// カタログ編集ユースケース
pub struct CatalogEditorUseCaseImpl {
    documents:    Arc<dyn DocumentStore>,
    blobs:        Arc<dyn BlobStore>,
    storage_base: StorageBase,
    clock:        Arc<dyn Clock>,
}

impl CatalogEditorUseCaseImpl {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        storage_base: StorageBase,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            documents,
            blobs,
            storage_base,
            clock,
        }
    }

    /// 記事を作成し、採番した ID を返す
    pub async fn create_article(&self, form: ArticleForm) -> Result<DocumentId, ServerError> {
        let (Some(title), Some(content)) = (form.title, form.content) else {
            return Err(ServerError::BadRequest(
                "title と content は必須です".to_string(),
            ));
        };
        if let Some(image) = &form.picture {
            validate_image(image)?;
        }

        let id = new_document_id("a")?;
        let doc = DocumentRef::new(EntityKind::Article.collection()?, id.clone());

        let picture = match form.picture {
            Some(image) => Some(self.upload(&format!("articles/{id}"), image).await?),
            None => None,
        };

        let mut fields = Map::new();
        fields.insert("title".to_string(), Value::from(title));
        fields.insert("content".to_string(), Value::from(content));
        fields.insert(ARTICLE_PICTURE_FIELD.to_string(), picture_value(picture.as_ref()));
        fields.insert("created_at".to_string(), Value::from(self.clock.timestamp()));

        self.write_new(&doc, &fields, picture.as_ref()).await?;

        tracing::info!(article_id = %id, with_picture = picture.is_some(), "記事を作成");
        Ok(id)
    }

    /// 記事の指定フィールドを更新し、書き込んだフィールドを返す
    ///
    /// 画像を指定しなかった場合、保存済みの画像はそのまま残る。
    pub async fn update_article(
        &self,
        id: &str,
        form: ArticleForm,
    ) -> Result<Map<String, Value>, ServerError> {
        let doc = DocumentRef::new(EntityKind::Article.collection()?, DocumentId::new(id)?);

        let mut changes = Map::new();
        if let Some(title) = form.title {
            changes.insert("title".to_string(), Value::from(title));
        }
        if let Some(content) = form.content {
            changes.insert("content".to_string(), Value::from(content));
        }
        if changes.is_empty() && form.picture.is_none() {
            return Err(nothing_to_update());
        }
        changes.insert("updated_at".to_string(), Value::from(self.clock.timestamp()));

        let prefix = format!("articles/{}", doc.id);
        self.update_with_picture(
            &EntityKind::Article,
            &doc,
            changes,
            form.picture.map(|image| (prefix, image)),
            ARTICLE_PICTURE_FIELD,
        )
        .await
    }

    /// 食品アイテムを作成し、採番した ID を返す
    ///
    /// カテゴリのドキュメント（`makanan/{kategori}`）がなければ作成する。
    pub async fn create_food_item(&self, form: FoodItemForm) -> Result<DocumentId, ServerError> {
        let missing: Vec<&str> = [
            ("kategori", form.kategori.is_none()),
            ("nama", form.nama.is_none()),
            ("deskripsi", form.deskripsi.is_none()),
            ("nutrition", form.nutrition.is_none()),
        ]
        .into_iter()
        .filter_map(|(field, absent)| absent.then_some(field))
        .collect();

        let (Some(kategori), Some(nama), Some(deskripsi), Some(nutrition)) =
            (form.kategori, form.nama, form.deskripsi, form.nutrition)
        else {
            return Err(ServerError::BadRequest(format!(
                "必須項目がありません: {}",
                missing.join(", ")
            )));
        };
        let nutrition = parse_nutrition(&nutrition)?;
        if let Some(image) = &form.picture {
            validate_image(image)?;
        }

        let category = DocumentId::new(kategori)?;
        let id = new_document_id("makanan_")?;
        let doc = DocumentRef::new(
            EntityKind::FoodItem {
                category: category.clone(),
            }
            .collection()?,
            id.clone(),
        );

        let picture = match form.picture {
            Some(image) => {
                let prefix = format!("makanan/{category}/{id}");
                Some(self.upload(&prefix, image).await?)
            }
            None => None,
        };

        let category_doc = DocumentRef::new(CollectionPath::new(FOOD_CATEGORIES)?, category.clone());
        let mut category_fields = Map::new();
        category_fields.insert("nama".to_string(), Value::from(category.as_str()));
        if let Err(e) = self.documents.merge_fields(&category_doc, &category_fields).await {
            self.discard(picture.as_ref()).await;
            return Err(e.into());
        }

        let mut fields = Map::new();
        fields.insert("id".to_string(), Value::from(id.as_str()));
        fields.insert("nama".to_string(), Value::from(nama));
        fields.insert("deskripsi".to_string(), Value::from(deskripsi));
        fields.insert("nutrition".to_string(), nutrition);
        fields.insert(FOOD_PICTURE_FIELD.to_string(), picture_value(picture.as_ref()));

        self.write_new(&doc, &fields, picture.as_ref()).await?;

        tracing::info!(kategori = %category, makanan_id = %id, "食品アイテムを作成");
        Ok(id)
    }

    /// 食品アイテムの指定フィールドを更新し、書き込んだフィールドを返す
    pub async fn update_food_item(
        &self,
        kategori: &str,
        id: &str,
        form: FoodItemForm,
    ) -> Result<Map<String, Value>, ServerError> {
        let kind = EntityKind::FoodItem {
            category: DocumentId::new(kategori)?,
        };
        let doc = DocumentRef::new(kind.collection()?, DocumentId::new(id)?);

        let mut changes = Map::new();
        if let Some(nama) = form.nama {
            changes.insert("nama".to_string(), Value::from(nama));
        }
        if let Some(deskripsi) = form.deskripsi {
            changes.insert("deskripsi".to_string(), Value::from(deskripsi));
        }
        if let Some(nutrition) = form.nutrition {
            changes.insert("nutrition".to_string(), parse_nutrition(&nutrition)?);
        }
        if changes.is_empty() && form.picture.is_none() {
            return Err(nothing_to_update());
        }

        let prefix = format!("makanan/{kategori}/{}", doc.id);
        self.update_with_picture(
            &kind,
            &doc,
            changes,
            form.picture.map(|image| (prefix, image)),
            FOOD_PICTURE_FIELD,
        )
        .await
    }

    /// 既存ドキュメントを更新する
    ///
    /// 1. 保存済みドキュメントを取得（なければ NotFound）
    /// 2. 新しい画像をアップロード
    /// 3. 指定フィールドを書き込む
    /// 4. 差し替え前の画像を削除
    async fn update_with_picture(
        &self,
        kind: &EntityKind,
        doc: &DocumentRef,
        mut changes: Map<String, Value>,
        picture: Option<(String, ImageUpload)>,
        picture_field: &str,
    ) -> Result<Map<String, Value>, ServerError> {
        if let Some((_, image)) = &picture {
            validate_image(image)?;
        }

        let stored = self
            .documents
            .get_document(doc)
            .await?
            .ok_or_else(|| not_found(kind, doc))?;
        let previous = stored
            .string_field(picture_field)
            .and_then(|value| BlobLocator::from_stored_value(value, &self.storage_base).ok());

        let uploaded = match picture {
            Some((prefix, image)) => Some(self.upload(&prefix, image).await?),
            None => None,
        };
        if let Some(picture) = &uploaded {
            changes.insert(picture_field.to_string(), Value::from(picture.url.as_str()));
        }

        let written = match self.documents.update_fields(doc, &changes).await {
            Ok(written) => written,
            Err(e) => {
                self.discard(uploaded.as_ref()).await;
                return Err(e.into());
            }
        };
        // 取得後に削除された場合
        if written.is_none() {
            self.discard(uploaded.as_ref()).await;
            return Err(not_found(kind, doc).into());
        }

        if let (Some(old), Some(new)) = (previous, uploaded.as_ref()) {
            if old != new.locator {
                self.discard_locator(&old).await;
            }
        }

        tracing::info!(doc = %doc, fields = changes.len(), "カタログを更新");
        Ok(changes)
    }

    async fn upload(&self, prefix: &str, image: ImageUpload) -> Result<StoredPicture, ServerError> {
        let locator = BlobLocator::new(format!("{prefix}/{}", object_file_name(&image.file_name)))?;
        let content_type = image
            .content_type
            .as_deref()
            .unwrap_or(DEFAULT_CONTENT_TYPE);

        self.blobs
            .upload_object(&locator, content_type, image.bytes)
            .await?;

        let url = self.storage_base.public_url(&locator);
        tracing::debug!(object = %locator, "画像をアップロード");
        Ok(StoredPicture { locator, url })
    }

    /// 新規ドキュメントを書き込む。失敗したらアップロード済みの画像を削除する。
    async fn write_new(
        &self,
        doc: &DocumentRef,
        fields: &Map<String, Value>,
        picture: Option<&StoredPicture>,
    ) -> Result<(), ServerError> {
        if let Err(e) = self.documents.set_document(doc, fields).await {
            self.discard(picture).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn discard(&self, picture: Option<&StoredPicture>) {
        if let Some(picture) = picture {
            self.discard_locator(&picture.locator).await;
        }
    }

    /// 画像を削除する。失敗はログに残して続行する。
    async fn discard_locator(&self, locator: &BlobLocator) {
        if let Err(e) = self.blobs.delete_object(locator).await {
            tracing::warn!(object = %locator, error = %e, "画像の削除に失敗");
        }
    }
}

fn new_document_id(prefix: &str) -> Result<DocumentId, DomainError> {
    DocumentId::new(format!("{prefix}{}", Uuid::now_v7().simple()))
}

/// パス区切りを取り除いたファイル名
fn object_file_name(file_name: &str) -> &str {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if base.is_empty() { DEFAULT_FILE_NAME } else { base }
}

fn picture_value(picture: Option<&StoredPicture>) -> Value {
    picture.map_or(Value::Null, |p| Value::from(p.url.as_str()))
}

fn parse_nutrition(raw: &str) -> Result<Value, ServerError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        _ => Err(ServerError::BadRequest(
            "nutrition は JSON オブジェクトで指定してください".to_string(),
        )),
    }
}

fn nothing_to_update() -> ServerError {
    ServerError::BadRequest("更新する項目がありません".to_string())
}

fn not_found(kind: &EntityKind, doc: &DocumentRef) -> DomainError {
    DomainError::NotFound {
        entity_type: kind.entity_type(),
        id:          doc.path(),
    }
}
