//! # コレクションとドキュメントの識別
//!
//! ドキュメントデータベース上の位置を表す値オブジェクトと、
//! エンティティ種別ごとの外部参照スキーマを定義する。
//!
//! ## 含まれる型
//!
//! | 型 | 用途 |
//! |---|------|
//! | [`CollectionPath`] | コレクションのパス（`users`, `makanan/buah/items` など） |
//! | [`DocumentId`] | コレクション内のドキュメント ID |
//! | [`DocumentRef`] | コレクション + ID の組 |
//! | [`ReferenceSchema`] | ストレージ参照・認証参照を保持するフィールド名 |
//! | [`EntityKind`] | ユーザー / 記事 / 食品アイテム |
//! | [`CollectionSpec`] | 削除対象コレクションとスキーマの組 |

use derive_more::Display;
use serde::Serialize;

use crate::DomainError;

/// ユーザーコレクション名
pub const USERS: &str = "users";
/// 記事コレクション名
pub const ARTICLES: &str = "articles";
/// 食品カテゴリのコレクション名
pub const FOOD_CATEGORIES: &str = "makanan";
/// カテゴリ配下の食品アイテムのサブコレクション名
pub const FOOD_ITEMS: &str = "items";

/// コレクションのパス（値オブジェクト）
///
/// スラッシュ区切りのセグメント列。トップレベルは 1 セグメント、
/// サブコレクションは `collection/doc/subcollection` のように奇数個のセグメントになる。
///
/// # 不変条件
///
/// - セグメントは 1 つ以上かつ奇数個
/// - 各セグメントは空でない
///
/// # 使用例
///
/// ```rust
/// use nutrilens_domain::collection::CollectionPath;
///
/// let path = CollectionPath::new("makanan/buah/items").unwrap();
/// assert_eq!(path.collection_id(), "items");
/// assert_eq!(path.parent_document(), Some("makanan/buah"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize)]
#[display("{_0}")]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().trim_matches('/').to_string();

        if value.is_empty() {
            return Err(DomainError::Validation(
                "コレクションパスは必須です".to_string(),
            ));
        }

        let segments: Vec<&str> = value.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(DomainError::Validation(format!(
                "コレクションパスに空のセグメントが含まれています: {value}"
            )));
        }
        if segments.len() % 2 == 0 {
            return Err(DomainError::Validation(format!(
                "コレクションパスのセグメント数は奇数である必要があります: {value}"
            )));
        }

        Ok(Self(value))
    }

    /// 親ドキュメント配下のサブコレクションのパスを作成する
    pub fn subcollection(&self, document: &DocumentId, name: &str) -> Result<Self, DomainError> {
        Self::new(format!("{}/{}/{}", self.0, document.as_str(), name))
    }

    /// 末尾のコレクション ID（`makanan/buah/items` なら `items`）
    pub fn collection_id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// 親ドキュメントのパス（トップレベルコレクションなら `None`）
    pub fn parent_document(&self) -> Option<&str> {
        self.0.rsplit_once('/').map(|(parent, _)| parent)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// ドキュメント ID（値オブジェクト）
///
/// # 不変条件
///
/// - 空でない
/// - `/` を含まない（パスの区切りと衝突するため）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize)]
#[display("{_0}")]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();

        if value.trim().is_empty() {
            return Err(DomainError::Validation(
                "ドキュメント ID は必須です".to_string(),
            ));
        }
        if value.contains('/') {
            return Err(DomainError::Validation(format!(
                "ドキュメント ID に '/' は使用できません: {value}"
            )));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// ドキュメントへの参照（コレクション + ID）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("{collection}/{id}")]
pub struct DocumentRef {
    pub collection: CollectionPath,
    pub id:         DocumentId,
}

impl DocumentRef {
    pub fn new(collection: CollectionPath, id: DocumentId) -> Self {
        Self { collection, id }
    }

    /// データベースルートからの相対パス（`users/u1` 形式）
    pub fn path(&self) -> String {
        self.to_string()
    }
}

/// 外部参照を保持するフィールド名の組
///
/// ドキュメントが外部参照の唯一の情報源となる。
/// 削除前にこのスキーマに従って参照を読み取る。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceSchema {
    /// ストレージオブジェクトの URL / パスを保持するフィールド
    pub storage_field: Option<&'static str>,
    /// 認証プリンシパル ID を保持するフィールド
    pub auth_field:    Option<&'static str>,
}

impl ReferenceSchema {
    /// 認証フィールド名（ユーザーと汎用コレクションで共通）
    pub const AUTH_UID_FIELD: &'static str = "firebase_uid";

    /// 種別不明のコレクション用スキーマ
    ///
    /// データベース全削除では `firebase_uid` のみを参照として扱う。
    pub const fn generic() -> Self {
        Self {
            storage_field: None,
            auth_field:    Some(Self::AUTH_UID_FIELD),
        }
    }
}

/// 削除・参照対象のエンティティ種別
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Article,
    /// `makanan/{category}/items` 配下の食品アイテム
    FoodItem { category: DocumentId },
}

impl EntityKind {
    /// エラーメッセージ・ログ用の種別名
    pub fn entity_type(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Article => "Article",
            Self::FoodItem { .. } => "FoodItem",
        }
    }

    pub fn schema(&self) -> ReferenceSchema {
        match self {
            Self::User => ReferenceSchema {
                storage_field: Some("user_picture"),
                auth_field:    Some(ReferenceSchema::AUTH_UID_FIELD),
            },
            Self::Article => ReferenceSchema {
                storage_field: Some("article_picture"),
                auth_field:    None,
            },
            Self::FoodItem { .. } => ReferenceSchema {
                storage_field: Some("makanan_picture"),
                auth_field:    None,
            },
        }
    }

    pub fn collection(&self) -> Result<CollectionPath, DomainError> {
        match self {
            Self::User => CollectionPath::new(USERS),
            Self::Article => CollectionPath::new(ARTICLES),
            Self::FoodItem { category } => {
                CollectionPath::new(FOOD_CATEGORIES)?.subcollection(category, FOOD_ITEMS)
            }
        }
    }

    /// コレクションとスキーマの組を作成する
    pub fn spec(&self) -> Result<CollectionSpec, DomainError> {
        Ok(CollectionSpec {
            path:        self.collection()?,
            schema:      self.schema(),
            entity_type: self.entity_type(),
        })
    }
}

/// 削除対象コレクションの仕様
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub path:        CollectionPath,
    pub schema:      ReferenceSchema,
    pub entity_type: &'static str,
}

impl CollectionSpec {
    /// 種別不明のトップレベルコレクション用の仕様を作成する
    pub fn generic(path: CollectionPath) -> Self {
        Self {
            path,
            schema: ReferenceSchema::generic(),
            entity_type: "Document",
        }
    }
}
