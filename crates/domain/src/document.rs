//! # ドキュメントレコード
//!
//! ドキュメントデータベースから読み出した 1 件分のデータ。
//! フィールドはワイヤ形式からデコード済みの JSON 値として保持する。

use serde::Serialize;
use serde_json::{Map, Value};

use crate::collection::DocumentId;

/// ドキュメント 1 件（ID + フィールド）
///
/// シリアライズ時は `{ "id": ..., ...fields }` のフラットな形になる。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentRecord {
    pub id:     DocumentId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl DocumentRecord {
    pub fn new(id: DocumentId, fields: Map<String, Value>) -> Self {
        Self { id, fields }
    }

    /// 空白以外を含む文字列フィールドを取得する
    ///
    /// 未設定・`null`・空文字・文字列以外は `None`。
    pub fn string_field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// 文字列または文字列配列のフィールドを取得する
    ///
    /// 単一値・配列のどちらで保存されていても、空でない値だけを返す。
    pub fn string_values(&self, name: &str) -> Vec<&str> {
        match self.fields.get(name) {
            Some(Value::String(s)) => Some(s.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .into_iter()
                .collect(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// 数値フィールドを取得する（数値文字列も受け付ける）
    pub fn number_field(&self, name: &str) -> Option<f64> {
        match self.fields.get(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}
