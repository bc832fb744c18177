//! # ドメインエラー
//!
//! サーバー側で `Validation` は 400、`NotFound` は 404 に変換される。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// 入力や保存済みの値が不正
    ///
    /// 空のドキュメント ID、解決できないストレージ参照、
    /// `YYYY-MM-DD` でない生年月日など。
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// ドキュメントが存在しない
    #[error("{entity_type} が見つかりません: {id}")]
    NotFound {
        /// "User" / "Article" / "FoodItem" など
        entity_type: &'static str,
        id:          String,
    },
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_not_foundのメッセージに種別とidを含む() {
        let sut = DomainError::NotFound {
            entity_type: "FoodItem",
            id:          "apel".to_string(),
        };

        assert_eq!(sut.to_string(), "FoodItem が見つかりません: apel");
    }
}
