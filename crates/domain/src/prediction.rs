//! # 画像分類の推論結果

use serde::{Deserialize, Serialize};

use crate::document::DocumentRecord;

/// 推論エンドポイントの応答
///
/// `predicted_class` は食品アイテムの `nama` フィールドと照合される。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub predicted_class: String,
    #[serde(default)]
    pub confidence:      Option<f64>,
}

/// 推論結果に食品情報を添えたもの
///
/// 一致する食品アイテムがなければ `food_info` は `null`。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub predicted_class: String,
    pub confidence:      Option<f64>,
    pub food_info:       Option<FoodInfo>,
}

/// 食品アイテムとそのカテゴリ
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodInfo {
    #[serde(flatten)]
    pub item:     DocumentRecord,
    pub kategori: String,
}

impl PredictionResult {
    pub fn new(prediction: Prediction, food_info: Option<FoodInfo>) -> Self {
        Self {
            predicted_class: prediction.predicted_class,
            confidence: prediction.confidence,
            food_info,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::collection::DocumentId;

    #[test]
    fn test_confidenceなしの応答をデシリアライズできる() {
        let prediction: Prediction =
            serde_json::from_value(json!({ "predicted_class": "Apel" })).unwrap();

        assert_eq!(prediction.predicted_class, "Apel");
        assert_eq!(prediction.confidence, None);
    }

    #[test]
    fn test_食品情報はアイテムとカテゴリをフラットに出力する() {
        let mut fields = serde_json::Map::new();
        fields.insert("nama".to_string(), json!("Apel"));
        let result = PredictionResult::new(
            Prediction {
                predicted_class: "Apel".to_string(),
                confidence:      Some(0.93),
            },
            Some(FoodInfo {
                item:     DocumentRecord::new(DocumentId::new("f1").unwrap(), fields),
                kategori: "buah".to_string(),
            }),
        );

        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(
            json,
            json!({
                "predicted_class": "Apel",
                "confidence": 0.93,
                "food_info": { "id": "f1", "nama": "Apel", "kategori": "buah" }
            })
        );
    }

    #[test]
    fn test_一致する食品がなければfood_infoはnullになる() {
        let result = PredictionResult::new(
            Prediction {
                predicted_class: "Unknown".to_string(),
                confidence:      None,
            },
            None,
        );

        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["food_info"], serde_json::Value::Null);
    }
}
