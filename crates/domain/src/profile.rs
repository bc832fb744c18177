//! # ユーザープロフィールの部分更新
//!
//! クライアントから送られる任意フィールドの集合を [`UserProfilePatch`] として受け取り、
//! 保存済みドキュメントとマージして書き込むフィールドを決定する。
//!
//! - 指定されたフィールドは上書きし、未指定・空のフィールドは保持する
//! - `birthdate` 指定時は `age` を再計算する（暦年の差）
//! - `weight` / `height` 指定時は、もう一方を保存値で補って `bmi` を再計算する

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::{DomainError, document::DocumentRecord};

/// 生年月日のフォーマット
const BIRTHDATE_FORMAT: &str = "%Y-%m-%d";

/// ユーザープロフィールの更新内容
///
/// JSON のキーは保存済みドキュメントと同じ（`dietPreference` のみ camelCase）。
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfilePatch {
    #[serde(default, deserialize_with = "non_empty_string")]
    pub name:            Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub sex:             Option<String>,
    /// `YYYY-MM-DD`
    #[serde(default, deserialize_with = "non_empty_string")]
    pub birthdate:       Option<String>,
    /// 体重（kg）
    #[serde(default, deserialize_with = "lenient_number")]
    pub weight:          Option<f64>,
    /// 身長（cm）
    #[serde(default, deserialize_with = "lenient_number")]
    pub height:          Option<f64>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub diet_preference: Option<String>,
}

impl UserProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.sex.is_none()
            && self.birthdate.is_none()
            && self.weight.is_none()
            && self.height.is_none()
            && self.diet_preference.is_none()
    }

    /// 保存済みドキュメントとマージし、書き込むフィールドを返す
    ///
    /// # エラー
    ///
    /// - 更新内容が空の場合
    /// - `birthdate` が `YYYY-MM-DD` でない場合
    /// - `weight` / `height` が正の値でない場合
    pub fn merge_into(
        &self,
        stored: &DocumentRecord,
        today: NaiveDate,
    ) -> Result<Map<String, Value>, DomainError> {
        if self.is_empty() {
            return Err(DomainError::Validation(
                "更新するフィールドがありません".to_string(),
            ));
        }

        let mut changes = Map::new();

        if let Some(name) = &self.name {
            changes.insert("name".to_string(), Value::from(name.as_str()));
        }
        if let Some(sex) = &self.sex {
            changes.insert("sex".to_string(), Value::from(sex.as_str()));
        }
        if let Some(birthdate) = &self.birthdate {
            let parsed = parse_birthdate(birthdate)?;
            changes.insert("birthdate".to_string(), Value::from(birthdate.as_str()));
            changes.insert("age".to_string(), Value::from(age_in_years(parsed, today)));
        }

        for (field, value) in [("weight", self.weight), ("height", self.height)] {
            if let Some(v) = value {
                changes.insert(field.to_string(), Value::from(positive(field, v)?));
            }
        }

        if self.weight.is_some() || self.height.is_some() {
            let weight = self.weight.or_else(|| stored.number_field("weight"));
            let height = self.height.or_else(|| stored.number_field("height"));
            if let Some(bmi) = weight.zip(height).and_then(|(w, h)| body_mass_index(w, h)) {
                changes.insert("bmi".to_string(), Value::from(bmi));
            }
        }

        if let Some(diet) = &self.diet_preference {
            changes.insert("dietPreference".to_string(), Value::from(diet.as_str()));
        }

        Ok(changes)
    }
}

/// `YYYY-MM-DD` の生年月日を解釈する
pub(crate) fn parse_birthdate(value: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(value, BIRTHDATE_FORMAT).map_err(|_| {
        DomainError::Validation(format!(
            "birthdate は YYYY-MM-DD 形式である必要があります: {value}"
        ))
    })
}

/// 体重・身長が正の有限値であることを確認する
pub(crate) fn positive(field: &str, value: f64) -> Result<f64, DomainError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(DomainError::Validation(format!(
            "{field} は正の数である必要があります"
        )))
    }
}

/// 暦年の差による年齢
pub fn age_in_years(birthdate: NaiveDate, today: NaiveDate) -> i32 {
    today.year() - birthdate.year()
}

/// BMI = 体重(kg) / 身長(m)^2
///
/// どちらかが正の値でなければ `None`。
pub fn body_mass_index(weight_kg: f64, height_cm: f64) -> Option<f64> {
    if weight_kg <= 0.0 || height_cm <= 0.0 {
        return None;
    }
    let height_m = height_cm / 100.0;
    Some(weight_kg / (height_m * height_m))
}

/// 空文字を `None` として扱う文字列デシリアライザ
pub(crate) fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

/// 数値または数値文字列を受け付けるデシリアライザ
///
/// フォーム由来のクライアントは `"60"` のように文字列で送ってくる。
pub(crate) fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        Text(String),
    }

    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrString::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("数値ではありません: {s}"))),
    }
}
