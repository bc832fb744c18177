//! Firestore REST の型付き値 ⇔ JSON 値の変換
//!
//! Firestore は値を `{"stringValue": "..."}` のような型タグ付きオブジェクトで表現する。
//! ドメイン層はプレーンな JSON として扱うため、ここで相互変換する。

use serde_json::{Map, Number, Value, json};

use crate::error::InfraError;

/// `fields` オブジェクトをプレーンな JSON に変換する
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Map<String, Value>, InfraError> {
    fields
        .iter()
        .map(|(name, value)| Ok((name.clone(), decode_value(value)?)))
        .collect()
}

/// 型タグ付きの値を 1 つ変換する
pub fn decode_value(value: &Value) -> Result<Value, InfraError> {
    let Some(object) = value.as_object() else {
        return Err(InfraError::malformed(format!(
            "Firestore の値はオブジェクトである必要があります: {value}"
        )));
    };
    let Some((tag, inner)) = object.iter().next() else {
        return Ok(Value::Null);
    };

    let decoded = match tag.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => Value::Bool(inner.as_bool().unwrap_or_default()),
        // int64 は文字列でエンコードされる
        "integerValue" => match inner {
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| InfraError::malformed(format!("integerValue が不正です: {s}")))?,
            Value::Number(n) => Value::Number(n.clone()),
            other => {
                return Err(InfraError::malformed(format!(
                    "integerValue が不正です: {other}"
                )));
            }
        },
        // NaN / Infinity は文字列で届くが JSON で表現できないため null にする
        "doubleValue" => inner
            .as_f64()
            .and_then(Number::from_f64)
            .map_or(Value::Null, Value::Number),
        "stringValue" | "timestampValue" | "bytesValue" | "referenceValue" => inner.clone(),
        "geoPointValue" => inner.clone(),
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect::<Result<Vec<_>, _>>())
                .transpose()?
                .unwrap_or_default();
            Value::Array(values)
        }
        "mapValue" => {
            let fields = match inner.get("fields").and_then(Value::as_object) {
                Some(fields) => decode_fields(fields)?,
                None => Map::new(),
            };
            Value::Object(fields)
        }
        other => {
            return Err(InfraError::malformed(format!(
                "未対応の Firestore 値型です: {other}"
            )));
        }
    };

    Ok(decoded)
}

/// プレーンな JSON オブジェクトを `fields` 形式に変換する
pub fn encode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), encode_value(value)))
        .collect()
}

/// JSON 値を型タグ付きの値に変換する
///
/// 整数は `integerValue`、それ以外の数値は `doubleValue` になる。
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) if n.is_i64() || n.is_u64() => json!({ "integerValue": n.to_string() }),
        Value::Number(n) => json!({ "doubleValue": n }),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            json!({ "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}
