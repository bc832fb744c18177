//! # アカウント
//!
//! ユーザー登録・ログイン・パスワード再設定の入力値と、
//! 登録時に `users` ドキュメントへ書き込むプロフィールの組み立て。
//!
//! 登録時の `age` と `bmi` は [`UserProfilePatch`](crate::profile::UserProfilePatch)
//! と同じ式で計算する。

use chrono::NaiveDate;
use derive_more::Display;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{
    DomainError,
    document::DocumentRecord,
    password::PlainPassword,
    profile::{
        age_in_years,
        body_mass_index,
        lenient_number,
        non_empty_string,
        parse_birthdate,
        positive,
    },
};

/// `users` ドキュメントのフィールド名
pub mod fields {
    pub const USER_ID: &str = "user_id";
    pub const FIREBASE_UID: &str = "firebase_uid";
    pub const EMAIL: &str = "email";
    pub const PASSWORD: &str = "password";
}

/// `dietPreference` 未指定時の値
pub const DEFAULT_DIET_PREFERENCE: &str = "Not Specified";

/// メールアドレス（値オブジェクト）
///
/// 前後の空白は取り除く。大文字小文字は保存値との照合のためそのまま保持する。
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize)]
#[display("{_0}")]
pub struct Email(String);

impl Email {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();

        let valid = value
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'))
            && !value.chars().any(char::is_whitespace);
        if !valid {
            return Err(DomainError::Validation(format!(
                "メールアドレスの形式が不正です: {value}"
            )));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// `POST /register` の入力
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(default, deserialize_with = "non_empty_string")]
    pub name:            Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub email:           Option<String>,
    #[serde(default, deserialize_with = "plain_password")]
    pub password:        Option<PlainPassword>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub sex:             Option<String>,
    /// `YYYY-MM-DD`
    #[serde(default, deserialize_with = "non_empty_string")]
    pub birthdate:       Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub weight:          Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub height:          Option<f64>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub diet_preference: Option<String>,
}

/// 検証済みの登録内容
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email:    Email,
    pub password: PlainPassword,
    /// `users` ドキュメントに書き込むプロフィール（ID・UID・ハッシュを除く）
    pub profile:  Map<String, Value>,
}

impl Registration {
    /// 必須項目と値の形式を検証し、保存するプロフィールを組み立てる
    ///
    /// # エラー
    ///
    /// - `name` / `email` / `password` / `birthdate` / `weight` / `height` のいずれかが欠けている
    /// - メールアドレス・生年月日の形式が不正、パスワードが短い
    /// - 体重・身長が正の値でない
    pub fn validate(self, today: NaiveDate) -> Result<NewAccount, DomainError> {
        let missing: Vec<&str> = [
            ("name", self.name.is_none()),
            ("email", self.email.is_none()),
            ("password", self.password.is_none()),
            ("birthdate", self.birthdate.is_none()),
            ("weight", self.weight.is_none()),
            ("height", self.height.is_none()),
        ]
        .into_iter()
        .filter_map(|(field, absent)| absent.then_some(field))
        .collect();
        if !missing.is_empty() {
            return Err(DomainError::Validation(format!(
                "必須項目がありません: {}",
                missing.join(", ")
            )));
        }

        let (
            Some(name),
            Some(email),
            Some(password),
            Some(birthdate),
            Some(weight),
            Some(height),
        ) = (
            self.name,
            self.email,
            self.password,
            self.birthdate,
            self.weight,
            self.height,
        )
        else {
            return Err(DomainError::Validation("必須項目がありません".to_string()));
        };

        let email = Email::new(email)?;
        let password = PlainPassword::for_registration(password.as_str())?;
        let born = parse_birthdate(&birthdate)?;
        let weight = positive("weight", weight)?;
        let height = positive("height", height)?;

        let mut profile = Map::new();
        profile.insert("name".to_string(), Value::from(name));
        profile.insert(fields::EMAIL.to_string(), Value::from(email.as_str()));
        if let Some(sex) = self.sex {
            profile.insert("sex".to_string(), Value::from(sex));
        }
        profile.insert("birthdate".to_string(), Value::from(birthdate));
        profile.insert("age".to_string(), Value::from(age_in_years(born, today)));
        profile.insert("weight".to_string(), Value::from(weight));
        profile.insert("height".to_string(), Value::from(height));
        if let Some(bmi) = body_mass_index(weight, height) {
            profile.insert("bmi".to_string(), Value::from(bmi));
        }
        profile.insert(
            "dietPreference".to_string(),
            Value::from(
                self.diet_preference
                    .unwrap_or_else(|| DEFAULT_DIET_PREFERENCE.to_string()),
            ),
        );

        Ok(NewAccount {
            email,
            password,
            profile,
        })
    }
}

/// `POST /login` の入力
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "non_empty_string")]
    pub email:    Option<String>,
    #[serde(default, deserialize_with = "plain_password")]
    pub password: Option<PlainPassword>,
}

impl LoginRequest {
    pub fn into_credentials(self) -> Result<(Email, PlainPassword), DomainError> {
        match (self.email, self.password) {
            (Some(email), Some(password)) => Ok((Email::new(email)?, password)),
            _ => Err(DomainError::Validation(
                "email と password は必須です".to_string(),
            )),
        }
    }
}

/// `POST /forgotPassword` の入力
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PasswordResetRequest {
    #[serde(default, deserialize_with = "non_empty_string")]
    pub email: Option<String>,
}

impl PasswordResetRequest {
    pub fn into_email(self) -> Result<Email, DomainError> {
        let email = self
            .email
            .ok_or_else(|| DomainError::Validation("email は必須です".to_string()))?;
        Email::new(email)
    }
}

/// 保存済みのパスワードハッシュを取り除く
///
/// ユーザーの参照系 API はハッシュを返さない。
pub fn without_credentials(mut record: DocumentRecord) -> DocumentRecord {
    record.fields.remove(fields::PASSWORD);
    record
}

/// 空文字を `None` として扱うパスワードのデシリアライザ
///
/// 前後の空白はパスワードの一部として保持する。
fn plain_password<'de, D>(deserializer: D) -> Result<Option<PlainPassword>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()).map(PlainPassword::new))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::collection::DocumentId;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn registration(value: Value) -> Registration {
        serde_json::from_value(value).unwrap()
    }

    fn complete() -> Value {
        json!({
            "name": "Siti",
            "email": "siti@example.com",
            "password": "rahasia123",
            "birthdate": "2000-01-15",
            "weight": "64",
            "height": 160
        })
    }

    #[test]
    fn test_登録内容から年齢とbmiを含むプロフィールを組み立てる() {
        let account = registration(complete()).validate(today()).unwrap();

        assert_eq!(account.email.as_str(), "siti@example.com");
        assert_eq!(account.profile["age"], json!(24));
        assert!((account.profile["bmi"].as_f64().unwrap() - 25.0).abs() < 1e-9);
        assert_eq!(account.profile["dietPreference"], "Not Specified");
        assert!(account.profile.get("sex").is_none());
        assert!(account.profile.get("password").is_none());
    }

    #[test]
    fn test_欠けている必須項目をすべて列挙する() {
        let result = registration(json!({ "name": "Siti", "weight": 60 })).validate(today());

        let Err(DomainError::Validation(msg)) = result else {
            panic!("Validation エラーになるべき");
        };
        assert_eq!(msg, "必須項目がありません: email, password, birthdate, height");
    }

    #[rstest]
    #[case::short_password(json!({ "password": "123" }))]
    #[case::bad_email(json!({ "email": "siti" }))]
    #[case::bad_birthdate(json!({ "birthdate": "15/01/2000" }))]
    #[case::negative_weight(json!({ "weight": -1 }))]
    fn test_不正な登録内容はバリデーションエラーになる(#[case] overrides: Value) {
        let mut input = complete();
        for (key, value) in overrides.as_object().unwrap() {
            input[key] = value.clone();
        }

        let result = registration(input).validate(today());

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[rstest]
    #[case("siti@example.com", true)]
    #[case("  siti@example.com ", true)]
    #[case("@example.com", false)]
    #[case("siti@localhost", false)]
    #[case("si ti@example.com", false)]
    fn test_メールアドレスの形式を検証する(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(Email::new(input).is_ok(), ok);
    }

    #[test]
    fn test_ログイン入力は空のパスワードを未指定として扱う() {
        let request: LoginRequest =
            serde_json::from_value(json!({ "email": "siti@example.com", "password": "" }))
                .unwrap();

        assert!(matches!(
            request.into_credentials(),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_参照用レコードからパスワードハッシュを取り除く() {
        let Value::Object(fields) = json!({ "name": "Siti", "password": "$argon2id$..." }) else {
            unreachable!()
        };
        let record = DocumentRecord::new(DocumentId::new("u1").unwrap(), fields);

        let sut = without_credentials(record);

        assert!(sut.fields.get("password").is_none());
        assert_eq!(sut.string_field("name"), Some("Siti"));
    }
}
