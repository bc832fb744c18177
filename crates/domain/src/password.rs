//! # パスワード
//!
//! パスワード関連の値オブジェクトを定義する。
//!
//! | 型 | 用途 |
//! |---|------|
//! | [`PlainPassword`] | 登録・ログイン時の入力値 |
//! | [`PasswordHash`] | `users` ドキュメントに保存するハッシュ値 |
//! | [`PasswordVerifyResult`] | パスワード検証の成否 |

use crate::DomainError;

/// 登録時に要求する最小文字数（Firebase Auth の制約と同じ）
pub const MIN_PASSWORD_CHARS: usize = 6;

/// 平文パスワード
///
/// Debug 出力ではパスワードの値をマスクする。
#[derive(Clone)]
pub struct PlainPassword(String);

impl std::fmt::Debug for PlainPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PlainPassword").field(&"[REDACTED]").finish()
    }
}

impl PlainPassword {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// 新規登録用のパスワードを作成する
    ///
    /// [`MIN_PASSWORD_CHARS`] 文字未満は `Validation` エラー。
    pub fn for_registration(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.chars().count() < MIN_PASSWORD_CHARS {
            return Err(DomainError::Validation(format!(
                "password は {MIN_PASSWORD_CHARS} 文字以上である必要があります"
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// パスワードハッシュ（PHC 文字列形式の Argon2id）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// パスワード検証結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordVerifyResult {
    Match,
    Mismatch,
}

impl PasswordVerifyResult {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }

    pub fn is_mismatch(&self) -> bool {
        matches!(self, Self::Mismatch)
    }
}

impl From<bool> for PasswordVerifyResult {
    fn from(matched: bool) -> Self {
        if matched { Self::Match } else { Self::Mismatch }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_平文パスワードのdebug出力はマスクされる() {
        let password = PlainPassword::new("secret");

        let debug = format!("{password:?}");

        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret"));
    }

    #[rstest]
    #[case("12345", false)]
    #[case("123456", true)]
    #[case("ぱすわーどです", true)]
    fn test_登録用パスワードは6文字以上を要求する(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(PlainPassword::for_registration(input).is_ok(), ok);
    }

    #[test]
    fn test_boolから検証結果に変換する() {
        assert_eq!(PasswordVerifyResult::from(true), PasswordVerifyResult::Match);
        assert!(PasswordVerifyResult::from(false).is_mismatch());
    }
}
