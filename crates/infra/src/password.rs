//! # パスワードハッシュ
//!
//! Argon2id によるパスワードのハッシュ化と検証。
//! ハッシュは PHC 文字列形式（`$argon2id$v=19$m=...`）で `users` ドキュメントに保存する。

use argon2::{
    Algorithm,
    Argon2,
    Params,
    PasswordHasher as _,
    PasswordVerifier as _,
    Version,
    password_hash::{PasswordHash as Argon2PasswordHash, SaltString, rand_core::OsRng},
};
use nutrilens_domain::password::{PasswordHash, PasswordVerifyResult, PlainPassword};

use crate::InfraError;

/// パスワードのハッシュ化と検証を担当するトレイト
pub trait PasswordChecker: Send + Sync {
    /// ランダムなソルトでハッシュ化する
    fn hash(&self, password: &PlainPassword) -> Result<PasswordHash, InfraError>;

    /// パスワードを検証する
    ///
    /// # Errors
    ///
    /// - 保存値が PHC 形式のハッシュでない場合
    fn verify(
        &self,
        password: &PlainPassword,
        hash: &PasswordHash,
    ) -> Result<PasswordVerifyResult, InfraError>;
}

/// Argon2id の実装
///
/// 既定は OWASP 推奨パラメータ（RFC 9106）:
/// - Memory: 64 MB
/// - Iterations: 1
/// - Parallelism: 1
///
/// 検証はハッシュに埋め込まれたパラメータで行うので、
/// パラメータを変えても既存のハッシュは検証できる。
pub struct Argon2PasswordChecker {
    argon2: Argon2<'static>,
}

impl Argon2PasswordChecker {
    pub fn new() -> Result<Self, InfraError> {
        Self::with_params(65536, 1, 1)
    }

    /// パラメータを指定して作成する（メモリは KiB 単位）
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, InfraError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| InfraError::password(format!("Argon2 パラメータが不正です: {e}")))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl PasswordChecker for Argon2PasswordChecker {
    fn hash(&self, password: &PlainPassword) -> Result<PasswordHash, InfraError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_str().as_bytes(), &salt)
            .map_err(|e| InfraError::password(format!("ハッシュ化に失敗: {e}")))?;

        Ok(PasswordHash::new(hash.to_string()))
    }

    fn verify(
        &self,
        password: &PlainPassword,
        hash: &PasswordHash,
    ) -> Result<PasswordVerifyResult, InfraError> {
        let parsed = Argon2PasswordHash::new(hash.as_str())
            .map_err(|e| InfraError::password(format!("不正なハッシュ形式: {e}")))?;

        let matched = self
            .argon2
            .verify_password(password.as_str().as_bytes(), &parsed)
            .is_ok();

        Ok(PasswordVerifyResult::from(matched))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InfraErrorKind;

    /// テストを軽くするため最小限のメモリで動かす
    fn sut() -> Argon2PasswordChecker {
        Argon2PasswordChecker::with_params(1024, 1, 1).unwrap()
    }

    #[test]
    fn test_ハッシュ化したパスワードを検証できる() {
        let sut = sut();
        let hash = sut.hash(&PlainPassword::new("rahasia123")).unwrap();

        assert!(hash.as_str().starts_with("$argon2id$v=19$m=1024,t=1,p=1$"));
        assert!(sut.verify(&PlainPassword::new("rahasia123"), &hash).unwrap().is_match());
        assert!(sut.verify(&PlainPassword::new("salah"), &hash).unwrap().is_mismatch());
    }

    #[test]
    fn test_同じパスワードでもソルトごとに異なるハッシュになる() {
        let sut = sut();
        let password = PlainPassword::new("rahasia123");

        assert_ne!(sut.hash(&password).unwrap(), sut.hash(&password).unwrap());
    }

    #[test]
    fn test_既定パラメータのハッシュも検証できる() {
        let hash = Argon2PasswordChecker::new()
            .unwrap()
            .hash(&PlainPassword::new("rahasia123"))
            .unwrap();

        let result = sut().verify(&PlainPassword::new("rahasia123"), &hash).unwrap();

        assert!(result.is_match());
    }

    #[test]
    fn test_不正なハッシュ形式はエラー() {
        let result = sut().verify(
            &PlainPassword::new("rahasia123"),
            &PasswordHash::new("$2b$05$bcrypt-style-hash"),
        );

        assert!(matches!(
            result.unwrap_err().kind(),
            InfraErrorKind::Password(_)
        ));
    }

    #[test]
    fn test_不正なパラメータはエラー() {
        assert!(Argon2PasswordChecker::with_params(0, 0, 0).is_err());
    }
}
