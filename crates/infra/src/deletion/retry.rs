//! # 一時的な障害のリトライ
//!
//! サブリソース削除を exponential backoff 付きで再試行する。
//! リトライするのは [`InfraError::is_transient`] が真のエラーのみ。

use std::{future::Future, time::Duration};

use crate::error::InfraError;

/// デフォルトのリトライ回数
pub const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(200);
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(5);

/// リトライ設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 初回を除く最大試行回数
    pub max_retries:     u32,
    pub initial_backoff: Duration,
    pub max_backoff:     Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries:     DEFAULT_MAX_RETRIES,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff:     DEFAULT_MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// リトライしない設定
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(self, max_retries: u32) -> Self {
        Self {
            max_retries,
            ..self
        }
    }

    /// `retry` 回目（0 始まり）の待機時間を計算する
    pub fn compute_backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// 一時的な障害の間だけ `operation` を再試行する
///
/// 恒久的なエラー、またはリトライ回数を使い切った時点のエラーをそのまま返す。
pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut attempt: F,
) -> Result<T, InfraError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, InfraError>>,
{
    let mut retry = 0;

    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() && retry < policy.max_retries => {
                let backoff = policy.compute_backoff(retry);
                retry += 1;
                tracing::warn!(
                    operation,
                    retry,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    error = %error,
                    "一時的な障害のためリトライ"
                );
                tokio::time::sleep(backoff).await;
            }
            Err(error) => return Err(error),
        }
    }
}
