//! # Clock（時刻プロバイダ）
//!
//! 年齢計算で使う「今日」と、ドキュメントに記録する作成・更新時刻を
//! ユースケースに注入するための抽象化。

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// 現在時刻を提供するトレイト
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// UTC での今日の日付
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// ISO 8601（UTC、ミリ秒）の現在時刻。`created_at` / `updated_at` に使う。
    fn timestamp(&self) -> String {
        self.now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// システム時刻
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 固定時刻（テスト用）
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_todayはutcの日付を返す() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 0).unwrap());

        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_timestampはミリ秒精度のiso8601を返す() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap());

        assert_eq!(clock.timestamp(), "2024-06-01T08:30:00.000Z");
    }

    #[test]
    fn test_system_clockは現在時刻を返す() {
        let before = Utc::now();
        let result = SystemClock.now();

        assert!(result >= before);
        assert!(result <= Utc::now());
    }
}
