//! Time-related utilities with clock abstraction for testability.
//!
//! All timestamps handled by the chat engine are Unix milliseconds in UTC.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, TimeZone, Utc};

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Get current Unix timestamp (milliseconds)
    fn now_millis(&self) -> i64;
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        now_millis()
    }
}

/// Fixed clock implementation for testing (returns a fixed time)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed_time: i64,
}

impl FixedClock {
    /// Create a new fixed clock with the given timestamp
    pub fn new(fixed_time_millis: i64) -> Self {
        Self {
            fixed_time: fixed_time_millis,
        }
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.fixed_time
    }
}

/// Clock that advances by a fixed step on every read.
///
/// Two consecutive reads never return the same value, which makes
/// "strictly after" comparisons deterministic in tests.
#[derive(Debug)]
pub struct TickingClock {
    next: AtomicI64,
    step: i64,
}

impl TickingClock {
    /// Create a ticking clock starting at `start_millis`, advancing `step_millis` per read
    pub fn new(start_millis: i64, step_millis: i64) -> Self {
        Self {
            next: AtomicI64::new(start_millis),
            step: step_millis.max(1),
        }
    }
}

impl Clock for TickingClock {
    fn now_millis(&self) -> i64 {
        self.next.fetch_add(self.step, Ordering::SeqCst)
    }
}

/// Get current Unix timestamp (milliseconds)
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert Unix timestamp (milliseconds) to RFC 3339 format (UTC)
///
/// Out-of-range values fall back to the Unix epoch.
pub fn timestamp_to_rfc3339(timestamp_millis: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_millis)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        .to_rfc3339()
}

/// Parse an RFC 3339 string into Unix milliseconds
pub fn parse_rfc3339_millis(value: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_returns_non_zero_timestamp() {
        // テスト項目: SystemClock が 0 以外のタイムスタンプを返す
        // given (前提条件):
        let clock = SystemClock;

        // when (操作):
        let timestamp = clock.now_millis();

        // then (期待する結果):
        assert!(timestamp > 0);
    }

    #[test]
    fn test_fixed_clock_returns_consistent_timestamp() {
        // テスト項目: FixedClock が複数回呼び出しても同じタイムスタンプを返す
        // given (前提条件):
        let fixed_time = 9876543210987;
        let clock = FixedClock::new(fixed_time);

        // when (操作):
        let timestamp1 = clock.now_millis();
        let timestamp2 = clock.now_millis();

        // then (期待する結果):
        assert_eq!(timestamp1, fixed_time);
        assert_eq!(timestamp2, fixed_time);
    }

    #[test]
    fn test_ticking_clock_is_strictly_increasing() {
        // テスト項目: TickingClock は読むたびに step だけ進む
        // given (前提条件):
        let clock = TickingClock::new(1_000, 5);

        // when (操作):
        let first = clock.now_millis();
        let second = clock.now_millis();
        let third = clock.now_millis();

        // then (期待する結果):
        assert_eq!(first, 1_000);
        assert_eq!(second, 1_005);
        assert_eq!(third, 1_010);
    }

    #[test]
    fn test_ticking_clock_rejects_zero_step() {
        // テスト項目: step に 0 を渡しても時刻は進む
        let clock = TickingClock::new(10, 0);
        assert!(clock.now_millis() < clock.now_millis());
    }

    #[test]
    fn test_timestamp_to_rfc3339_format() {
        // テスト項目: ミリ秒タイムスタンプが UTC の RFC 3339 に変換される
        // given (前提条件):
        let timestamp = 1_700_000_000_123;

        // when (操作):
        let formatted = timestamp_to_rfc3339(timestamp);

        // then (期待する結果):
        assert_eq!(formatted, "2023-11-14T22:13:20.123+00:00");
    }

    #[test]
    fn test_parse_rfc3339_round_trips_with_offset() {
        // テスト項目: タイムゾーン付き RFC 3339 がミリ秒に変換される
        let parsed = parse_rfc3339_millis("2023-11-15T07:13:20.123+09:00");
        assert_eq!(parsed, Some(1_700_000_000_123));
        assert_eq!(parse_rfc3339_millis("yesterday"), None);
    }
}
