//! Payment deadline countdown
//!
//! Read-time derivation of the payment deadline from an order's creation
//! time. The UI polls order state and re-derives this every second; nothing
//! here schedules anything server-side. `now` is injected so the buckets are
//! testable at fixed instants.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Payment proof must arrive within this many hours of order creation.
pub const PAYMENT_WINDOW_HOURS: i64 = 24;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CountdownStatus {
    Normal,
    Warning,
    Danger,
    Expired,
}

/// Non-negative remaining time, decomposed for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Remaining {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct PaymentCountdown {
    pub deadline: DateTime<Utc>,
    pub remaining: Remaining,
    pub status: CountdownStatus,
}

/// Total over its whole domain: a deadline already passed maps to `Expired`
/// with a zeroed remainder, never an error.
pub fn payment_countdown(created_at: DateTime<Utc>, now: DateTime<Utc>) -> PaymentCountdown {
    let deadline = created_at + Duration::hours(PAYMENT_WINDOW_HOURS);
    let left = deadline - now;

    let status = if left <= Duration::zero() {
        CountdownStatus::Expired
    } else if left <= Duration::minutes(15) {
        CountdownStatus::Danger
    } else if left <= Duration::minutes(60) {
        CountdownStatus::Warning
    } else {
        CountdownStatus::Normal
    };

    let secs = left.num_seconds().max(0);
    let remaining = Remaining {
        days: secs / 86_400,
        hours: secs % 86_400 / 3_600,
        minutes: secs % 3_600 / 60,
        seconds: secs % 60,
    };

    PaymentCountdown { deadline, remaining, status }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_fresh_order_is_normal() {
        let c = payment_countdown(created(), created());
        assert_eq!(c.status, CountdownStatus::Normal);
        assert_eq!(c.deadline, created() + Duration::hours(24));
        assert_eq!(c.remaining, Remaining { days: 1, hours: 0, minutes: 0, seconds: 0 });
    }

    #[test]
    fn test_midway_decomposition() {
        let c = payment_countdown(created(), created() + Duration::hours(12) + Duration::seconds(30));
        assert_eq!(c.status, CountdownStatus::Normal);
        assert_eq!(c.remaining, Remaining { days: 0, hours: 11, minutes: 59, seconds: 30 });
    }

    #[test]
    fn test_warning_inside_last_hour() {
        let c = payment_countdown(created(), created() + Duration::hours(23) + Duration::minutes(31));
        assert_eq!(c.status, CountdownStatus::Warning);
        assert_eq!(c.remaining, Remaining { days: 0, hours: 0, minutes: 29, seconds: 0 });
    }

    #[test]
    fn test_danger_near_deadline() {
        let c = payment_countdown(created(), created() + Duration::hours(23) + Duration::minutes(45));
        assert_eq!(c.status, CountdownStatus::Danger);
        assert_eq!(c.remaining, Remaining { days: 0, hours: 0, minutes: 15, seconds: 0 });
    }

    #[test]
    fn test_expired_at_deadline() {
        let c = payment_countdown(created(), created() + Duration::hours(24));
        assert_eq!(c.status, CountdownStatus::Expired);
        assert_eq!(c.remaining, Remaining { days: 0, hours: 0, minutes: 0, seconds: 0 });
    }

    #[test]
    fn test_past_deadline_clamps_to_zero() {
        let c = payment_countdown(created(), created() + Duration::hours(30));
        assert_eq!(c.status, CountdownStatus::Expired);
        assert_eq!(c.remaining, Remaining { days: 0, hours: 0, minutes: 0, seconds: 0 });
    }
}
