//! Billing cycle value object
//!
//! A billing cycle is a closed `[start, end]` interval over which usage is
//! aggregated for charging. This crate only consumes cycles; it never owns
//! or advances them.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::Serialize;

use crate::domain::shared::error::UsageError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::Timestamp;

const SECS_PER_DAY: i64 = 86_400;

/// An immutable, inclusive `[start, end]` timestamp pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BillingCycle {
    start: Timestamp,
    end: Timestamp,
}

impl BillingCycle {
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self> {
        if end < start {
            return Err(UsageError::InvalidInterval(format!(
                "billing cycle ends ({end}) before it starts ({start})"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn from_datetimes(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        Self::new(start.timestamp(), end.timestamp())
    }

    /// The calendar day (UTC) containing `instant`.
    pub fn day_of(instant: DateTime<Utc>) -> Self {
        let ts = instant.timestamp();
        let start = ts - ts.rem_euclid(SECS_PER_DAY);
        Self {
            start,
            end: start + SECS_PER_DAY - 1,
        }
    }

    /// The calendar month (UTC) containing `instant`.
    pub fn month_of(instant: DateTime<Utc>) -> Self {
        let (year, month) = (instant.year(), instant.month());
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        Self {
            start: first_of_month(year, month),
            end: first_of_month(next_year, next_month) - 1,
        }
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    /// Total covered length in seconds, inclusive of both endpoints.
    pub fn length_secs(&self) -> i64 {
        self.end - self.start + 1
    }

    pub fn contains(&self, instant: Timestamp) -> bool {
        self.start <= instant && instant <= self.end
    }
}

fn first_of_month(year: i32, month: u32) -> Timestamp {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .expect("first day of a month is a valid UTC instant")
        .timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverted_cycle_rejected() {
        assert!(BillingCycle::new(100, 99).is_err());
        assert!(BillingCycle::new(100, 100).is_ok());
    }

    #[test]
    fn test_length_is_inclusive() {
        let cycle = BillingCycle::new(100, 199).unwrap();
        assert_eq!(cycle.length_secs(), 100);

        let instant = BillingCycle::new(50, 50).unwrap();
        assert_eq!(instant.length_secs(), 1);
    }

    #[test]
    fn test_contains_endpoints() {
        let cycle = BillingCycle::new(100, 199).unwrap();
        assert!(cycle.contains(100));
        assert!(cycle.contains(199));
        assert!(!cycle.contains(99));
        assert!(!cycle.contains(200));
    }

    #[test]
    fn test_day_of_spans_midnight_to_midnight() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 15, 13, 45, 12).unwrap();
        let cycle = BillingCycle::day_of(instant);
        assert_eq!(cycle.length_secs(), 86_400);
        assert!(cycle.contains(instant.timestamp()));
        assert_eq!(cycle.start() % 86_400, 0);
    }

    #[test]
    fn test_month_of_handles_december_rollover() {
        let instant = Utc.with_ymd_and_hms(2024, 12, 25, 0, 0, 0).unwrap();
        let cycle = BillingCycle::month_of(instant);
        let jan_first = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(cycle.end(), jan_first.timestamp() - 1);
        assert!(cycle.contains(instant.timestamp()));
    }
}
