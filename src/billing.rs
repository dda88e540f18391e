//! Billing-cycle date math.
//!
//! Pure calendar arithmetic that maps purchase dates onto credit-card
//! statement periods and payment due dates. Everything here works on
//! `chrono::NaiveDate` so day-of-month extraction can never mix local and UTC
//! calendars; callers parse/format ISO strings at the boundary.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A credit-card statement period, identified as "YYYY-MM".
///
/// Ordered chronologically, so period math like "advance three installments"
/// is `plus_months(3)` and comparisons behave as expected in queries/tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatementPeriod {
    year: i32,
    month: u32, // 1-12
}

impl StatementPeriod {
    /// Builds a period from its parts. `month` must be in 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(StatementPeriod { year, month })
        } else {
            None
        }
    }

    /// The calendar month a date falls in.
    pub fn from_date(date: NaiveDate) -> Self {
        StatementPeriod {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    /// The period `months` months later (year rollover handled).
    pub fn plus_months(self, months: u32) -> Self {
        let zero_based = i64::from(self.month) - 1 + i64::from(months);
        StatementPeriod {
            year: self.year + (zero_based / 12) as i32,
            month: (zero_based % 12) as u32 + 1,
        }
    }

    /// The immediately following period.
    pub fn next(self) -> Self {
        self.plus_months(1)
    }

    /// The immediately preceding period.
    pub fn prev(self) -> Self {
        if self.month == 1 {
            StatementPeriod {
                year: self.year - 1,
                month: 12,
            }
        } else {
            StatementPeriod {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// First calendar day of the period's month.
    pub fn first_day(self) -> NaiveDate {
        // month is kept in 1..=12, so this cannot fail
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap()
    }

    /// Last calendar day of the period's month (handles leap years).
    pub fn last_day(self) -> NaiveDate {
        self.next().first_day().pred_opt().unwrap()
    }

    /// Number of days in the period's month.
    pub fn days_in_month(self) -> u32 {
        self.last_day().day()
    }
}

impl fmt::Display for StatementPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for StatementPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year_str, month_str) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid statement period '{}': expected YYYY-MM", s))?;
        let year: i32 = year_str
            .parse()
            .map_err(|_| format!("invalid statement period '{}': bad year", s))?;
        let month: u32 = month_str
            .parse()
            .map_err(|_| format!("invalid statement period '{}': bad month", s))?;
        StatementPeriod::new(year, month)
            .ok_or_else(|| format!("invalid statement period '{}': month out of range", s))
    }
}

// Serialized as the boundary string form ("YYYY-MM"), not as a struct.
impl Serialize for StatementPeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StatementPeriod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A day-of-month turned into a concrete date within `period`, clamped to the
/// last real day of that month (closing day 30 in February yields Feb 28/29).
///
/// Every place a cycle day becomes a date goes through this helper so that
/// short-month behavior stays uniform.
pub fn clamped_date(period: StatementPeriod, day: u32) -> NaiveDate {
    let day = day.min(period.days_in_month()).max(1);
    NaiveDate::from_ymd_opt(period.year(), period.month(), day).unwrap()
}

/// The statement period a purchase belongs to.
///
/// A purchase made on or before the closing day lands in its own calendar
/// month; after the closing day it rolls to the following month (with year
/// rollover at December).
pub fn statement_period(purchase_date: NaiveDate, closing_day: u32) -> StatementPeriod {
    let period = StatementPeriod::from_date(purchase_date);
    if purchase_date.day() <= closing_day {
        period
    } else {
        period.next()
    }
}

/// The concrete date a statement period stops accepting charges.
pub fn statement_closing_date(period: StatementPeriod, closing_day: u32) -> NaiveDate {
    clamped_date(period, closing_day)
}

/// The date payment for a statement is due.
///
/// When `payment_due_day <= closing_day` the due date falls in the month
/// after the period: the cardholder cannot be asked to pay before the
/// statement has closed. The boundary is a strict `<=`: equal days push to
/// the next month. Otherwise the due date falls inside the period's own
/// month, which already lies after the closing day.
pub fn statement_due_date(
    period: StatementPeriod,
    payment_due_day: u32,
    closing_day: u32,
) -> NaiveDate {
    if payment_due_day <= closing_day {
        clamped_date(period.next(), payment_due_day)
    } else {
        clamped_date(period, payment_due_day)
    }
}

/// First calendar day belonging to a statement period: one day after the
/// previous period's clamped closing date.
pub fn statement_window_start(period: StatementPeriod, closing_day: u32) -> NaiveDate {
    statement_closing_date(period.prev(), closing_day)
        .succ_opt()
        .unwrap()
}

/// The same day-of-month `months` months after `date`, clamped to the target
/// month's length (Jan 31 + 1 month = Feb 28/29). Used to spread installment
/// dates for accounts without a billing cycle.
pub fn shift_months(date: NaiveDate, months: u32) -> NaiveDate {
    let target = StatementPeriod::from_date(date).plus_months(months);
    clamped_date(target, date.day())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn period(y: i32, m: u32) -> StatementPeriod {
        StatementPeriod::new(y, m).unwrap()
    }

    #[test]
    fn test_period_display_and_parse_roundtrip() {
        let p = period(2025, 3);
        assert_eq!(p.to_string(), "2025-03");
        assert_eq!("2025-03".parse::<StatementPeriod>().unwrap(), p);
        assert!("2025-13".parse::<StatementPeriod>().is_err());
        assert!("202503".parse::<StatementPeriod>().is_err());
    }

    #[test]
    fn test_plus_months_rolls_year() {
        assert_eq!(period(2025, 11).plus_months(1), period(2025, 12));
        assert_eq!(period(2025, 11).plus_months(2), period(2026, 1));
        assert_eq!(period(2025, 1).plus_months(24), period(2027, 1));
        assert_eq!(period(2025, 1).prev(), period(2024, 12));
    }

    #[test]
    fn test_statement_period_boundary() {
        // Purchase on the closing day stays in the current period...
        assert_eq!(statement_period(date(2025, 1, 15), 15), period(2025, 1));
        // ...one day later it rolls to the next.
        assert_eq!(statement_period(date(2025, 1, 16), 15), period(2025, 2));
        // December purchases past the closing day roll the year.
        assert_eq!(statement_period(date(2025, 12, 20), 15), period(2026, 1));
    }

    #[test]
    fn test_statement_period_monotonic_in_purchase_date() {
        let closing_day = 10;
        let mut day = date(2024, 12, 1);
        let mut last = statement_period(day, closing_day);
        // Walk day-by-day across a year boundary and a leap February.
        for _ in 0..450 {
            day = day.succ_opt().unwrap();
            let next = statement_period(day, closing_day);
            assert!(next >= last, "period regressed at {}", day);
            last = next;
        }
    }

    #[test]
    fn test_due_date_before_or_on_closing_day_pushes_to_next_month() {
        assert_eq!(
            statement_due_date(period(2025, 1), 5, 15),
            date(2025, 2, 5)
        );
        // Equal-day boundary: still next month.
        assert_eq!(
            statement_due_date(period(2025, 1), 15, 15),
            date(2025, 2, 15)
        );
    }

    #[test]
    fn test_due_date_after_closing_day_stays_in_period_month() {
        assert_eq!(
            statement_due_date(period(2025, 1), 20, 15),
            date(2025, 1, 20)
        );
    }

    #[test]
    fn test_due_date_always_after_closing_date() {
        for closing_day in 1..=28 {
            for due_day in 1..=28 {
                for p in [period(2024, 2), period(2025, 2), period(2025, 12)] {
                    let close = statement_closing_date(p, closing_day);
                    let due = statement_due_date(p, due_day, closing_day);
                    assert!(
                        due > close,
                        "due {} not after close {} (period {}, due_day {}, closing_day {})",
                        due,
                        close,
                        p,
                        due_day,
                        closing_day
                    );
                }
            }
        }
    }

    #[test]
    fn test_closing_date_clamps_short_months() {
        // Closing day 30 in a 28-day February yields the 28th.
        assert_eq!(statement_closing_date(period(2025, 2), 30), date(2025, 2, 28));
        // Leap year: Feb 29 exists in 2024.
        assert_eq!(statement_closing_date(period(2024, 2), 30), date(2024, 2, 29));
        assert_eq!(statement_closing_date(period(2025, 4), 31), date(2025, 4, 30));
        assert_eq!(statement_closing_date(period(2025, 1), 15), date(2025, 1, 15));
    }

    #[test]
    fn test_window_start_is_day_after_previous_close() {
        assert_eq!(statement_window_start(period(2025, 2), 15), date(2025, 1, 16));
        // Previous period is a clamped February: window starts March 1.
        assert_eq!(statement_window_start(period(2025, 3), 28), date(2025, 3, 1));
        // Leap year: Feb 29 close rolls the window to March 1 only in 2024.
        assert_eq!(statement_window_start(period(2024, 3), 29), date(2024, 3, 1));
        assert_eq!(statement_window_start(period(2025, 3), 29), date(2025, 3, 1));
        // Year rollover.
        assert_eq!(statement_window_start(period(2025, 1), 20), date(2024, 12, 21));
    }

    #[test]
    fn test_shift_months_clamps_to_month_length() {
        assert_eq!(shift_months(date(2025, 1, 31), 1), date(2025, 2, 28));
        assert_eq!(shift_months(date(2024, 1, 31), 1), date(2024, 2, 29));
        assert_eq!(shift_months(date(2025, 1, 31), 3), date(2025, 4, 30));
        assert_eq!(shift_months(date(2025, 11, 15), 2), date(2026, 1, 15));
        assert_eq!(shift_months(date(2025, 3, 10), 0), date(2025, 3, 10));
    }
}
