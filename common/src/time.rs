//! Date utilities for rate lookups.
//!
//! All calendar dates are UTC.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, Utc};

/// Number of days before the requested date that a lookup may fall back to.
pub const FALLBACK_DAYS: u64 = 3;

/// Today's date in UTC.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Candidate dates for a lookup on `date`: the date itself followed by the
/// [`FALLBACK_DAYS`] preceding calendar days, most recent first.
pub fn fallback_window(date: NaiveDate) -> Vec<NaiveDate> {
    (0..=FALLBACK_DAYS)
        .filter_map(|days| date.checked_sub_days(Days::new(days)))
        .collect()
}

/// Calendar date of a unix timestamp in seconds.
pub fn date_from_epoch(seconds: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(seconds, 0).map(|dt| dt.date_naive())
}

/// Calendar date of a naive date-time.
pub fn date_of(date_time: NaiveDateTime) -> NaiveDate {
    date_time.date()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_window_order() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let window = fallback_window(date);

        assert_eq!(
            window,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 9).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
            ]
        );
    }

    #[test]
    fn test_fallback_window_crosses_month() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let window = fallback_window(date);

        assert_eq!(window.len(), 4);
        assert_eq!(window[1], NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_date_from_epoch() {
        // 2024-01-10T12:00:00Z
        let date = date_from_epoch(1_704_888_000).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
    }
}
