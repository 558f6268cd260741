//! Calendar arithmetic used by the scheduling engine.
//!
//! Month steps are calendar months, not 30-day blocks. Adding months to a
//! day that does not exist in the target month clamps to that month's last
//! day (Jan 31 + 1 month = Feb 28/29). Periods are always computed from the
//! base date, so a clamp in one period never drifts into the next.

use chrono::{Months, NaiveDate};

use crate::model::round_cents;

/// `date + months` calendar months, clamped to the end of the month.
/// `None` only when the result leaves chrono's representable range.
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

/// `base * (1 + rate/100) ^ years`, rounded to cents.
pub fn indexed_cost(base: f64, rate_percent: f64, years: u32) -> f64 {
    let factor = (1.0 + rate_percent / 100.0).powi(years as i32);
    round_cents(base * factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_add_months_crosses_year() {
        assert_eq!(add_months(date(2024, 11, 15), 3), Some(date(2025, 2, 15)));
    }

    #[test]
    fn test_add_months_clamps_to_month_end() {
        assert_eq!(add_months(date(2024, 1, 31), 1), Some(date(2024, 2, 29)));
        assert_eq!(add_months(date(2023, 1, 31), 1), Some(date(2023, 2, 28)));
        // Computed from the base, not chained: the 31st comes back.
        assert_eq!(add_months(date(2024, 1, 31), 2), Some(date(2024, 3, 31)));
    }

    #[test]
    fn test_add_months_from_leap_day() {
        assert_eq!(add_months(date(2024, 2, 29), 12), Some(date(2025, 2, 28)));
        assert_eq!(add_months(date(2024, 2, 29), 48), Some(date(2028, 2, 29)));
    }

    #[test]
    fn test_add_months_out_of_range() {
        assert_eq!(add_months(NaiveDate::MAX, 1), None);
    }

    #[test]
    fn test_indexed_cost_compounds_per_year() {
        assert_eq!(indexed_cost(100.0, 10.0, 0), 100.0);
        assert_eq!(indexed_cost(100.0, 10.0, 1), 110.0);
        assert_eq!(indexed_cost(100.0, 10.0, 2), 121.0);
        assert_eq!(indexed_cost(100.0, 0.0, 5), 100.0);
        assert_eq!(indexed_cost(1234.56, 2.5, 3), 1329.49);
    }
}
