//! Working-day calendar.
//!
//! Sunday is the only non-working day; Saturday counts as a working day, so a
//! week has six working days. Deliveries happen only on working days and lead
//! times are expressed in working days.

use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Returns true unless `date` falls on a Sunday.
pub fn is_working_day(date: NaiveDate) -> bool {
    date.weekday() != Weekday::Sun
}

/// Step forward from `date` one calendar day at a time until `n` working days
/// have been counted, and return the date reached.
///
/// The starting day itself is never counted. For `n > 0` the result is always
/// a working day; `n == 0` returns `date` unchanged.
pub fn advance_working_days(date: NaiveDate, n: u32) -> NaiveDate {
    let mut current = date;
    let mut counted = 0;
    while counted < n {
        current = current + Days::new(1);
        if is_working_day(current) {
            counted += 1;
        }
    }
    current
}

/// Number of calendar days from `from` to `to` (negative if `to` is earlier).
pub fn calendar_days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    to.signed_duration_since(from).num_days()
}

/// Full English weekday name, as shown in day records.
pub fn weekday_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn only_sunday_is_off() {
        // 2024-01-01 is a Monday.
        let working: Vec<bool> = (1..=7).map(|day| is_working_day(d(2024, 1, day))).collect();
        assert_eq!(working, vec![true, true, true, true, true, true, false]);
    }

    #[test]
    fn advance_within_week() {
        assert_eq!(advance_working_days(d(2024, 1, 1), 3), d(2024, 1, 4));
    }

    #[test]
    fn advance_skips_sunday() {
        // Thu -> Fri, Sat, (Sun skipped), Mon
        assert_eq!(advance_working_days(d(2024, 1, 4), 3), d(2024, 1, 8));
        // Saturday + 1 lands on Monday
        assert_eq!(advance_working_days(d(2024, 1, 6), 1), d(2024, 1, 8));
        // starting on a Sunday
        assert_eq!(advance_working_days(d(2024, 1, 7), 1), d(2024, 1, 8));
    }

    #[test]
    fn advance_zero_is_identity() {
        assert_eq!(advance_working_days(d(2024, 1, 7), 0), d(2024, 1, 7));
    }

    #[test]
    fn names_and_gaps() {
        assert_eq!(weekday_name(d(2024, 1, 6)), "Saturday");
        assert_eq!(weekday_name(d(2024, 1, 7)), "Sunday");
        assert_eq!(calendar_days_between(d(2024, 1, 4), d(2024, 1, 8)), 4);
        assert_eq!(calendar_days_between(d(2024, 1, 8), d(2024, 1, 4)), -4);
    }

    proptest! {
        #[test]
        fn advanced_date_is_working_day(offset in 0u64..3650, n in 1u32..40) {
            let start = d(2020, 1, 1) + Days::new(offset);
            let end = advance_working_days(start, n);
            prop_assert!(is_working_day(end));
            prop_assert!(end > start);
        }

        #[test]
        fn advance_counts_exactly_n_working_days(offset in 0u64..3650, n in 0u32..40) {
            let start = d(2020, 1, 1) + Days::new(offset);
            let end = advance_working_days(start, n);
            let gap = calendar_days_between(start, end) as u64;
            let counted = (1..=gap)
                .filter(|i| is_working_day(start + Days::new(*i)))
                .count() as u32;
            prop_assert_eq!(counted, n);
            // never more than one Sunday skipped per six working days
            prop_assert!(gap <= u64::from(n) + u64::from(n) / 6 + 1);
        }
    }
}
