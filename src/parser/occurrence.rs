//! Calendar arithmetic for concrete occurrences
//!
//! Every function takes the reference "now" explicitly; nothing here reads the clock.

use crate::parser::types::SetPosition;
use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// Months scanned when looking for a month that contains a given day (Feb has no 30th,
/// but every day 1-31 appears at least once within a year)
const MONTH_SEARCH_LIMIT: u32 = 12;

/// Attach a whole hour to a date
pub fn at_hour(date: NaiveDate, hour: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN))
}

/// Days from `from` forward to the next `target`, in 0..=6
pub fn days_until(from: Weekday, target: Weekday) -> i64 {
    let from = i64::from(from.num_days_from_sunday());
    let target = i64::from(target.num_days_from_sunday());
    (target - from).rem_euclid(7)
}

/// Next occurrence of `weekday` strictly after today
pub fn next_weekday(now: NaiveDateTime, weekday: Weekday, hour: u32) -> NaiveDateTime {
    let today = now.date();
    let mut ahead = days_until(today.weekday(), weekday);
    if ahead == 0 {
        ahead = 7;
    }
    at_hour(today + Duration::days(ahead), hour)
}

/// First day of the month after `year`-`month`
fn first_of_next_month(year: i32, month: u32) -> Option<NaiveDate> {
    if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    first_of_next_month(year, month).and_then(|d| d.pred_opt())
}

/// The Nth (or last) `weekday` of the given month
///
/// The first occurrence is found from the weekday of the 1st; the Nth adds whole weeks.
/// The last occurrence walks back from the final day of the month.
pub fn nth_weekday_of_month(
    year: i32,
    month: u32,
    weekday: Weekday,
    position: SetPosition,
) -> Option<NaiveDate> {
    match position {
        SetPosition::Last => {
            let last = last_day_of_month(year, month)?;
            let back = days_until(weekday, last.weekday());
            last.checked_sub_signed(Duration::days(back))
        }
        _ => {
            let first = NaiveDate::from_ymd_opt(year, month, 1)?;
            let first_occurrence = 1 + days_until(first.weekday(), weekday) as u32;
            let weeks = (position.as_i8() as u32).saturating_sub(1);
            NaiveDate::from_ymd_opt(year, month, first_occurrence + weeks * 7)
        }
    }
}

/// Next Nth/last `weekday` of a month, moving to next month when this month's is today
/// or already past
pub fn next_nth_weekday(
    now: NaiveDateTime,
    weekday: Weekday,
    position: SetPosition,
    hour: u32,
) -> Option<NaiveDateTime> {
    let today = now.date();
    let mut candidate = nth_weekday_of_month(today.year(), today.month(), weekday, position)?;
    if candidate <= today {
        let next = first_of_next_month(today.year(), today.month())?;
        candidate = nth_weekday_of_month(next.year(), next.month(), weekday, position)?;
    }
    Some(at_hour(candidate, hour))
}

/// First date strictly after `after` whose day-of-month is `day`
///
/// Months too short for `day` are skipped rather than overflowing into the next month.
pub fn next_month_day(after: NaiveDate, day: u32) -> Option<NaiveDate> {
    if !(1..=31).contains(&day) {
        return None;
    }
    let mut year = after.year();
    let mut month = after.month();
    for _ in 0..=MONTH_SEARCH_LIMIT {
        if let Some(candidate) = NaiveDate::from_ymd_opt(year, month, day) {
            if candidate > after {
                return Some(candidate);
            }
        }
        let next = first_of_next_month(year, month)?;
        year = next.year();
        month = next.month();
    }
    None
}

/// Tomorrow at the given hour
pub fn tomorrow_at(now: NaiveDateTime, hour: u32) -> NaiveDateTime {
    at_hour(now.date() + Duration::days(1), hour)
}

/// Add calendar months, clamping to the end of shorter months
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        ymd(y, m, d).and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn test_next_weekday_never_today() {
        // 2025-06-02 is a Monday
        let now = at(2025, 6, 2, 6, 0);
        assert_eq!(next_weekday(now, Weekday::Mon, 8), at(2025, 6, 9, 8, 0));
        assert_eq!(next_weekday(now, Weekday::Tue, 8), at(2025, 6, 3, 8, 0));
        assert_eq!(next_weekday(now, Weekday::Sun, 8), at(2025, 6, 8, 8, 0));
    }

    #[test]
    fn test_last_weekday_when_month_ends_on_it() {
        // May 2025 ends on Saturday the 31st
        assert_eq!(nth_weekday_of_month(2025, 5, Weekday::Sat, SetPosition::Last), Some(ymd(2025, 5, 31)));
        // ...and its last Friday is the day before
        assert_eq!(nth_weekday_of_month(2025, 5, Weekday::Fri, SetPosition::Last), Some(ymd(2025, 5, 30)));
        // ...and its last Sunday is the 25th
        assert_eq!(nth_weekday_of_month(2025, 5, Weekday::Sun, SetPosition::Last), Some(ymd(2025, 5, 25)));
    }

    #[test]
    fn test_last_weekday_in_february() {
        // Feb 2024 (leap) ends on Thursday the 29th
        assert_eq!(nth_weekday_of_month(2024, 2, Weekday::Thu, SetPosition::Last), Some(ymd(2024, 2, 29)));
        assert_eq!(nth_weekday_of_month(2024, 2, Weekday::Sat, SetPosition::Last), Some(ymd(2024, 2, 24)));
    }

    #[test]
    fn test_nth_weekday() {
        // June 2025 starts on a Sunday
        assert_eq!(nth_weekday_of_month(2025, 6, Weekday::Sun, SetPosition::First), Some(ymd(2025, 6, 1)));
        assert_eq!(nth_weekday_of_month(2025, 6, Weekday::Sat, SetPosition::First), Some(ymd(2025, 6, 7)));
        assert_eq!(nth_weekday_of_month(2025, 6, Weekday::Tue, SetPosition::Second), Some(ymd(2025, 6, 10)));
        assert_eq!(nth_weekday_of_month(2025, 6, Weekday::Thu, SetPosition::Third), Some(ymd(2025, 6, 19)));
        assert_eq!(nth_weekday_of_month(2025, 6, Weekday::Sat, SetPosition::Fourth), Some(ymd(2025, 6, 28)));
    }

    #[test]
    fn test_next_nth_weekday_rolls_over() {
        // Last Saturday of June 2025 is the 28th
        let before = at(2025, 6, 15, 12, 0);
        assert_eq!(next_nth_weekday(before, Weekday::Sat, SetPosition::Last, 8), Some(at(2025, 6, 28, 8, 0)));

        // On the day itself, move to July (last Saturday is the 26th)
        let same_day = at(2025, 6, 28, 7, 0);
        assert_eq!(next_nth_weekday(same_day, Weekday::Sat, SetPosition::Last, 8), Some(at(2025, 7, 26, 8, 0)));

        // December rolls into January of the next year
        let december = at(2025, 12, 20, 9, 0);
        assert_eq!(next_nth_weekday(december, Weekday::Mon, SetPosition::First, 8), Some(at(2026, 1, 5, 8, 0)));
    }

    #[test]
    fn test_next_month_day() {
        assert_eq!(next_month_day(ymd(2025, 6, 15), 20), Some(ymd(2025, 6, 20)));
        assert_eq!(next_month_day(ymd(2025, 6, 20), 20), Some(ymd(2025, 7, 20)));
        assert_eq!(next_month_day(ymd(2025, 6, 15), 1), Some(ymd(2025, 7, 1)));
        assert_eq!(next_month_day(ymd(2025, 12, 31), 15), Some(ymd(2026, 1, 15)));
        // June has no 31st
        assert_eq!(next_month_day(ymd(2025, 6, 15), 31), Some(ymd(2025, 7, 31)));
        assert_eq!(next_month_day(ymd(2025, 6, 15), 0), None);
        assert_eq!(next_month_day(ymd(2025, 6, 15), 32), None);
    }

    #[test]
    fn test_helpers() {
        let now = at(2025, 12, 31, 22, 15);
        let tomorrow = tomorrow_at(now, 8);
        assert_eq!(tomorrow, at(2026, 1, 1, 8, 0));
        assert_eq!(tomorrow.minute(), 0);
        assert_eq!(add_months(ymd(2025, 1, 31), 1), Some(ymd(2025, 2, 28)));
        assert_eq!(days_until(Weekday::Sat, Weekday::Mon), 2);
    }
}
