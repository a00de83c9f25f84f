//! Generic date/time extraction
//!
//! Runs the preprocessed text through the date grammar and turns its match into a concrete
//! local date-time: a missing time becomes the default hour, and a bare small hour is read
//! as PM (reminders are rarely set for 1am-7am). The PM rule is a heuristic and is tunable
//! through [`ParserOptions::assume_pm_through`].

use crate::parser::grammar::{self, ClockTime, DateMatch};
use crate::parser::occurrence::{at_hour, next_month_day};
use crate::parser::preprocess::preprocess;
use crate::parser::ParserOptions;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

/// "on 20", "on the 15th", "the 1st"
static DAY_OF_MONTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\bon\s+(?:the\s+)?|\bthe\s+)(\d{1,2})(?:st|nd|rd|th)?\b").expect("day of month regex")
});

/// Words after a day number that show it is not a day of the current month
static NOT_A_MONTH_DAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:of\b|jan|feb|mar|apr|may\b|jun|jul|aug|sep|oct|nov|dec|minutes?\b|mins?\b|hours?\b|hrs?\b|days?\b|weeks?\b|months?\b|years?\b|[ap]\.?m\b)",
    )
    .expect("not a month day regex")
});

static CONNECTOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[\s,]*(?:(?:at|@)[\s,]*)?$").expect("connector regex"));

/// Text that supplied a date, located in the text it was found in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedSpan {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl MatchedSpan {
    fn new(source: &str, range: Range<usize>) -> Self {
        Self { start: range.start, end: range.end, text: source[range.clone()].to_string() }
    }

    /// Byte range of this span inside `original`
    ///
    /// The offsets are used as-is when they still point at the same text; otherwise the
    /// first case-insensitive occurrence of the matched text is used.
    pub fn locate_in(&self, original: &str) -> Option<Range<usize>> {
        if original.get(self.start..self.end) == Some(self.text.as_str()) {
            return Some(self.start..self.end);
        }
        if self.text.is_empty() {
            return None;
        }
        let pattern = format!("(?i){}", regex::escape(&self.text));
        let re = Regex::new(&pattern).ok()?;
        re.find(original).map(|m| m.range())
    }
}

/// A resolved date and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateExtraction {
    pub date: NaiveDateTime,
    pub matched: MatchedSpan,
}

/// Apply the PM heuristic to a stated hour
///
/// Only hours 1 to 11 are ever shifted, whatever `assume_pm_through` says.
pub fn disambiguate_hour(clock: ClockTime, options: &ParserOptions) -> NaiveTime {
    let mut hour = clock.hour;
    if !clock.meridiem_certain && (1..=options.assume_pm_through.min(11)).contains(&hour) {
        debug!("Reading bare hour {} as {}:00", hour, hour + 12);
        hour += 12;
    }
    NaiveTime::from_hms_opt(hour, clock.minute, 0).unwrap_or(NaiveTime::MIN)
}

/// Turn a grammar match into a concrete date-time
pub fn resolve_match(found: &DateMatch, now: NaiveDateTime, options: &ParserOptions) -> NaiveDateTime {
    let time = match found.time {
        Some(clock) => disambiguate_hour(clock, options),
        None => NaiveTime::from_hms_opt(options.default_hour, 0, 0).unwrap_or(NaiveTime::MIN),
    };

    match found.date {
        Some(date) => date.and_time(time),
        None => {
            // A time on its own means the next time the clock shows it
            let today = now.date().and_time(time);
            if today <= now {
                today + Duration::days(1)
            } else {
                today
            }
        }
    }
}

/// Extract the first date/time expression from `text`
///
/// Grammar failures are treated as "no date".
pub fn extract_date_time(text: &str, now: NaiveDateTime, options: &ParserOptions) -> Option<DateExtraction> {
    let processed = preprocess(text);
    let found = match grammar::parse(&processed, now) {
        Ok(Some(found)) => found,
        Ok(None) => {
            debug!("No date expression in '{}'", processed);
            return None;
        }
        Err(e) => {
            warn!("Ignoring unparseable date expression in '{}': {}", processed, e);
            return None;
        }
    };

    let date = resolve_match(&found, now, options);
    debug!("Resolved '{}' to {}", found.text, date);
    Some(DateExtraction { date, matched: MatchedSpan::new(&processed, found.start..found.end) })
}

/// Find an explicit day-of-month reference ("on 20", "the 15th")
pub fn find_day_of_month(text: &str) -> Option<(u32, Range<usize>)> {
    for caps in DAY_OF_MONTH_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let rest = &text[whole.end()..];
        // "on 12/5", "on 5:30", "the 5th of June", "the 2 weeks"
        if rest.starts_with(['/', ':', '-']) || rest.starts_with(".0") || NOT_A_MONTH_DAY_RE.is_match(rest) {
            continue;
        }
        let Ok(day) = caps[1].parse::<u32>() else { continue };
        if (1..=31).contains(&day) {
            return Some((day, whole.range()));
        }
    }
    None
}

/// Nearest future date with the given day of month, at `hour`
pub fn next_date_for_day(now: NaiveDateTime, day: u32, hour: u32) -> Option<NaiveDateTime> {
    let today = now.date();
    if let Some(candidate) = NaiveDate::from_ymd_opt(today.year(), today.month(), day) {
        let candidate = at_hour(candidate, hour);
        if candidate > now {
            return Some(candidate);
        }
    }
    next_month_day(today, day).map(|date| at_hour(date, hour))
}

/// Day-of-month shortcut, tried before the generic grammar
///
/// A time stated right after the day ("on the 1st at 9am") is kept; otherwise the default
/// hour applies.
pub fn extract_day_of_month(text: &str, now: NaiveDateTime, options: &ParserOptions) -> Option<DateExtraction> {
    let (day, range) = find_day_of_month(text)?;
    let mut date = next_date_for_day(now, day, options.default_hour)?;
    let mut end = range.end;

    let rest = &text[range.end..];
    if let Ok(Some(found)) = grammar::parse(rest, now) {
        let adjacent = CONNECTOR_RE.is_match(&rest[..found.start]);
        if adjacent && found.date.is_none() {
            if let Some(clock) = found.time {
                date = date.date().and_time(disambiguate_hour(clock, options));
                end = range.end + found.end;
            }
        }
    }

    debug!("Day-of-month shortcut picked day {} -> {}", day, date);
    Some(DateExtraction { date, matched: MatchedSpan::new(text, range.start..end) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use test_case::test_case;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    // Monday 2025-06-02, 10:00
    fn monday() -> NaiveDateTime {
        at(2025, 6, 2, 10, 0)
    }

    #[test_case(1, 13 ; "one becomes pm")]
    #[test_case(7, 19 ; "seven becomes pm")]
    #[test_case(8, 8 ; "eight stays am")]
    #[test_case(11, 11 ; "eleven stays am")]
    #[test_case(12, 12 ; "noon unchanged")]
    #[test_case(0, 0 ; "midnight unchanged")]
    fn test_disambiguate_hour(hour: u32, expected: u32) {
        let clock = ClockTime { hour, minute: 0, meridiem_certain: false };
        assert_eq!(disambiguate_hour(clock, &ParserOptions::default()).hour(), expected);
    }

    #[test]
    fn test_explicit_meridiem_is_kept() {
        let clock = ClockTime { hour: 5, minute: 15, meridiem_certain: true };
        assert_eq!(disambiguate_hour(clock, &ParserOptions::default()), NaiveTime::from_hms_opt(5, 15, 0).unwrap());
    }

    #[test]
    fn test_heuristic_can_be_disabled() {
        let options = ParserOptions { assume_pm_through: 0, ..ParserOptions::default() };
        let clock = ClockTime { hour: 5, minute: 0, meridiem_certain: false };
        assert_eq!(disambiguate_hour(clock, &options).hour(), 5);
    }

    #[test_case(12, 30, 12 ; "noon is never shifted")]
    #[test_case(11, 0, 23 ; "eleven shifts under a wide limit")]
    #[test_case(0, 15, 0 ; "midnight is never shifted")]
    fn test_wide_pm_limit_is_clamped(hour: u32, minute: u32, expected: u32) {
        let options = ParserOptions { assume_pm_through: 23, ..ParserOptions::default() };
        let clock = ClockTime { hour, minute, meridiem_certain: false };
        assert_eq!(disambiguate_hour(clock, &options), NaiveTime::from_hms_opt(expected, minute, 0).unwrap());
    }

    #[test]
    fn test_boundary_hours_from_text() {
        let options = ParserOptions::default();
        let seven = extract_date_time("dinner tomorrow at 7", monday(), &options).unwrap();
        assert_eq!(seven.date, at(2025, 6, 3, 19, 0));
        let eight = extract_date_time("gym tomorrow at 8", monday(), &options).unwrap();
        assert_eq!(eight.date, at(2025, 6, 3, 8, 0));
    }

    #[test]
    fn test_default_hour_when_no_time() {
        let found = extract_date_time("dentist on Friday", monday(), &ParserOptions::default()).unwrap();
        assert_eq!(found.date, at(2025, 6, 6, 8, 0));
        assert_eq!(found.matched.text, "on Friday");
    }

    #[test]
    fn test_tonight_uses_default_hour() {
        let found = extract_date_time("movie tonight", monday(), &ParserOptions::default()).unwrap();
        assert_eq!(found.date, at(2025, 6, 2, 8, 0));
        let found = extract_date_time("movie tonight at 9pm", monday(), &ParserOptions::default()).unwrap();
        assert_eq!(found.date, at(2025, 6, 2, 21, 0));
    }

    #[test]
    fn test_time_only_rolls_forward() {
        let options = ParserOptions::default();
        // 9am has passed at 10:00, so tomorrow
        let found = extract_date_time("standup at 9am", monday(), &options).unwrap();
        assert_eq!(found.date, at(2025, 6, 3, 9, 0));
        // 5 reads as 17:00, still ahead today
        let found = extract_date_time("call at 5", monday(), &options).unwrap();
        assert_eq!(found.date, at(2025, 6, 2, 17, 0));
    }

    #[test]
    fn test_negation_removed_before_grammar() {
        let found =
            extract_date_time("not today, but tomorrow, check in with Raj", monday(), &ParserOptions::default())
                .unwrap();
        assert_eq!(found.date, at(2025, 6, 3, 8, 0));
        assert_eq!(found.matched.text, "tomorrow");
    }

    #[test]
    fn test_malformed_time_normalized() {
        let found = extract_date_time("call tomorrow 7:PM", monday(), &ParserOptions::default()).unwrap();
        assert_eq!(found.date, at(2025, 6, 3, 19, 0));
    }

    #[test]
    fn test_grammar_errors_mean_no_date() {
        assert_eq!(extract_date_time("party February 30, 2026", monday(), &ParserOptions::default()), None);
        assert_eq!(extract_date_time("water the plants", monday(), &ParserOptions::default()), None);
    }

    #[test]
    fn test_locate_in_original() {
        let span = MatchedSpan { start: 0, end: 8, text: "tomorrow".to_string() };
        assert_eq!(span.locate_in("not today, but Tomorrow call"), Some(15..23));
        assert_eq!(span.locate_in("tomorrow call"), Some(0..8));
        assert_eq!(span.locate_in("call later"), None);
    }

    #[test_case("Pay rent on 1st", 1 ; "on ordinal")]
    #[test_case("Pay rent on the 20th", 20 ; "on the ordinal")]
    #[test_case("bills on 20", 20 ; "on bare number")]
    #[test_case("the 15th payroll", 15 ; "the ordinal")]
    fn test_find_day_of_month(text: &str, expected: u32) {
        assert_eq!(find_day_of_month(text).map(|(day, _)| day), Some(expected));
    }

    #[test_case("party on the 5th of June" ; "month follows")]
    #[test_case("due on 12/5" ; "numeric date")]
    #[test_case("call on 5:30" ; "clock time")]
    #[test_case("the 2 weeks off" ; "unit follows")]
    #[test_case("on 45" ; "out of range")]
    #[test_case("on 3pm" ; "time with meridiem")]
    fn test_day_of_month_rejected(text: &str) {
        assert_eq!(find_day_of_month(text), None);
    }

    #[test]
    fn test_day_of_month_shortcut() {
        let options = ParserOptions::default();
        // Mid-month: the 1st is next month
        let mid = at(2025, 6, 15, 12, 0);
        let found = extract_day_of_month("Pay rent on 1st", mid, &options).unwrap();
        assert_eq!(found.date, at(2025, 7, 1, 8, 0));
        assert_eq!(found.matched.text, "on 1st");

        // Still ahead this month
        let found = extract_day_of_month("bills on the 20th", mid, &options).unwrap();
        assert_eq!(found.date, at(2025, 6, 20, 8, 0));

        // Stated time after the day is kept
        let found = extract_day_of_month("rent on the 1st at 9am", mid, &options).unwrap();
        assert_eq!(found.date, at(2025, 7, 1, 9, 0));
        assert_eq!(found.matched.text, "on the 1st at 9am");

        // December rolls into January
        let december = at(2025, 12, 20, 9, 0);
        let found = extract_day_of_month("bills on the 5th", december, &options).unwrap();
        assert_eq!(found.date, at(2026, 1, 5, 8, 0));
    }

    #[test]
    fn test_short_months_are_skipped() {
        let found = next_date_for_day(at(2025, 6, 15, 12, 0), 31, 8).unwrap();
        assert_eq!(found, at(2025, 7, 31, 8, 0));
    }
}
