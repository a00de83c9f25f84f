//! Natural-language reminder parser
//!
//! Turns free-form text such as "alternating Mondays until Dec 2026" into a title, the next
//! occurrence and a recurrence descriptor. Stages, in the order they are consulted:
//!
//! 1. [`recurrence::detect_recurrence`] recognises repeating patterns and computes the first
//!    occurrence itself where the pattern demands it.
//! 2. [`datetime::extract_day_of_month`] handles "on 20" / "the 15th".
//! 3. [`datetime::extract_date_time`] preprocesses the text and runs the date grammar.
//! 4. [`title::extract_title_with`] cleans the original text into a display title.
//!
//! Every stage is a pure function of its input and an explicit reference instant.

pub mod datetime;
pub mod grammar;
pub mod occurrence;
pub mod preprocess;
pub mod recurrence;
pub mod title;
pub mod types;

use chrono::{Local, NaiveDateTime};
use log::debug;
use std::ops::Range;

pub use datetime::{extract_date_time, extract_day_of_month, DateExtraction, MatchedSpan};
pub use grammar::GrammarError;
pub use preprocess::preprocess;
pub use recurrence::{detect_recurrence, Pattern};
pub use title::{extract_title, extract_title_with};
pub use types::{ParseResult, RecurrenceInfo, RecurrenceKind, SetPosition};

/// Tunable heuristics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Hour used when no time is stated and for self-computed occurrences
    pub default_hour: u32,
    /// Bare hours 1 through this value are read as PM; 0 turns the rule off
    pub assume_pm_through: u32,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self { default_hour: 8, assume_pm_through: 7 }
    }
}

/// Parse `text` relative to the local clock with default options
pub fn parse_reminder(text: &str) -> ParseResult {
    parse_reminder_at(text, Local::now().naive_local())
}

/// Parse `text` relative to `now`
pub fn parse_reminder_at(text: &str, now: NaiveDateTime) -> ParseResult {
    parse_reminder_with(text, now, &ParserOptions::default())
}

/// Parse `text` relative to `now` using `options`
pub fn parse_reminder_with(text: &str, now: NaiveDateTime, options: &ParserOptions) -> ParseResult {
    let recurrence = detect_recurrence(text, now, options);

    let (date, span) = match recurrence.calculated_date {
        Some(date) => (Some(date), None),
        None => match locate_date(text, now, options) {
            Some((date, span)) => (Some(date), span),
            None => (None, None),
        },
    };

    let title = extract_title_with(text, span);
    debug!("Parsed '{}' -> title '{}', date {:?}, recurrence {}", text, title, date, recurrence.kind);
    ParseResult { title, date, recurrence }
}

/// Date from the day-of-month shortcut or the generic extractor, with the span it came
/// from in `text`
fn locate_date(
    text: &str,
    now: NaiveDateTime,
    options: &ParserOptions,
) -> Option<(NaiveDateTime, Option<Range<usize>>)> {
    // An until clause names the end of a series, never its start. Blanking keeps offsets.
    let without_until = recurrence::blank_until_clause(text);

    if let Some(found) = extract_day_of_month(&without_until, now, options) {
        return Some((found.date, Some(found.matched.start..found.matched.end)));
    }

    let found = extract_date_time(&without_until, now, options)?;
    let span = found.matched.locate_in(text);
    Some((found.date, span))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Weekday};
    use pretty_assertions::assert_eq;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    // Monday 2025-06-02, 10:00
    fn monday() -> NaiveDateTime {
        at(2025, 6, 2, 10, 0)
    }

    #[test]
    fn test_recurrence_date_takes_priority() {
        let result = parse_reminder_at("Team standup every Friday at 9am tomorrow", monday());
        assert_eq!(result.recurrence.by_day, Some(Weekday::Fri));
        assert_eq!(result.date, Some(at(2025, 6, 6, 8, 0)));
    }

    #[test]
    fn test_keyword_recurrence_uses_generic_date() {
        let result = parse_reminder_at("weekly review on Thursday at 4pm", monday());
        assert_eq!(result.recurrence.kind, RecurrenceKind::Weekly);
        assert_eq!(result.date, Some(at(2025, 6, 5, 16, 0)));
        assert_eq!(result.title, "Review");
    }

    #[test]
    fn test_until_clause_is_not_a_start_date() {
        let result = parse_reminder_at("Yoga weekly until June 5", monday());
        assert_eq!(result.date, None);
        assert_eq!(result.title, "Yoga");
        assert_eq!(
            result.recurrence.until_date,
            Some(NaiveDate::from_ymd_opt(2025, 6, 5).unwrap().and_hms_opt(23, 59, 59).unwrap())
        );

        let result = parse_reminder_at("standup weekly until the 15th", monday());
        assert_eq!(result.date, None);
    }

    #[test]
    fn test_no_date_keeps_title() {
        let result = parse_reminder_at("buy milk", monday());
        assert_eq!(result, ParseResult { title: "Buy milk".into(), date: None, recurrence: RecurrenceInfo::none() });
    }

    #[test]
    fn test_options_are_applied() {
        let options = ParserOptions { default_hour: 9, assume_pm_through: 0 };
        let result = parse_reminder_with("call at 5 tomorrow", monday(), &options);
        assert_eq!(result.date, Some(at(2025, 6, 3, 5, 0)));
        let result = parse_reminder_with("call tomorrow", monday(), &options);
        assert_eq!(result.date, Some(at(2025, 6, 3, 9, 0)));
    }
}
