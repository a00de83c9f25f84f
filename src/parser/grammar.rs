//! Natural-language date/time grammar
//!
//! Finds the first date or time expression in a piece of text and resolves it against a
//! reference instant. Relative forms (today, tomorrow, next Friday, in 3 days) and absolute
//! forms (June 5, 5th of June 2026, 6/5, 2026-06-05, 3pm, 15:30, noon) are recognised.
//! A date and a time that sit next to each other ("tomorrow at 3pm", "3pm on Friday") are
//! merged into one match.
//!
//! Besides the resolved values the match records its byte span and whether the hour and
//! the meridiem were actually stated, which later stages need for defaulting and
//! disambiguation.

use crate::parser::occurrence::{add_months, days_until, last_day_of_month};
use crate::parser::types::weekday_from_name;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Weekday};
use log::debug;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

const WEEKDAYS: &str = "sunday|sun|monday|mon|tuesday|tues|tue|wednesday|wed|thursday|thurs|thur|thu|friday|fri|saturday|sat";
const MONTHS: &str = "january|jan|february|feb|march|mar|april|apr|may|june|jun|july|jul|august|aug|september|sept|sep|october|oct|november|nov|december|dec";
const NUMBER_WORDS: &str = "a|an|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve";

/// Errors raised for expressions that look like dates but cannot exist
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    #[error("Invalid calendar date: '{0}'")]
    InvalidDate(String),
    #[error("Date arithmetic out of range in '{0}'")]
    OutOfRange(String),
}

/// A stated time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTime {
    pub hour: u32,
    pub minute: u32,
    /// False when the hour could be either AM or PM ("at 5", "5:30")
    pub meridiem_certain: bool,
}

/// The first date/time expression found in a text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateMatch {
    /// Byte offsets of the matched expression
    pub start: usize,
    pub end: usize,
    pub text: String,
    /// Absent when only a time of day was stated
    pub date: Option<NaiveDate>,
    /// False for month-only forms such as "Dec 2026"
    pub day_certain: bool,
    pub time: Option<ClockTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece {
    Date { date: NaiveDate, day_certain: bool },
    Time(ClockTime),
    /// Exact instants such as "in 2 hours"
    Instant(NaiveDateTime),
}

#[derive(Debug, Clone, Copy)]
struct Component {
    start: usize,
    end: usize,
    piece: Piece,
}

impl Component {
    fn is_date(&self) -> bool {
        matches!(self.piece, Piece::Date { .. })
    }

    fn is_time(&self) -> bool {
        matches!(self.piece, Piece::Time(_))
    }
}

static RELATIVE_DAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(day\s+after\s+tomorrow|today|tonight|tomorrow|tmrw|yesterday)\b")
        .expect("relative day regex")
});

static OFFSET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\bin\s+(\d{{1,3}}|{NUMBER_WORDS})\s+(minute|min|hour|hr|day|week|month|year)s?\b"
    ))
    .expect("offset regex")
});

static NEXT_PERIOD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bnext\s+(week|month|year)\b").expect("next period regex"));

static WEEKDAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b(on\s+)?(?:(this|next|last)\s+)?({WEEKDAYS})\b\.?"))
        .expect("weekday regex")
});

static MONTH_DAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:on\s+)?({MONTHS})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(\d{{4}})\b)?"
    ))
    .expect("month day regex")
});

static DAY_MONTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:on\s+)?(?:the\s+)?(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?({MONTHS})\b\.?(?:,?\s+(\d{{4}})\b)?"
    ))
    .expect("day month regex")
});

static MONTH_YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b({MONTHS})\.?,?\s+(\d{{4}})\b")).expect("month year regex")
});

static NUMERIC_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:on\s+)?(\d{1,2})/(\d{1,2})(?:/(\d{4}|\d{2}))?\b").expect("numeric date regex")
});

static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("iso date regex"));

static MERIDIEM_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\bat\s+|@\s*)?\b(\d{1,2})(?::(\d{2}))?\s*([ap])\.?m\b\.?")
        .expect("meridiem time regex")
});

static CLOCK_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\bat\s+|@\s*)?\b(\d{1,2}):(\d{2})\b").expect("clock time regex")
});

static AT_HOUR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:\bat\s+|@\s*)(\d{1,2})\b").expect("at hour regex"));

static NAMED_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\bat\s+)?\b(noon|midday|midnight)\b").expect("named time regex")
});

/// Text allowed between a date and a time that belong together
static CONNECTOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[\s,]*(?:(?:at|on|@)[\s,]*)?$").expect("connector regex"));

pub(crate) fn number_word(word: &str) -> Option<i64> {
    let value = match word.to_lowercase().as_str() {
        "a" | "an" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        digits => return digits.parse().ok(),
    };
    Some(value)
}

fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    let month = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn parse_u32(caps: &Captures<'_>, group: usize) -> Option<u32> {
    caps.get(group).and_then(|m| m.as_str().parse().ok())
}

fn parse_year(caps: &Captures<'_>, group: usize) -> Option<i32> {
    let raw = caps.get(group)?.as_str();
    let year: i32 = raw.parse().ok()?;
    Some(if raw.len() == 2 { 2000 + year } else { year })
}

/// Resolve month/day with an optional year; a year-less date already behind us moves to
/// next year
fn resolve_month_day(
    today: NaiveDate,
    month: u32,
    day: u32,
    year: Option<i32>,
    source: &str,
) -> Result<NaiveDate, GrammarError> {
    let invalid = || GrammarError::InvalidDate(source.to_string());
    match year {
        Some(year) => NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid),
        None => {
            // Feb 29 is only checked against the year it lands in
            let this_year = NaiveDate::from_ymd_opt(today.year(), month, day);
            match this_year {
                Some(date) if date >= today => Ok(date),
                _ => (1..=4)
                    .find_map(|ahead| NaiveDate::from_ymd_opt(today.year() + ahead, month, day))
                    .ok_or_else(invalid),
            }
        }
    }
}

/// Days from `today` to "next <target>": the target's day in the following week, except
/// that targets already behind us this week (weeks start on Sunday) are simply ahead
fn days_until_next(today: Weekday, target: Weekday) -> i64 {
    let ahead = days_until(today, target);
    match (today, target) {
        (Weekday::Sun, _) if ahead == 0 => 7,
        (Weekday::Sun, _) => ahead,
        (Weekday::Sat, Weekday::Sat) => 7,
        (Weekday::Sat, Weekday::Sun) => 8,
        (Weekday::Sat, _) => ahead,
        _ if target.num_days_from_sunday() < today.num_days_from_sunday() => ahead,
        _ => ahead + 7,
    }
}

fn date_piece(date: NaiveDate) -> Piece {
    Piece::Date { date, day_certain: true }
}

fn collect_dates(
    text: &str,
    now: NaiveDateTime,
    out: &mut Vec<Component>,
) -> Result<(), GrammarError> {
    let today = now.date();
    let overflow = |s: &str| GrammarError::OutOfRange(s.to_string());

    for caps in RELATIVE_DAY_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let word = caps[1].to_lowercase();
        let offset = match word.as_str() {
            "today" | "tonight" => 0,
            "tomorrow" | "tmrw" => 1,
            "yesterday" => -1,
            _ => 2,
        };
        let date = today + Duration::days(offset);
        out.push(Component { start: whole.start(), end: whole.end(), piece: date_piece(date) });
    }

    for caps in OFFSET_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let Some(amount) = number_word(&caps[1]) else { continue };
        let unit = caps[2].to_lowercase();
        let piece = match unit.as_str() {
            "minute" | "min" => Piece::Instant(
                now.checked_add_signed(Duration::minutes(amount)).ok_or_else(|| overflow(whole.as_str()))?,
            ),
            "hour" | "hr" => Piece::Instant(
                now.checked_add_signed(Duration::hours(amount)).ok_or_else(|| overflow(whole.as_str()))?,
            ),
            "day" => date_piece(
                today.checked_add_signed(Duration::days(amount)).ok_or_else(|| overflow(whole.as_str()))?,
            ),
            "week" => date_piece(
                today.checked_add_signed(Duration::weeks(amount)).ok_or_else(|| overflow(whole.as_str()))?,
            ),
            "month" => date_piece(add_months(today, amount as u32).ok_or_else(|| overflow(whole.as_str()))?),
            _ => date_piece(
                add_months(today, (amount as u32).saturating_mul(12)).ok_or_else(|| overflow(whole.as_str()))?,
            ),
        };
        out.push(Component { start: whole.start(), end: whole.end(), piece });
    }

    for caps in NEXT_PERIOD_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let date = match caps[1].to_lowercase().as_str() {
            "week" => today + Duration::weeks(1),
            "month" => add_months(today, 1).ok_or_else(|| overflow(whole.as_str()))?,
            _ => add_months(today, 12).ok_or_else(|| overflow(whole.as_str()))?,
        };
        out.push(Component { start: whole.start(), end: whole.end(), piece: date_piece(date) });
    }

    for caps in WEEKDAY_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let name = &caps[3];
        let modifier = caps.get(2).map(|m| m.as_str().to_lowercase());
        // "sun", "sat", "wed" are ordinary words unless something marks them as days
        let abbreviated = !name.to_lowercase().ends_with("day");
        if abbreviated && modifier.is_none() && caps.get(1).is_none() {
            continue;
        }
        let Some(weekday) = weekday_from_name(name) else { continue };
        let ahead = days_until(today.weekday(), weekday);
        let date = match modifier.as_deref() {
            Some("next") => today + Duration::days(days_until_next(today.weekday(), weekday)),
            Some("last") => {
                let back = days_until(weekday, today.weekday());
                today - Duration::days(if back == 0 { 7 } else { back })
            }
            _ => today + Duration::days(ahead),
        };
        out.push(Component { start: whole.start(), end: whole.end(), piece: date_piece(date) });
    }

    for caps in MONTH_DAY_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let (Some(month), Some(day)) = (month_number(&caps[1]), parse_u32(&caps, 2)) else { continue };
        let date = resolve_month_day(today, month, day, parse_year(&caps, 3), whole.as_str())?;
        out.push(Component { start: whole.start(), end: whole.end(), piece: date_piece(date) });
    }

    for caps in DAY_MONTH_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let (Some(day), Some(month)) = (parse_u32(&caps, 1), month_number(&caps[2])) else { continue };
        let date = resolve_month_day(today, month, day, parse_year(&caps, 3), whole.as_str())?;
        out.push(Component { start: whole.start(), end: whole.end(), piece: date_piece(date) });
    }

    for caps in MONTH_YEAR_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let (Some(month), Some(year)) = (month_number(&caps[1]), parse_year(&caps, 2)) else { continue };
        let date = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| GrammarError::InvalidDate(whole.as_str().to_string()))?;
        out.push(Component {
            start: whole.start(),
            end: whole.end(),
            piece: Piece::Date { date, day_certain: false },
        });
    }

    for caps in NUMERIC_DATE_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let (Some(month), Some(day)) = (parse_u32(&caps, 1), parse_u32(&caps, 2)) else { continue };
        // Fractions and scores ("3/4 cup", "10/32") are not dates
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            continue;
        }
        let date = resolve_month_day(today, month, day, parse_year(&caps, 3), whole.as_str())?;
        out.push(Component { start: whole.start(), end: whole.end(), piece: date_piece(date) });
    }

    for caps in ISO_DATE_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let (Some(year), Some(month), Some(day)) = (parse_year(&caps, 1), parse_u32(&caps, 2), parse_u32(&caps, 3))
        else {
            continue;
        };
        let date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| GrammarError::InvalidDate(whole.as_str().to_string()))?;
        out.push(Component { start: whole.start(), end: whole.end(), piece: date_piece(date) });
    }

    Ok(())
}

fn collect_times(text: &str, out: &mut Vec<Component>) {
    for caps in MERIDIEM_TIME_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let (Some(hour), minute) = (parse_u32(&caps, 1), parse_u32(&caps, 2).unwrap_or(0)) else { continue };
        if !(1..=12).contains(&hour) || minute > 59 {
            continue;
        }
        let pm = caps[3].eq_ignore_ascii_case("p");
        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
        out.push(Component {
            start: whole.start(),
            end: whole.end(),
            piece: Piece::Time(ClockTime { hour, minute, meridiem_certain: true }),
        });
    }

    for caps in CLOCK_TIME_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let (Some(hour), Some(minute)) = (parse_u32(&caps, 1), parse_u32(&caps, 2)) else { continue };
        if hour > 23 || minute > 59 {
            continue;
        }
        out.push(Component {
            start: whole.start(),
            end: whole.end(),
            piece: Piece::Time(ClockTime { hour, minute, meridiem_certain: hour == 0 || hour > 12 }),
        });
    }

    for caps in AT_HOUR_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        // "at 5/12" and "at 5:30" belong to other forms
        if text[whole.end()..].starts_with(['/', ':', '.', '-']) {
            continue;
        }
        let Some(hour) = parse_u32(&caps, 1) else { continue };
        if hour > 23 {
            continue;
        }
        out.push(Component {
            start: whole.start(),
            end: whole.end(),
            piece: Piece::Time(ClockTime { hour, minute: 0, meridiem_certain: hour == 0 || hour > 12 }),
        });
    }

    for caps in NAMED_TIME_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let hour = if caps[1].eq_ignore_ascii_case("midnight") { 0 } else { 12 };
        out.push(Component {
            start: whole.start(),
            end: whole.end(),
            piece: Piece::Time(ClockTime { hour, minute: 0, meridiem_certain: true }),
        });
    }
}

/// Earliest-first, longest-first, without overlaps
fn select_components(mut components: Vec<Component>) -> Vec<Component> {
    components.sort_by(|a, b| a.start.cmp(&b.start).then((b.end - b.start).cmp(&(a.end - a.start))));
    let mut selected: Vec<Component> = Vec::with_capacity(components.len());
    for component in components {
        if selected.last().is_some_and(|last| component.start < last.end) {
            continue;
        }
        selected.push(component);
    }
    selected
}

fn is_connector(gap: &str) -> bool {
    CONNECTOR_RE.is_match(gap)
}

/// Find and resolve the first date/time expression in `text`
///
/// Returns `Ok(None)` when the text holds no recognisable expression.
pub fn parse(text: &str, now: NaiveDateTime) -> Result<Option<DateMatch>, GrammarError> {
    let mut components = Vec::new();
    collect_dates(text, now, &mut components)?;
    collect_times(text, &mut components);
    let components = select_components(components);

    let Some(first) = components.first().copied() else {
        return Ok(None);
    };

    let partner = components.get(1).copied().filter(|next| {
        let complementary = (first.is_date() && next.is_time()) || (first.is_time() && next.is_date());
        complementary && is_connector(&text[first.end..next.start])
    });

    let end = partner.map_or(first.end, |p| p.end);
    let mut found = DateMatch {
        start: first.start,
        end,
        text: text[first.start..end].to_string(),
        date: None,
        day_certain: true,
        time: None,
    };

    for component in std::iter::once(first).chain(partner) {
        match component.piece {
            Piece::Date { date, day_certain } => {
                found.date = Some(date);
                found.day_certain = day_certain;
            }
            Piece::Time(clock) => found.time = Some(clock),
            Piece::Instant(instant) => {
                found.date = Some(instant.date());
                found.time = Some(ClockTime {
                    hour: instant.hour(),
                    minute: instant.minute(),
                    meridiem_certain: true,
                });
            }
        }
    }

    debug!("Date grammar matched '{}' at {}..{}", found.text, found.start, found.end);
    Ok(Some(found))
}

/// Resolve the last day a month-only expression ("Dec 2026") can mean
pub fn end_of_stated_period(found: &DateMatch) -> Option<NaiveDate> {
    let date = found.date?;
    if found.day_certain {
        Some(date)
    } else {
        last_day_of_month(date.year(), date.month())
    }
}
