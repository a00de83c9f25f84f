//! Recurrence detection
//!
//! Patterns are evaluated in a fixed order and the first one whose handler accepts the text
//! wins. The order runs from the narrowest phrasing to the broadest: "every other Monday"
//! must be seen before "every Monday", and both before a bare "weekly". [`Pattern::ORDER`]
//! is that order.
//!
//! Some patterns also compute the first occurrence themselves (ordinal weekdays of a month,
//! day-of-month series) because the generic date grammar has no notion of them.

use crate::parser::datetime::disambiguate_hour;
use crate::parser::grammar::{self, end_of_stated_period, number_word};
use crate::parser::occurrence::{at_hour, next_month_day, next_nth_weekday, next_weekday, tomorrow_at};
use crate::parser::types::{weekday_from_name, RecurrenceInfo, RecurrenceKind, SetPosition};
use crate::parser::ParserOptions;
use chrono::{NaiveDateTime, NaiveTime};
use log::debug;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::ops::Range;

const WEEKDAYS: &str = "sunday|sun|monday|mon|tuesday|tues|tue|wednesday|wed|thursday|thurs|thur|thu|friday|fri|saturday|sat";

/// Time stamped on an until date that names only a day, so the whole day is included
const UNTIL_END_OF_DAY: (u32, u32, u32) = (23, 59, 59);

/// Recognised recurrence phrasings, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// birthday, bday, b-day, anniversary
    Occasion,
    /// every Friday
    EveryWeekday,
    /// alternating Mondays, every other Monday, every 2 weeks on Monday
    AlternatingWeekday,
    /// last Saturday of the month, second Tuesday of every month
    WeekdayOfMonth,
    /// day 20 of the month, 15th of every month, every month on the 1st
    DayOfMonth,
    /// every 3 days, every other week, biweekly
    Interval,
    /// every year, yearly, annual(ly)
    Yearly,
    /// every month, monthly
    Monthly,
    /// every week, weekly
    Weekly,
    /// every day, everyday, daily
    Daily,
}

impl Pattern {
    pub const ORDER: [Pattern; 10] = [
        Pattern::Occasion,
        Pattern::EveryWeekday,
        Pattern::AlternatingWeekday,
        Pattern::WeekdayOfMonth,
        Pattern::DayOfMonth,
        Pattern::Interval,
        Pattern::Yearly,
        Pattern::Monthly,
        Pattern::Weekly,
        Pattern::Daily,
    ];

    fn regex_source(&self) -> String {
        match self {
            Pattern::Occasion => r"(?i)\b(?:birthday|bday|b-day|anniversary|anniversaries)\b".to_string(),
            Pattern::EveryWeekday => format!(r"(?i)\bevery\s+({WEEKDAYS})s?\b\.?"),
            Pattern::AlternatingWeekday => format!(
                r"(?i)\b(?:alternating|every\s+other|every\s+(?:2|two)\s+weeks?(?:\s+on)?)\s+({WEEKDAYS})s?\b\.?"
            ),
            Pattern::WeekdayOfMonth => format!(
                r"(?i)\b(last|first|second|third|fourth|1st|2nd|3rd|4th)\s+({WEEKDAYS})s?\s+of\s+(?:the\s+|each\s+|every\s+)?month\b"
            ),
            Pattern::DayOfMonth => concat!(
                r"(?i)\bday\s+(\d{1,2})\s+of\s+(?:the\s+|each\s+|every\s+)?month\b",
                r"|\b(?:on\s+)?(?:the\s+)?(\d{1,2})(?:st|nd|rd|th)?\s+of\s+(?:every|each)\s+month\b",
                r"|\bevery\s+month\s+on\s+(?:the\s+)?(\d{1,2})(?:st|nd|rd|th)?\b",
            )
            .to_string(),
            Pattern::Interval => concat!(
                r"(?i)\bevery\s+(\d{1,2}|other|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve)\s+(day|week|month|year)s?\b",
                r"|\bbi-?weekly\b|\bfortnightly\b",
            )
            .to_string(),
            Pattern::Yearly => r"(?i)\b(?:every\s+year|each\s+year|yearly|annual|annually)\b".to_string(),
            Pattern::Monthly => r"(?i)\b(?:every\s+month|each\s+month|monthly)\b".to_string(),
            Pattern::Weekly => r"(?i)\b(?:every\s+week|each\s+week|weekly)\b".to_string(),
            Pattern::Daily => r"(?i)\b(?:every\s*day|each\s+day|daily)\b".to_string(),
        }
    }

    fn handler(&self) -> Handler {
        match self {
            Pattern::Occasion => occasion,
            Pattern::EveryWeekday => every_weekday,
            Pattern::AlternatingWeekday => alternating_weekday,
            Pattern::WeekdayOfMonth => weekday_of_month,
            Pattern::DayOfMonth => day_of_month,
            Pattern::Interval => interval,
            Pattern::Yearly => yearly,
            Pattern::Monthly => monthly,
            Pattern::Weekly => weekly,
            Pattern::Daily => daily,
        }
    }

    /// Whether the phrase only carries scheduling and can be dropped from a title
    pub fn is_schedule_phrase(&self) -> bool {
        !matches!(self, Pattern::Occasion)
    }
}

/// Inputs shared by every handler
struct Context<'a> {
    text: &'a str,
    now: NaiveDateTime,
    options: &'a ParserOptions,
}

/// Builds the descriptor for a matched pattern, or declines so the cascade moves on
type Handler = fn(&Captures<'_>, &Context<'_>) -> Option<RecurrenceInfo>;

struct Rule {
    pattern: Pattern,
    regex: Regex,
    handler: Handler,
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    Pattern::ORDER
        .iter()
        .map(|&pattern| Rule {
            pattern,
            regex: Regex::new(&pattern.regex_source()).expect("recurrence pattern regex"),
            handler: pattern.handler(),
        })
        .collect()
});

static BIRTHDAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:birthday|bday|b-day)\b").expect("birthday regex"));

static ANNIVERSARY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:anniversary|anniversaries)\b").expect("anniversary regex"));

// A comma ends the clause unless a year follows it, as in "June 30, 2026"
static UNTIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\buntil\s+(.+?(?:,\s*\d{4}\b)?)(?:\s*$|,|\.|;)").expect("until regex"));

static ON_WEEKDAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\bon\s+({WEEKDAYS})s?\b")).expect("on weekday regex")
});

fn occasion(_: &Captures<'_>, ctx: &Context<'_>) -> Option<RecurrenceInfo> {
    Some(RecurrenceInfo::occasion(BIRTHDAY_RE.is_match(ctx.text), ANNIVERSARY_RE.is_match(ctx.text)))
}

fn weekly_on(caps: &Captures<'_>, ctx: &Context<'_>, interval: Option<u32>) -> Option<RecurrenceInfo> {
    let weekday = weekday_from_name(&caps[1])?;
    Some(RecurrenceInfo {
        interval,
        by_day: Some(weekday),
        calculated_date: Some(next_weekday(ctx.now, weekday, ctx.options.default_hour)),
        ..RecurrenceInfo::repeating(RecurrenceKind::Weekly)
    })
}

fn every_weekday(caps: &Captures<'_>, ctx: &Context<'_>) -> Option<RecurrenceInfo> {
    weekly_on(caps, ctx, None)
}

// TODO: anchor biweekly series to the creation date once callers persist an anchor;
// today the first occurrence is simply the next matching weekday.
fn alternating_weekday(caps: &Captures<'_>, ctx: &Context<'_>) -> Option<RecurrenceInfo> {
    weekly_on(caps, ctx, Some(2))
}

fn weekday_of_month(caps: &Captures<'_>, ctx: &Context<'_>) -> Option<RecurrenceInfo> {
    let position = SetPosition::from_word(&caps[1])?;
    let weekday = weekday_from_name(&caps[2])?;
    Some(RecurrenceInfo {
        by_day: Some(weekday),
        by_set_pos: Some(position),
        calculated_date: next_nth_weekday(ctx.now, weekday, position, ctx.options.default_hour),
        ..RecurrenceInfo::repeating(RecurrenceKind::Monthly)
    })
}

fn day_of_month(caps: &Captures<'_>, ctx: &Context<'_>) -> Option<RecurrenceInfo> {
    let day: u32 = (1..=3).find_map(|group| caps.get(group))?.as_str().parse().ok()?;
    if !(1..=31).contains(&day) {
        debug!("Ignoring out-of-range day of month {}", day);
        return None;
    }
    let first = next_month_day(ctx.now.date(), day)?;
    Some(RecurrenceInfo {
        by_month_day: Some(day),
        calculated_date: Some(at_hour(first, ctx.options.default_hour)),
        ..RecurrenceInfo::repeating(RecurrenceKind::Monthly)
    })
}

fn interval(caps: &Captures<'_>, ctx: &Context<'_>) -> Option<RecurrenceInfo> {
    let (count, unit) = match (caps.get(1), caps.get(2)) {
        (Some(count), Some(unit)) => {
            let count = match count.as_str().to_lowercase().as_str() {
                "other" => 2,
                word => number_word(word)?,
            };
            (count, unit.as_str().to_lowercase())
        }
        // biweekly / fortnightly
        _ => (2, "week".to_string()),
    };
    if count < 1 {
        return None;
    }
    let kind = match unit.as_str() {
        "day" => RecurrenceKind::Daily,
        "week" => RecurrenceKind::Weekly,
        "month" => RecurrenceKind::Monthly,
        _ => RecurrenceKind::Yearly,
    };
    let mut info = RecurrenceInfo {
        interval: (count > 1).then_some(count as u32),
        ..RecurrenceInfo::repeating(kind)
    };

    match kind {
        RecurrenceKind::Daily => {
            info.calculated_date = Some(tomorrow_at(ctx.now, ctx.options.default_hour));
        }
        RecurrenceKind::Weekly => {
            // "every 3 weeks on Thursday"
            if let Some(weekday) = ON_WEEKDAY_RE.captures(ctx.text).and_then(|c| weekday_from_name(&c[1])) {
                info.by_day = Some(weekday);
                info.calculated_date = Some(next_weekday(ctx.now, weekday, ctx.options.default_hour));
            }
        }
        _ => {}
    }
    Some(info)
}

fn yearly(_: &Captures<'_>, _: &Context<'_>) -> Option<RecurrenceInfo> {
    Some(RecurrenceInfo::repeating(RecurrenceKind::Yearly))
}

fn monthly(_: &Captures<'_>, _: &Context<'_>) -> Option<RecurrenceInfo> {
    Some(RecurrenceInfo::repeating(RecurrenceKind::Monthly))
}

fn weekly(_: &Captures<'_>, _: &Context<'_>) -> Option<RecurrenceInfo> {
    Some(RecurrenceInfo::repeating(RecurrenceKind::Weekly))
}

fn daily(_: &Captures<'_>, ctx: &Context<'_>) -> Option<RecurrenceInfo> {
    Some(RecurrenceInfo {
        calculated_date: Some(tomorrow_at(ctx.now, ctx.options.default_hour)),
        ..RecurrenceInfo::repeating(RecurrenceKind::Daily)
    })
}

/// Byte range of an "until ..." clause, including its terminator
pub fn until_clause(text: &str) -> Option<Range<usize>> {
    UNTIL_RE.find(text).map(|m| m.range())
}

/// Replace the until clause with spaces so it cannot be read as a start date; offsets of
/// the rest of the text are preserved
pub fn blank_until_clause(text: &str) -> String {
    match until_clause(text) {
        Some(range) => {
            let mut blanked = String::with_capacity(text.len());
            blanked.push_str(&text[..range.start]);
            blanked.extend(std::iter::repeat(' ').take(range.end - range.start));
            blanked.push_str(&text[range.end..]);
            blanked
        }
        None => text.to_string(),
    }
}

/// Parse the date named by an "until ..." clause
///
/// A bare day ends at 23:59:59 and a bare month ("Dec 2026") at the end of its last day.
/// Clauses the grammar cannot read leave the series open.
pub fn parse_until_date(text: &str, now: NaiveDateTime, options: &ParserOptions) -> Option<NaiveDateTime> {
    let caps = UNTIL_RE.captures(text)?;
    let clause = caps.get(1)?.as_str();
    let found = match grammar::parse(clause, now) {
        Ok(Some(found)) => found,
        Ok(None) => {
            debug!("Until clause '{}' holds no date", clause);
            return None;
        }
        Err(e) => {
            debug!("Until clause '{}' is not a valid date: {}", clause, e);
            return None;
        }
    };

    let day = end_of_stated_period(&found)?;
    let (h, m, s) = UNTIL_END_OF_DAY;
    let time = match found.time {
        Some(clock) => disambiguate_hour(clock, options),
        None => NaiveTime::from_hms_opt(h, m, s)?,
    };
    Some(day.and_time(time))
}

/// Detect a recurrence pattern in `text`
///
/// Birthdays and anniversaries short-circuit as open-ended yearly series; any other match
/// picks up the until clause, and needs an end date when there is none.
pub fn detect_recurrence(text: &str, now: NaiveDateTime, options: &ParserOptions) -> RecurrenceInfo {
    let until = parse_until_date(text, now, options);
    let ctx = Context { text, now, options };

    for rule in RULES.iter() {
        let Some(caps) = rule.regex.captures(text) else { continue };
        match (rule.handler)(&caps, &ctx) {
            Some(info) => {
                debug!("Recurrence pattern {:?} matched '{}'", rule.pattern, &caps[0]);
                return info.with_until(until);
            }
            None => debug!("Recurrence pattern {:?} declined '{}'", rule.pattern, &caps[0]),
        }
    }

    RecurrenceInfo::none()
}

/// Regexes for every scheduling phrase the detector understands, in evaluation order
pub fn schedule_phrase_patterns() -> impl Iterator<Item = &'static Regex> {
    RULES.iter().filter(|rule| rule.pattern.is_schedule_phrase()).map(|rule| &rule.regex)
}

/// Which pattern, if any, fires first for `text`
pub fn matching_pattern(text: &str, now: NaiveDateTime, options: &ParserOptions) -> Option<Pattern> {
    let ctx = Context { text, now, options };
    RULES
        .iter()
        .find(|rule| rule.regex.captures(text).is_some_and(|caps| (rule.handler)(&caps, &ctx).is_some()))
        .map(|rule| rule.pattern)
}
