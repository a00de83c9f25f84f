//! Calendar recurrence rules built from a [`RecurrenceInfo`]
//!
//! Renders the `RRULE:` line a calendar backend expects and parses such a line back, so a
//! stored rule can be described to the user again.

use crate::parser::types::{weekday_code, weekday_from_code, weekday_name, RecurrenceInfo, RecurrenceKind, SetPosition};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use log::debug;
use std::fmt;
use std::str::FromStr;

const UNTIL_FORMAT: &str = "%Y%m%dT%H%M%SZ";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("Recurrence rule has no FREQ part")]
    MissingFrequency,
    #[error("Unsupported recurrence frequency: {0}")]
    UnknownFrequency(String),
    #[error("Malformed recurrence rule part: '{0}'")]
    MalformedPart(String),
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

/// One calendar recurrence rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: RecurrenceKind,
    pub interval: u32,
    pub by_day: Option<Weekday>,
    pub by_set_pos: Option<SetPosition>,
    pub by_month_day: Option<u32>,
    pub until: Option<DateTime<Utc>>,
}

impl RecurrenceRule {
    /// Build the rule for a detected pattern; `None` when nothing repeats
    ///
    /// The until date is local wall-clock time in `tz` and is converted to UTC. Birthdays
    /// and anniversaries never carry one.
    pub fn from_info(info: &RecurrenceInfo, tz: &Tz) -> Option<Self> {
        if !info.is_recurring() {
            return None;
        }
        let until = if info.is_occasion() {
            None
        } else {
            info.until_date.map(|local| local_to_utc(local, tz))
        };
        Some(Self {
            frequency: info.kind,
            interval: info.interval.unwrap_or(1).max(1),
            by_day: info.by_day,
            by_set_pos: info.by_set_pos,
            by_month_day: info.by_month_day,
            until,
        })
    }

    /// Pattern fields of this rule as a [`RecurrenceInfo`]; the until date is kept in UTC
    pub fn to_info(&self) -> RecurrenceInfo {
        RecurrenceInfo {
            interval: (self.interval > 1).then_some(self.interval),
            by_day: self.by_day,
            by_set_pos: self.by_set_pos,
            by_month_day: self.by_month_day,
            ..RecurrenceInfo::repeating(self.frequency)
        }
        .with_until(self.until.map(|utc| utc.naive_utc()))
    }

    pub fn describe(&self) -> String {
        describe(&self.to_info())
    }
}

fn local_to_utc(local: NaiveDateTime, tz: &Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(&local).earliest() {
        Some(zoned) => zoned.with_timezone(&Utc),
        // Inside a DST gap: the wall-clock time does not exist, keep its digits
        None => Utc.from_utc_datetime(&local),
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = vec![format!("FREQ={}", self.frequency.to_rfc5545().unwrap_or("DAILY"))];
        if self.interval > 1 {
            parts.push(format!("INTERVAL={}", self.interval));
        }
        if let Some(day) = self.by_day {
            let position = self.by_set_pos.map(|p| p.as_i8().to_string()).unwrap_or_default();
            parts.push(format!("BYDAY={}{}", position, weekday_code(day)));
        }
        if let Some(day) = self.by_month_day {
            parts.push(format!("BYMONTHDAY={}", day));
        }
        if let Some(until) = self.until {
            parts.push(format!("UNTIL={}", until.format(UNTIL_FORMAT)));
        }
        write!(f, "RRULE:{}", parts.join(";"))
    }
}

fn invalid(key: &str, value: &str) -> RuleError {
    RuleError::InvalidValue { key: key.to_string(), value: value.to_string() }
}

fn parse_by_day(value: &str) -> Result<(Option<SetPosition>, Weekday), RuleError> {
    if value.contains(',') {
        return Err(invalid("BYDAY", value));
    }
    let split = value
        .len()
        .checked_sub(2)
        .filter(|&i| value.is_char_boundary(i))
        .ok_or_else(|| invalid("BYDAY", value))?;
    let (position, code) = value.split_at(split);
    let weekday = weekday_from_code(code).ok_or_else(|| invalid("BYDAY", value))?;
    let position = match position {
        "" => None,
        digits => {
            let n = digits.trim_start_matches('+').parse::<i8>().map_err(|_| invalid("BYDAY", value))?;
            Some(SetPosition::from_i8(n).ok_or_else(|| invalid("BYDAY", value))?)
        }
    };
    Ok((position, weekday))
}

fn parse_until(value: &str) -> Result<DateTime<Utc>, RuleError> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, UNTIL_FORMAT) {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    // Date-only UNTIL covers the whole day
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .ok()
        .and_then(|date| date.and_hms_opt(23, 59, 59))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| invalid("UNTIL", value))
}

impl FromStr for RecurrenceRule {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.trim();
        let body = body
            .get(..6)
            .filter(|prefix| prefix.eq_ignore_ascii_case("RRULE:"))
            .map_or(body, |_| &body[6..]);

        let mut frequency = None;
        let mut rule = RecurrenceRule {
            frequency: RecurrenceKind::None,
            interval: 1,
            by_day: None,
            by_set_pos: None,
            by_month_day: None,
            until: None,
        };

        for part in body.split(';').filter(|p| !p.trim().is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| RuleError::MalformedPart(part.to_string()))?;
            let key = key.trim().to_uppercase();
            let value = value.trim();
            match key.as_str() {
                "FREQ" => {
                    frequency = Some(
                        RecurrenceKind::from_rfc5545(value)
                            .ok_or_else(|| RuleError::UnknownFrequency(value.to_string()))?,
                    );
                }
                "INTERVAL" => {
                    rule.interval = value.parse().ok().filter(|&n| n >= 1).ok_or_else(|| invalid(&key, value))?;
                }
                "BYDAY" => {
                    let (position, day) = parse_by_day(value)?;
                    rule.by_day = Some(day);
                    // BYSETPOS may already have set the position
                    rule.by_set_pos = position.or(rule.by_set_pos);
                }
                "BYSETPOS" => {
                    let n = value.parse::<i8>().map_err(|_| invalid(&key, value))?;
                    rule.by_set_pos = Some(SetPosition::from_i8(n).ok_or_else(|| invalid(&key, value))?);
                }
                "BYMONTHDAY" => {
                    rule.by_month_day =
                        Some(value.parse().ok().filter(|d| (1..=31).contains(d)).ok_or_else(|| invalid(&key, value))?);
                }
                "UNTIL" => rule.until = Some(parse_until(value)?),
                other => debug!("Ignoring recurrence rule part {}", other),
            }
        }

        rule.frequency = frequency.ok_or(RuleError::MissingFrequency)?;
        Ok(rule)
    }
}

fn unit(kind: RecurrenceKind) -> &'static str {
    match kind {
        RecurrenceKind::Daily => "day",
        RecurrenceKind::Weekly => "week",
        RecurrenceKind::Monthly => "month",
        _ => "year",
    }
}

/// Short human-readable description of a pattern, e.g. "last Saturday of every month"
pub fn describe(info: &RecurrenceInfo) -> String {
    let interval = info.interval.filter(|&n| n > 1);
    match (info.by_set_pos, info.by_day, info.by_month_day, interval) {
        (Some(position), Some(day), _, _) => {
            format!("{} {} of every month", position.as_word(), weekday_name(day))
        }
        (_, _, Some(day), _) => format!("day {} of every month", day),
        (_, Some(day), _, Some(n)) => format!("every {} {}s on {}", n, unit(info.kind), weekday_name(day)),
        (_, Some(day), _, None) => format!("every {}", weekday_name(day)),
        (_, None, _, Some(n)) if info.is_recurring() => format!("every {} {}s", n, unit(info.kind)),
        _ => info.kind.to_string(),
    }
}
