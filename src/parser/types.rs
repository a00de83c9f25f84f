//! Result types produced by the reminder parser
//!
//! Both types are plain values built fresh for each call and owned by the caller.

use chrono::{NaiveDateTime, Weekday};
use serde::{Serialize, Serializer};
use std::fmt;

/// Base frequency of a detected repeat pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceKind {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurrenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceKind::None => "none",
            RecurrenceKind::Daily => "daily",
            RecurrenceKind::Weekly => "weekly",
            RecurrenceKind::Monthly => "monthly",
            RecurrenceKind::Yearly => "yearly",
        }
    }

    /// Frequency name as used in calendar recurrence rules
    pub fn to_rfc5545(&self) -> Option<&'static str> {
        match self {
            RecurrenceKind::None => None,
            RecurrenceKind::Daily => Some("DAILY"),
            RecurrenceKind::Weekly => Some("WEEKLY"),
            RecurrenceKind::Monthly => Some("MONTHLY"),
            RecurrenceKind::Yearly => Some("YEARLY"),
        }
    }

    pub fn from_rfc5545(freq: &str) -> Option<Self> {
        match freq.to_uppercase().as_str() {
            "DAILY" => Some(RecurrenceKind::Daily),
            "WEEKLY" => Some(RecurrenceKind::Weekly),
            "MONTHLY" => Some(RecurrenceKind::Monthly),
            "YEARLY" => Some(RecurrenceKind::Yearly),
            _ => None,
        }
    }
}

impl fmt::Display for RecurrenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordinal position of a weekday within a month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "i8")]
pub enum SetPosition {
    First,
    Second,
    Third,
    Fourth,
    Last,
}

impl SetPosition {
    pub fn as_i8(&self) -> i8 {
        match self {
            SetPosition::First => 1,
            SetPosition::Second => 2,
            SetPosition::Third => 3,
            SetPosition::Fourth => 4,
            SetPosition::Last => -1,
        }
    }

    pub fn from_i8(value: i8) -> Option<Self> {
        match value {
            1 => Some(SetPosition::First),
            2 => Some(SetPosition::Second),
            3 => Some(SetPosition::Third),
            4 => Some(SetPosition::Fourth),
            -1 => Some(SetPosition::Last),
            _ => None,
        }
    }

    /// Parse the ordinal word used in phrases like "second Tuesday of the month"
    pub fn from_word(word: &str) -> Option<Self> {
        match word.to_lowercase().as_str() {
            "first" | "1st" => Some(SetPosition::First),
            "second" | "2nd" => Some(SetPosition::Second),
            "third" | "3rd" => Some(SetPosition::Third),
            "fourth" | "4th" => Some(SetPosition::Fourth),
            "last" => Some(SetPosition::Last),
            _ => None,
        }
    }

    pub fn as_word(&self) -> &'static str {
        match self {
            SetPosition::First => "first",
            SetPosition::Second => "second",
            SetPosition::Third => "third",
            SetPosition::Fourth => "fourth",
            SetPosition::Last => "last",
        }
    }
}

impl From<SetPosition> for i8 {
    fn from(pos: SetPosition) -> Self {
        pos.as_i8()
    }
}

/// Two-letter weekday code (SU, MO, ..., SA)
pub fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "SU",
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
    }
}

pub fn weekday_from_code(code: &str) -> Option<Weekday> {
    match code.to_uppercase().as_str() {
        "SU" => Some(Weekday::Sun),
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        _ => None,
    }
}

/// Map a weekday name or abbreviation ("fri", "Thurs", "saturdays") to a weekday
pub fn weekday_from_name(name: &str) -> Option<Weekday> {
    let lower = name.to_lowercase();
    let trimmed = lower.strip_suffix('s').filter(|s| s.ends_with("day")).unwrap_or(lower.as_str());
    match trimmed {
        "sunday" | "sun" => Some(Weekday::Sun),
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thur" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        _ => None,
    }
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}

fn serialize_day_code<S: Serializer>(day: &Option<Weekday>, serializer: S) -> Result<S::Ok, S::Error> {
    match day {
        Some(day) => serializer.serialize_some(weekday_code(*day)),
        None => serializer.serialize_none(),
    }
}

/// Descriptor of a detected repeat pattern
///
/// When `kind` is [`RecurrenceKind::None`] every other field is empty. Birthdays and
/// anniversaries are always yearly and never need an end date.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceInfo {
    #[serde(rename = "type")]
    pub kind: RecurrenceKind,
    pub is_birthday: bool,
    pub is_anniversary: bool,
    pub needs_end_date: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_day_code")]
    pub by_day: Option<Weekday>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_month_day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_set_pos: Option<SetPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until_date: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculated_date: Option<NaiveDateTime>,
}

impl RecurrenceInfo {
    /// No recurrence detected
    pub fn none() -> Self {
        Self::default()
    }

    /// A yearly occasion (birthday and/or anniversary) that repeats forever
    pub fn occasion(is_birthday: bool, is_anniversary: bool) -> Self {
        Self {
            kind: RecurrenceKind::Yearly,
            is_birthday,
            is_anniversary,
            ..Self::default()
        }
    }

    /// A plain recurrence of the given kind; end-date bookkeeping happens when the
    /// until clause is attached
    pub fn repeating(kind: RecurrenceKind) -> Self {
        Self { kind, ..Self::default() }
    }

    pub fn is_recurring(&self) -> bool {
        self.kind != RecurrenceKind::None
    }

    pub fn is_occasion(&self) -> bool {
        self.is_birthday || self.is_anniversary
    }

    /// Attach the optional until date and settle `needs_end_date`
    pub(crate) fn with_until(mut self, until: Option<NaiveDateTime>) -> Self {
        if !self.is_recurring() || self.is_occasion() {
            self.until_date = None;
            self.needs_end_date = false;
            return self;
        }
        self.until_date = until;
        self.needs_end_date = until.is_none();
        self
    }
}

/// The parser's single output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseResult {
    /// Display title, never empty
    pub title: String,
    /// Next occurrence, absent when the text holds no resolvable date
    pub date: Option<NaiveDateTime>,
    pub recurrence: RecurrenceInfo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_weekday_names() {
        assert_eq!(weekday_from_name("Thurs"), Some(Weekday::Thu));
        assert_eq!(weekday_from_name("saturdays"), Some(Weekday::Sat));
        assert_eq!(weekday_from_name("tues"), Some(Weekday::Tue));
        assert_eq!(weekday_from_name("funday"), None);
        assert_eq!(weekday_code(Weekday::Fri), "FR");
        assert_eq!(weekday_from_code("sa"), Some(Weekday::Sat));
    }

    #[test]
    fn test_set_position_values() {
        assert_eq!(SetPosition::Last.as_i8(), -1);
        assert_eq!(SetPosition::from_i8(3), Some(SetPosition::Third));
        assert_eq!(SetPosition::from_i8(5), None);
        assert_eq!(SetPosition::from_word("2nd"), Some(SetPosition::Second));
    }

    #[test]
    fn test_occasion_ignores_until() {
        let until = NaiveDate::from_ymd_opt(2027, 1, 1).unwrap().and_hms_opt(0, 0, 0);
        let info = RecurrenceInfo::occasion(true, false).with_until(until);
        assert_eq!(info.kind, RecurrenceKind::Yearly);
        assert!(!info.needs_end_date);
        assert!(info.until_date.is_none());
    }

    #[test]
    fn test_until_settles_end_date() {
        let open = RecurrenceInfo::repeating(RecurrenceKind::Weekly).with_until(None);
        assert!(open.needs_end_date);

        let until = NaiveDate::from_ymd_opt(2027, 1, 1).unwrap().and_hms_opt(0, 0, 0);
        let closed = RecurrenceInfo::repeating(RecurrenceKind::Weekly).with_until(until);
        assert!(!closed.needs_end_date);

        let none = RecurrenceInfo::none().with_until(until);
        assert_eq!(none, RecurrenceInfo::none());
    }

    #[test]
    fn test_serialized_shape() {
        let mut info = RecurrenceInfo::repeating(RecurrenceKind::Monthly).with_until(None);
        info.by_day = Some(Weekday::Sat);
        info.by_set_pos = Some(SetPosition::Last);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["type"], "monthly");
        assert_eq!(json["byDay"], "SA");
        assert_eq!(json["bySetPos"], -1);
        assert_eq!(json["needsEndDate"], true);
        assert!(json.get("interval").is_none());
    }
}
