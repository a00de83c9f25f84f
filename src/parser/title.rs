//! Title extraction
//!
//! Works on the text exactly as the user typed it. The span that supplied the date is cut
//! out by offset first; everything else that reads as scheduling (times, day names, dates,
//! recurrence phrases, until clauses) is then removed by pattern, followed by filler words
//! and leftover punctuation.

use crate::parser::preprocess::strip_negations;
use crate::parser::recurrence::{blank_until_clause, schedule_phrase_patterns};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

const WEEKDAY_NAMES: &str = "monday|tuesday|wednesday|thursday|friday|saturday|sunday";
const WEEKDAY_ABBREVIATIONS: &str = "mon|tues|tue|wed|thurs|thur|thu|fri|sat|sun";
const MONTHS: &str = "january|jan|february|feb|march|mar|april|apr|may|june|jun|july|jul|august|aug|september|sept|sep|october|oct|november|nov|december|dec";
const NUMBER_WORDS: &str = "a|an|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve";

/// Filler phrases are peeled off the front one at a time ("Reminder: don't forget to ...")
const MAX_FILLER_PASSES: usize = 4;

/// Date and time phrasings, in removal order. Dates go first so "at 5/12" loses its date
/// before the bare "at 5" rule sees it.
static SCHEDULE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b\d{4}-\d{2}-\d{2}\b".to_string(),
        r"(?i)\b(?:on\s+)?\d{1,2}/\d{1,2}(?:/\d{2,4})?\b".to_string(),
        format!(r"(?i)\b(?:on\s+)?(?:{MONTHS})\.?\s+\d{{1,2}}(?:st|nd|rd|th)?\b(?:,?\s+\d{{4}}\b)?"),
        format!(r"(?i)\b(?:on\s+)?(?:the\s+)?\d{{1,2}}(?:st|nd|rd|th)?\s+(?:of\s+)?(?:{MONTHS})\b\.?(?:,?\s+\d{{4}}\b)?"),
        format!(r"(?i)\b(?:in\s+)?(?:{MONTHS})\.?,?\s+\d{{4}}\b"),
        r"(?i)\b(?:on\s+)?(?:the\s+)?day\s+after\s+tomorrow\b".to_string(),
        r"(?i)\b(?:today|tonight|tomorrow|tmrw|yesterday)\b".to_string(),
        format!(r"(?i)\bin\s+(?:\d{{1,3}}|{NUMBER_WORDS})\s+(?:minute|min|hour|hr|day|week|month|year)s?\b"),
        r"(?i)\bnext\s+(?:week|month|year)\b".to_string(),
        format!(r"(?i)\b(?:on\s+)?(?:(?:this|next|last)\s+)?(?:{WEEKDAY_NAMES})s?\b\.?"),
        format!(r"(?i)\b(?:on|this|next|last)\s+(?:{WEEKDAY_ABBREVIATIONS})\b\.?"),
        r"(?i)\bon\s+(?:the\s+)?\d{1,2}(?:st|nd|rd|th)?\b".to_string(),
        r"(?i)\bthe\s+\d{1,2}(?:st|nd|rd|th)\b".to_string(),
        r"(?i)(?:\b(?:at|by)\s+|@\s*)?\b\d{1,2}(?:\s*:\s*(?:\d{2})?)?\s*[ap]\.?m\b\.?".to_string(),
        r"(?i)(?:\b(?:at|by)\s+|@\s*)?\b\d{1,2}:\d{2}\b".to_string(),
        r"(?i)(?:\bat\s+|@\s*)\d{1,2}\b".to_string(),
        r"(?i)(?:\bat\s+)?\b(?:noon|midday|midnight)\b".to_string(),
    ]
    .iter()
    .map(|source| Regex::new(source).expect("title schedule regex"))
    .collect()
});

static LEADING_FILLER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^[\s,.\-:;]*(?:please\s+)?(?:remind\s+me\s+(?:to|about|that)|remember\s+(?:to|that)|don['’]?t\s+forget(?:\s+(?:to|that|about))?|reminder(?:\s+to)?|it['’]s|it\s+is|that|is|are)\b[\s,:]*",
    )
    .expect("leading filler regex")
});

static LINKING_VERB_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:is|are)\s+(?:on|at|due)\b").expect("linking verb regex"));

/// Words left dangling at the end once their object was removed ("Meeting is on")
static TRAILING_DANGLING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[\s,]+(?:is|are|on|at|by|from|starting|due)[\s,.]*$").expect("trailing dangling regex")
});

static SPACE_BEFORE_PUNCTUATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+([,.!?;])").expect("space before punctuation regex"));

static REPEATED_COMMA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r",(?:\s*,)+").expect("repeated comma regex"));

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

static LEADING_PUNCTUATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\s,.\-:;]+").expect("leading punctuation regex"));

static TRAILING_PUNCTUATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s,.\-:;]+$").expect("trailing punctuation regex"));

fn blank(text: &str, re: &Regex) -> String {
    re.replace_all(text, " ").into_owned()
}

fn strip_leading_fillers(text: &str) -> String {
    let mut current = text.to_string();
    for _ in 0..MAX_FILLER_PASSES {
        let next = LEADING_FILLER_RE.replace(&current, "").into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn strip_trailing_dangling(text: &str) -> String {
    let mut current = text.to_string();
    while let Some(m) = TRAILING_DANGLING_RE.find(&current) {
        current.truncate(m.start());
    }
    current
}

fn tidy(text: &str) -> String {
    let text = WHITESPACE_RE.replace_all(text, " ");
    let text = SPACE_BEFORE_PUNCTUATION_RE.replace_all(&text, "$1");
    let text = REPEATED_COMMA_RE.replace_all(&text, ",");
    let text = LEADING_PUNCTUATION_RE.replace(&text, "");
    TRAILING_PUNCTUATION_RE.replace(&text, "").into_owned()
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Build a display title from the raw reminder text
pub fn extract_title(raw: &str) -> String {
    extract_title_with(raw, None)
}

/// Build a display title, cutting `matched` (a byte range of `raw` holding the date
/// expression that was used) before any pattern runs
///
/// Never returns an empty string: when nothing is left the raw text comes back verbatim.
pub fn extract_title_with(raw: &str, matched: Option<Range<usize>>) -> String {
    let mut text = raw.to_string();
    if let Some(range) = matched.filter(|r| raw.get(r.clone()).is_some()) {
        text.replace_range(range, " ");
    }

    text = strip_negations(&text);
    text = blank_until_clause(&text);
    for re in schedule_phrase_patterns() {
        text = blank(&text, re);
    }
    for re in SCHEDULE_PATTERNS.iter() {
        text = blank(&text, re);
    }

    text = LINKING_VERB_RE.replace_all(&text, " ").into_owned();
    text = strip_leading_fillers(&tidy(&text));
    text = tidy(&strip_trailing_dangling(&tidy(&text)));

    if text.is_empty() {
        debug!("Title of '{}' cleaned to nothing; keeping the raw text", raw);
        return raw.to_string();
    }
    let title = capitalize_first(&text);
    debug!("Title '{}' from '{}'", title, raw);
    title
}
