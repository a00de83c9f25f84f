//! Text clean-up run ahead of generic date extraction
//!
//! Negated day phrases are dropped and malformed time tokens are normalised so the
//! date grammar sees "tomorrow at 7PM" rather than "not today, but tomorrow at 7:PM".

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

/// "not today, but", "not this week", "not friday," ...
static NEGATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bnot\s+(?:today|tomorrow|this\s+week|monday|tuesday|wednesday|thursday|friday|saturday|sunday),?\s*(?:but\s+)?",
    )
    .expect("negation regex")
});

/// "7:PM", "7 :PM", "7: PM"
static COLON_MERIDIEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})\s*:\s*([ap]m)\b").expect("colon meridiem regex"));

static CLOCK_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2}:\d{2})(\s*[ap]m)?\b").expect("clock time regex"));

static TRAILING_AT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:^|\s)(?:at|@)\s*$").expect("trailing at regex"));

/// Remove negated day phrases entirely
pub fn strip_negations(text: &str) -> String {
    NEGATION_RE.replace_all(text, "").into_owned()
}

/// Repair meridiem markers and give bare clock times an explicit "at"
pub fn normalize_times(text: &str) -> String {
    let repaired = COLON_MERIDIEM_RE.replace_all(text, "$1$2");

    let mut out = String::with_capacity(repaired.len() + 8);
    let mut last = 0;
    for caps in CLOCK_TIME_RE.captures_iter(&repaired) {
        let Some(whole) = caps.get(0) else { continue };
        let before = &repaired[..whole.start()];
        out.push_str(&repaired[last..whole.start()]);
        // "12/05 10:30" style dates and "at 10:30" already carry context
        if !TRAILING_AT_RE.is_match(before) && !before.ends_with(['/', '-', ':']) {
            out.push_str("at ");
        }
        out.push_str(&caps[1]);
        if let Some(meridiem) = caps.get(2) {
            out.push_str(meridiem.as_str().trim());
        }
        last = whole.end();
    }
    out.push_str(&repaired[last..]);
    out
}

/// Full preprocessing pass. Idempotent.
pub fn preprocess(text: &str) -> String {
    let processed = normalize_times(&strip_negations(text));
    let processed = processed.trim().to_string();
    if processed != text {
        debug!("Preprocessed '{}' -> '{}'", text, processed);
    }
    processed
}
