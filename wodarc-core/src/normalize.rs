//! Caption normalization: date extraction, prefix stripping, boilerplate
//! removal.
//!
//! Captions from the gym's account self-announce their date as a leading
//! `YYYYMMDD W.O.D!!` heading. The label varies in dot placement, case, and
//! exclamation-mark count, so both patterns match all of `W.O.D`, `WOD`, and
//! `w.o.d!!`.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

/// `YYYYMMDD` followed by the W.O.D label, anywhere in the text.
static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d{8})\s*W\.?O\.?D").expect("date pattern"));

/// The full heading anchored at the start of the caption, including trailing
/// exclamation marks and the whitespace that separates it from the body.
static PREFIX_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\d{8}\s*W\.?O\.?D!*\s*").expect("prefix pattern"));

/// Meta-description wrapper some scrape paths prepend:
/// `45 likes, 2 comments - user on January 6, 2026: "..."`.
static META_WRAPPER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^\d+\s*likes?,?\s*\d*\s*comments?\s*-\s*\w+\s+on\s+[^:]+:\s*"?"#)
        .expect("meta wrapper pattern")
});

/// Stray closing quote and period left behind by the wrapper.
static META_TRAILER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""\.?\s*$"#).expect("meta trailer pattern"));

/// Extract the heading date from caption text as `YYYY-MM-DD`.
///
/// Only the first (left-most) match counts: captions legitimately mention
/// later date-prefixed lines in their body (a workout programmed for another
/// day), and the true heading date is always the first occurrence. Digit runs
/// that do not form a real calendar date are silently rejected.
pub fn extract_date(text: &str) -> Option<String> {
    let caps = DATE_PATTERN.captures(text)?;
    let digits = caps.get(1).map(|m| m.as_str())?;
    NaiveDate::parse_from_str(digits, "%Y%m%d")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

/// Strip a leading `YYYYMMDD W.O.D!!` heading from caption content.
///
/// Only a match anchored at the very start of the string is removed; a second
/// date-looking line deeper in the content stays verbatim. The remainder is
/// trimmed of surrounding whitespace, which makes the operation idempotent.
pub fn strip_date_prefix(text: &str) -> String {
    PREFIX_PATTERN.replace(text, "").trim().to_string()
}

/// Remove platform metadata wrapping and promotional boilerplate.
///
/// `promo` is the set of known promotional strings to delete; both the
/// ordinary-space and non-breaking-space renderings must be supplied since
/// the platform emits them inconsistently. This is a separate step from
/// [`process_entry`] because API-sourced captions arrive without the wrapper
/// and skip it entirely.
pub fn clean_boilerplate(text: &str, promo: &[String]) -> String {
    let cleaned = META_WRAPPER.replace(text, "");
    let mut cleaned = META_TRAILER.replace(&cleaned, "").into_owned();
    for p in promo {
        cleaned = cleaned.replace(p.as_str(), "");
    }
    cleaned.trim().to_string()
}

/// Normalize one raw caption: derived date plus prefix-stripped content.
///
/// Date extraction and prefix stripping stay distinct operations because a
/// caption can carry a derivable date without literally starting with it.
pub fn process_entry(text: &str) -> (Option<String>, String) {
    (extract_date(text), strip_date_prefix(text))
}
