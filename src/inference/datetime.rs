//! ISO-8601-ish date/date-time recognition for string values.
use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// Fixed-width fields only: `YYYY-MM-DD`, then optionally `[T ]HH[:MM[:SS[.f]]]`
/// with a `Z` or `±HH:MM` offset.
static ISO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(\d{4}-\d{2}-\d{2})",
        r"(?:[T ](\d{2})(?::(\d{2})(?::(\d{2})(?:\.\d{1,9})?)?)?",
        r"(?:Z|[+-](\d{2}):(\d{2}))?)?$",
    ))
    .unwrap()
});

/// True for a date, or a date-time with optional fraction and `Z`/`±HH:MM` offset.
pub fn looks_like_datetime(s: &str) -> bool {
    let Some(caps) = ISO_RE.captures(s) else {
        return false;
    };
    if NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").is_err() {
        return false;
    }
    let field = |i: usize| caps.get(i).map_or(Some(0), |m| m.as_str().parse::<u32>().ok());
    let Some(hour) = caps.get(2) else {
        return true;
    };
    let time_ok = match (hour.as_str().parse().ok(), field(3), field(4)) {
        (Some(h), Some(m), Some(sec)) => NaiveTime::from_hms_opt(h, m, sec).is_some(),
        _ => false,
    };
    let offset_ok = match (field(5), field(6)) {
        (Some(h), Some(m)) => h < 24 && m < 60,
        _ => false,
    };
    time_ok && offset_ok
}
