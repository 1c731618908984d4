//! Free-form date strings into canonical `YYYY-MM-DD`.
//!
//! Review sites publish dates as relative phrases ("3 days ago"), month-name
//! forms ("Jan 5, 2024"), numeric forms in several locale orders, or full
//! ISO-8601 timestamps. [`normalize`] tries each family in order and returns
//! the date component only; failure is `None`, never an error, so callers can
//! treat an unparseable date as "exclude this record".

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static RELATIVE_DAYS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*(?:days?|d)\s*ago").expect("valid regex"));
static RELATIVE_WEEKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*(?:weeks?|w)\s*ago").expect("valid regex"));
static RELATIVE_MONTHS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*(?:months?|mo)\s*ago").expect("valid regex"));
static RELATIVE_YEARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*(?:years?|y)\s*ago").expect("valid regex"));

static SEPARATOR_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new("[,\u{00A0}]").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Embedded `2024-01-05`-like token anywhere in a string.
static YMD_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4}[-/.]\d{1,2}[-/.]\d{1,2})").expect("valid regex"));
/// Embedded `January 5, 2024`-like token.
static MONTH_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Za-z]{3,9})\s+(\d{1,2}),?\s+(\d{4})\b").expect("valid regex")
});

const MONTH_NAME_FORMATS: &[&str] = &[
    "%b %d %Y", "%B %d %Y", "%d %b %Y", "%d %B %Y", "%Y %b %d", "%Y %B %d",
];
const ISO_NUMERIC_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];
const MDY_FORMATS: &[&str] = &["%m-%d-%Y", "%m/%d/%Y", "%m.%d.%Y"];
const DMY_FORMATS: &[&str] = &["%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y"];

/// Normalize an arbitrary date string against `now`, month-first numerics.
pub fn normalize(raw: &str, now: DateTime<Utc>) -> Option<String> {
    normalize_with(raw, now, false)
}

/// As [`normalize`], preferring day-first numeric forms when asked.
pub fn normalize_with(raw: &str, now: DateTime<Utc>, prefer_dayfirst: bool) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(dt) = parse_relative(raw, now) {
        return Some(iso(dt.date_naive()));
    }

    let cleaned = SEPARATOR_CHARS.replace_all(raw, " ");
    let cleaned = WHITESPACE.replace_all(cleaned.trim(), " ").into_owned();

    // Month-and-year forms get a synthetic first-of-month day. Tried before
    // the full month-name ladder: chrono's lenient spacing would otherwise
    // read "March 2024" as day 20 of year 24. Full dates cannot false-match
    // here since chrono rejects trailing input.
    if let Some(d) = try_formats(&format!("1 {cleaned}"), &["%d %b %Y", "%d %B %Y"]) {
        return Some(iso(d));
    }
    if let Some(d) = try_formats(&cleaned, MONTH_NAME_FORMATS) {
        return Some(iso(d));
    }

    let (first, second) = if prefer_dayfirst {
        (DMY_FORMATS, MDY_FORMATS)
    } else {
        (MDY_FORMATS, DMY_FORMATS)
    };
    if let Some(d) = try_formats(&cleaned, ISO_NUMERIC_FORMATS)
        .or_else(|| try_formats(&cleaned, first))
        .or_else(|| try_formats(&cleaned, second))
    {
        return Some(iso(d));
    }

    if let Some(d) = parse_iso_timestamp(&cleaned) {
        return Some(iso(d));
    }

    if let Some(c) = YMD_TOKEN.captures(&cleaned) {
        if let Some(d) = try_formats(&c[1], ISO_NUMERIC_FORMATS) {
            return Some(iso(d));
        }
    }

    if let Some(c) = MONTH_TOKEN.captures(&cleaned) {
        let guess = format!("{} {} {}", &c[1], &c[2], &c[3]);
        if let Some(d) = try_formats(&guess, &["%b %d %Y", "%B %d %Y"]) {
            return Some(iso(d));
        }
    }

    None
}

/// Inclusive range membership. An absent or unparseable date is out of range;
/// an unparseable bound is treated as no bound.
pub fn in_range(date_iso: Option<&str>, start_iso: Option<&str>, end_iso: Option<&str>) -> bool {
    let Some(d) = date_iso.and_then(parse_canonical) else {
        return false;
    };
    if let Some(s) = start_iso.and_then(parse_canonical) {
        if d < s {
            return false;
        }
    }
    if let Some(e) = end_iso.and_then(parse_canonical) {
        if d > e {
            return false;
        }
    }
    true
}

fn parse_canonical(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn iso(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// `today`, `yesterday`, `<n> day/week/month/year(s) ago`. Months approximate
/// to 30 days, years to 365.
fn parse_relative(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let text = raw.trim().to_lowercase();
    if text == "today" {
        return Some(now);
    }
    if text == "yesterday" {
        return Some(now - Duration::days(1));
    }
    if let Some(n) = capture_count(&RELATIVE_DAYS, &text) {
        return Some(now - Duration::days(n));
    }
    if let Some(n) = capture_count(&RELATIVE_WEEKS, &text) {
        return Some(now - Duration::weeks(n));
    }
    if let Some(n) = capture_count(&RELATIVE_MONTHS, &text) {
        return Some(now - Duration::days(30 * n));
    }
    if let Some(n) = capture_count(&RELATIVE_YEARS, &text) {
        return Some(now - Duration::days(365 * n));
    }
    None
}

fn capture_count(re: &Regex, text: &str) -> Option<i64> {
    re.captures(text)?.get(1)?.as_str().parse().ok()
}

fn try_formats(s: &str, formats: &[&str]) -> Option<NaiveDate> {
    formats
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
}

fn parse_iso_timestamp(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for f in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, f) {
            return Some(dt.date());
        }
    }
    None
}
