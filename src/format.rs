use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use lru::LruCache;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};
use std::fmt::Display;
use std::num::NonZeroUsize;

pub const PLACEHOLDER: &str = "—";
pub const HIGHLIGHT_OPEN: &str = r#"<mark class="highlight">"#;
pub const HIGHLIGHT_CLOSE: &str = "</mark>";
const MAX_FRACTION_DIGITS: usize = 3;
const PATTERN_CACHE_SIZE: usize = 64;
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

static PATTERN_CACHE: Lazy<Mutex<LruCache<String, Option<Regex>>>> = Lazy::new(|| {
    Mutex::new(LruCache::new(
        NonZeroUsize::new(PATTERN_CACHE_SIZE).expect("non-zero pattern cache size"),
    ))
});

/// Grouped decimal, at most three fraction digits (`12345.6789` -> `12,345.679`).
pub fn format_number(value: Option<f64>) -> String {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return PLACEHOLDER.to_string();
    };
    let fixed = format!("{:.*}", MAX_FRACTION_DIGITS, value.abs());
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');
    let mut out = String::with_capacity(fixed.len() + 4);
    if value.is_sign_negative() && (integer != "0" || !fraction.is_empty()) {
        out.push('-');
    }
    out.push_str(&group_thousands(integer));
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (len - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Compact rendering for rank-feature values.
pub fn format_float(value: Option<f64>) -> String {
    let Some(value) = value.filter(|v| !v.is_nan()) else {
        return PLACEHOLDER.to_string();
    };
    let magnitude = value.abs();
    if magnitude >= 100.0 {
        format!("{value:.0}")
    } else if magnitude >= 1.0 {
        format!("{value:.2}")
    } else {
        two_significant_digits(value)
    }
}

fn two_significant_digits(value: f64) -> String {
    if value == 0.0 {
        return "0.0".to_string();
    }
    let exponent = value.abs().log10().floor() as i32;
    if exponent < -6 {
        return format!("{value:.1e}");
    }
    let decimals = (1 - exponent).max(0) as usize;
    let text = format!("{value:.decimals$}");
    // Rounding can carry into the next power of ten (0.0996 -> 0.100).
    let significant = text
        .chars()
        .filter(char::is_ascii_digit)
        .skip_while(|digit| *digit == '0')
        .count();
    if significant > 2 && decimals > 0 {
        format!("{value:.prec$}", prec = decimals - 1)
    } else {
        text
    }
}

pub fn format_duration(ms: Option<f64>) -> String {
    match ms.filter(|v| !v.is_nan()) {
        None => "unknown time".to_string(),
        Some(ms) if ms < 1000.0 => format!("{} ms", ms.round()),
        Some(ms) => format!("{:.2} s", ms / 1000.0),
    }
}

/// Local-time rendering of a backend timestamp, `YYYY/M/D HH:MM:SS`.
pub fn format_date(value: &str) -> String {
    format_date_in(value, &Local)
}

pub fn format_date_in<Tz>(value: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    parse_timestamp(value, tz)
        .map(|date| date.format("%Y/%-m/%-d %H:%M:%S").to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn parse_timestamp<Tz: TimeZone>(value: &str, tz: &Tz) -> Option<DateTime<Tz>> {
    let value = value.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Some(date.with_timezone(tz));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, pattern) {
            return tz.from_local_datetime(&naive).earliest();
        }
    }
    // Date-only values are midnight UTC.
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight).with_timezone(tz))
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightSpan<'a> {
    Plain(&'a str),
    Match(&'a str),
}

/// Splits `text` around case-insensitive literal occurrences of `query`.
/// An empty query, or one whose pattern cannot be built, yields the text
/// as a single plain span.
pub fn highlight_segments<'a>(text: &'a str, query: &str) -> Vec<HighlightSpan<'a>> {
    if query.is_empty() {
        return vec![HighlightSpan::Plain(text)];
    }
    let Some(pattern) = query_pattern(query) else {
        return vec![HighlightSpan::Plain(text)];
    };
    let mut spans = Vec::new();
    let mut cursor = 0;
    for found in pattern.find_iter(text) {
        if found.start() == found.end() {
            continue;
        }
        if found.start() > cursor {
            spans.push(HighlightSpan::Plain(&text[cursor..found.start()]));
        }
        spans.push(HighlightSpan::Match(found.as_str()));
        cursor = found.end();
    }
    if cursor < text.len() || spans.is_empty() {
        spans.push(HighlightSpan::Plain(&text[cursor..]));
    }
    spans
}

/// Escaped markup with every occurrence of `query` wrapped in a highlight mark.
pub fn highlight_terms(text: &str, query: &str) -> String {
    let mut out = String::with_capacity(text.len() + 32);
    for span in highlight_segments(text, query) {
        match span {
            HighlightSpan::Plain(part) => out.push_str(&escape_html(part)),
            HighlightSpan::Match(part) => {
                out.push_str(HIGHLIGHT_OPEN);
                out.push_str(&escape_html(part));
                out.push_str(HIGHLIGHT_CLOSE);
            }
        }
    }
    out
}

fn query_pattern(query: &str) -> Option<Regex> {
    let mut cache = PATTERN_CACHE.lock();
    if let Some(pattern) = cache.get(query) {
        return pattern.clone();
    }
    let built = RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()
        .ok();
    cache.put(query.to_string(), built.clone());
    built
}
