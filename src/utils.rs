//! Small helpers for timestamps, text truncation and URL resolution.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use url::Url;

/// Layout of every timestamp the backend receives.
pub const ISO_LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Current local time as `YYYY-MM-DDTHH:MM:SS`.
pub fn iso_now() -> String {
    Local::now().format(ISO_LOCAL_FORMAT).to_string()
}

/// Bring a page-supplied date into the backend's `YYYY-MM-DDTHH:MM:SS` form.
///
/// RFC 3339 values keep their own wall-clock time (the offset is dropped).
/// Strings that do not parse are returned unchanged.
pub fn normalize_timestamp(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.naive_local().format(ISO_LOCAL_FORMAT).to_string();
    }
    for layout in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, layout) {
            return dt.format(ISO_LOCAL_FORMAT).to_string();
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return dt.format(ISO_LOCAL_FORMAT).to_string();
        }
    }
    raw.to_string()
}

/// Cut `s` to at most `max` characters, replacing the tail with `"..."`
/// when it is too long. Counts chars, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters and get a `"…(+N chars)"` marker.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{}…(+{} chars)", head, total - max)
    }
}

/// Resolve `href` against `base`, the way a browser would.
pub fn resolve_url(base: &str, href: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    base.join(href.trim()).ok().map(|u| u.to_string())
}
