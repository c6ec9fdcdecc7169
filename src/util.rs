// Utility helpers for parsing, rates and number formatting.
//
// This module centralizes all the "dirty" CSV/number/date handling so the
// rest of the code can assume clean, typed values.
use chrono::{NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

/// Date layouts accepted for the `Date`, `PTP Date` and `Collection Date`
/// columns. ISO comes first since that is what the exports use.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports (commas, spaces, text).
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters (so `nan` is `None`).
/// - Strips thousands separators like `","` and a leading `₹` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim().trim_start_matches('₹').trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(",", "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Days-past-due must be a whole, non-negative number. Float exports such as
/// `"12.0"` are accepted, `"12.5"` and `"-3"` are not.
pub fn parse_dpd_safe(s: Option<&str>) -> Option<i64> {
    let v = parse_f64_safe(s)?;
    if v < 0.0 || v.fract() != 0.0 {
        return None;
    }
    Some(v as i64)
}

/// Communication counters; blanks and garbage count as zero.
pub fn parse_count_safe(s: Option<&str>) -> u64 {
    match parse_f64_safe(s) {
        Some(v) if v > 0.0 => v.round() as u64,
        _ => 0,
    }
}

pub fn parse_bool_safe(s: Option<&str>) -> Option<bool> {
    let s = s?.trim();
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "1.0" | "yes" | "y" => Some(true),
        "false" | "0" | "0.0" | "no" | "n" => Some(false),
        _ => None,
    }
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    // Timestamps written by spreadsheet tools; the time part is dropped.
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

/// Trimmed text, or `None` when the cell is blank or a `nan` placeholder.
pub fn parse_text_safe(s: Option<String>) -> Option<String> {
    let s = s?;
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") {
        return None;
    }
    Some(s.to_string())
}

/// Reduce a loan identifier to a comparable form: drop a trailing `.0`
/// float artifact and any leading zeros.
///
/// `"0270001375"`, `"270001375"` and `"270001375.0"` all map to
/// `"270001375"`.
pub fn normalize_loan_id(s: &str) -> String {
    let s = s.trim();
    let s = s.strip_suffix(".0").unwrap_or(s);
    let stripped = s.trim_start_matches('0');
    if stripped.is_empty() && !s.is_empty() {
        // An all-zero identifier keeps a single zero.
        return "0".to_string();
    }
    stripped.to_string()
}

/// `numerator / denominator * 100`, defined as zero when the denominator is
/// not positive.
pub fn safe_rate(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator * 100.0
    } else {
        0.0
    }
}

pub fn average(v: &[f64]) -> f64 {
    // Standard arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    // Use `num-format` to insert commas into the integer portion.
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    // Avoid printing "-0.00" for values that round to zero.
    if n.is_sign_negative() && res.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", res)
    } else {
        res
    }
}

/// Rupee amount with separators and two decimals, e.g. `₹1,234.50`.
pub fn format_currency(n: f64) -> String {
    format!("₹{}", format_number(n, 2))
}

/// Rupee amount rounded to whole units, as used on the KPI tiles.
pub fn format_currency_whole(n: f64) -> String {
    format!("₹{}", format_number(n, 0))
}

pub fn format_pct(n: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, n)
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for integer-like values. This is used
    // for counts in console messages (e.g., `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}
