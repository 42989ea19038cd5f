//! Lenient coercion of vendor and spreadsheet values into numbers and dates.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use serde_json::Value;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y/%m/%d"];

/// Parses amounts such as `12.50`, `1.234,56`, `€ 1,234.56` or `-7,5`.
///
/// When both separators are present the last one is the decimal mark. A lone
/// comma is always a decimal mark; several dots are thousands separators.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches("EUR")
        .trim_end_matches("EUR")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '€' && *c != '\'')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');
    let normalized = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (None, Some(_)) => {
            if cleaned.matches(',').count() > 1 {
                cleaned.replace(',', "")
            } else {
                cleaned.replace(',', ".")
            }
        }
        (Some(_), None) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        _ => cleaned,
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Numbers, numeric strings and `{amount|value: ..}` objects become `f64`.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s),
        Value::Object(map) => map
            .get("amount")
            .or_else(|| map.get("value"))
            .and_then(coerce_f64),
        _ => None,
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
    }
    None
}

/// Excel stores dates as days since 1899-12-30 (the 1900 leap-year bug included).
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial >= 2_958_466.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

/// Date from a spreadsheet cell: serial numbers or date strings.
pub fn date_from_cell(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Number(n) => n.as_f64().and_then(excel_serial_to_date),
        Value::String(s) => parse_date(s),
        _ => None,
    }
}

/// Date from an API payload: date strings or unix timestamps (seconds or milliseconds).
pub fn date_from_json(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_date(s),
        Value::Number(n) => {
            let ts = n.as_i64()?;
            let secs = if ts > 100_000_000_000 { ts / 1000 } else { ts };
            DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive())
        }
        _ => None,
    }
}
