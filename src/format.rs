//! Display formatting for money and server timestamps.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Rupiah amount in Indonesian notation: `Rp 15.000,00`. Zero renders as `Rp0`.
pub fn format_idr(amount: f64) -> String {
    if amount == 0.0 || !amount.is_finite() {
        return "Rp0".to_string();
    }
    let cents = (amount.abs() * 100.0).round() as u128;
    let whole = (cents / 100).to_string();
    let frac = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{}Rp {},{:02}", sign, grouped, frac)
}

/// Parse the timestamp shapes the API emits: RFC 3339, or naive `YYYY-MM-DD HH:MM:SS`
/// (taken as UTC), or a bare date.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(n) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(n.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}

/// `05 Mar 2025 14:30`, or the raw text when it is not a recognised timestamp.
pub fn format_date(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(dt) => dt.format("%d %b %Y %H:%M").to_string(),
        None => raw.to_string(),
    }
}
