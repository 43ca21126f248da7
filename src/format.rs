//! Locale-independent numeric rendering for engine tokens.
//!
//! Everything here is a pure function: no formatter objects, nothing shared
//! between calls. Output always uses `.` as the decimal separator and never
//! groups digits, whatever the host's regional settings are.

/// Volume multiplier with exactly one fractional digit (`1.0`, `0.5`, `2.3`).
pub fn volume(value: f32) -> String {
    normalize_zero(format!("{:.1}", value))
}

/// Time or length value with up to four fractional digits, trailing zeros
/// and a bare trailing point removed (`1.5`, `2`, `0.1235`).
pub fn seconds(value: f64) -> String {
    let fixed = format!("{:.4}", value);
    let trimmed = if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.')
    } else {
        fixed.as_str()
    };
    normalize_zero(trimmed.to_string())
}

/// Render seconds in the engine's time-spec notation `H:MM:SS.ffff`.
pub fn time_period(total_seconds: f64) -> String {
    let sign = if total_seconds < 0.0 { "-" } else { "" };
    let ten_thousandths = (total_seconds.abs() * 10_000.0).round() as u64;

    let frac = ten_thousandths % 10_000;
    let whole = ten_thousandths / 10_000;
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let secs = whole % 60;

    format!("{}{}:{:02}:{:02}.{:04}", sign, hours, minutes, secs, frac)
}

// `format!` keeps the sign of negative zero and of values that round to it
fn normalize_zero(s: String) -> String {
    match s.strip_prefix('-') {
        Some(rest) if rest.chars().all(|c| c == '0' || c == '.') => rest.to_string(),
        _ => s,
    }
}
