//! `HH:MM:SS.mmm` time strings as used by the persistence API and the
//! "go to time" input.

use crate::error::{CoreError, Result};

/// Format seconds as `HH:MM:SS.mmm`.
///
/// Hours are not wrapped at 24 and milliseconds are truncated, never rounded
/// up, so a formatted boundary never lands past the value it came from.
/// Negative and non-finite input formats as zero.
pub fn format_detailed_time(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    // The nudge absorbs binary representation error (3661.234 * 1000 is not exact).
    let total_ms = (seconds * 1000.0 + 1e-6).floor() as u64;
    let ms = total_ms % 1_000;
    let total_secs = total_ms / 1_000;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3_600;
    format!("{:02}:{:02}:{:02}.{:03}", hours, mins, secs, ms)
}

/// Parse `HH:MM:SS.ms`, `MM:SS.ms` or `SS.ms` into seconds.
///
/// Components are right-aligned, so `"1:30"` is ninety seconds. Empty
/// components count as zero.
pub fn parse_time_string(input: &str) -> Result<f64> {
    let invalid = || CoreError::InvalidTime(input.to_string());

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() > 3 {
        return Err(invalid());
    }

    // [hours, minutes, seconds]
    let mut values = [0.0_f64; 3];
    let offset = 3 - parts.len();
    for (i, part) in parts.iter().enumerate() {
        let part = part.trim();
        let value = if part.is_empty() {
            0.0
        } else {
            part.parse::<f64>().map_err(|_| invalid())?
        };
        if !value.is_finite() || value < 0.0 {
            return Err(invalid());
        }
        values[offset + i] = value;
    }

    Ok(values[0] * 3_600.0 + values[1] * 60.0 + values[2])
}

/// Loader variant: anything unparseable becomes `0`.
pub fn parse_time_or_zero(input: &str) -> f64 {
    parse_time_string(input).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_basic_values() {
        assert_eq!(format_detailed_time(0.0), "00:00:00.000");
        assert_eq!(format_detailed_time(61.5), "00:01:01.500");
        assert_eq!(format_detailed_time(3661.234), "01:01:01.234");
    }

    #[test]
    fn format_hours_past_a_day() {
        assert_eq!(format_detailed_time(90_000.0), "25:00:00.000");
    }

    #[test]
    fn format_truncates_milliseconds() {
        assert_eq!(format_detailed_time(1.2349), "00:00:01.234");
    }

    #[test]
    fn format_clamps_bad_input() {
        assert_eq!(format_detailed_time(-3.0), "00:00:00.000");
        assert_eq!(format_detailed_time(f64::NAN), "00:00:00.000");
    }

    #[test]
    fn parse_accepts_all_shapes() {
        assert!((parse_time_string("01:01:01.234").unwrap() - 3661.234).abs() < 1e-9);
        assert!((parse_time_string("02:05.5").unwrap() - 125.5).abs() < 1e-9);
        assert!((parse_time_string("42.25").unwrap() - 42.25).abs() < 1e-9);
        assert!((parse_time_string(" 1:30 ").unwrap() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn parse_missing_components_default_to_zero() {
        assert!((parse_time_string(":30").unwrap() - 30.0).abs() < 1e-9);
        assert!((parse_time_string("1::").unwrap() - 3600.0).abs() < 1e-9);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            parse_time_string("abc"),
            Err(CoreError::InvalidTime(_))
        ));
        assert!(parse_time_string("").is_err());
        assert!(parse_time_string("1:2:3:4").is_err());
        assert!(parse_time_string("-5").is_err());
        assert!(parse_time_string("inf").is_err());
    }

    #[test]
    fn parse_or_zero_swallows_errors() {
        assert_eq!(parse_time_or_zero("nope"), 0.0);
        assert!((parse_time_or_zero("00:00:10.000") - 10.0).abs() < 1e-9);
    }

    #[test]
    fn format_parse_roundtrip_within_a_millisecond() {
        for &x in &[0.0, 61.5, 3661.234] {
            let formatted = format_detailed_time(x);
            let parsed = parse_time_string(&formatted).unwrap();
            assert!((parsed - x).abs() < 0.001, "{x} -> {formatted} -> {parsed}");
            assert_eq!(format_detailed_time(parsed), formatted);
        }
    }
}
