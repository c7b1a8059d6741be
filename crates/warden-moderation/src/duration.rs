//! Compact duration tokens (`10m`, `2h`, `3d`, `1w`) and remaining-time display.

const MINUTE_MS: u64 = 60_000;
const HOUR_MS: u64 = 60 * MINUTE_MS;
const DAY_MS: u64 = 24 * HOUR_MS;
const WEEK_MS: u64 = 7 * DAY_MS;

/// Parse `<digits><unit>` with unit in `m`, `h`, `d`, `w` (any case) into milliseconds.
///
/// No whitespace, signs, or fractions are accepted. Returns `None` for anything
/// else, including values that overflow `u64`.
pub fn parse_duration_ms(token: &str) -> Option<u64> {
    let unit = token.chars().last()?;
    let digits = &token[..token.len() - unit.len_utf8()];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let unit_ms = match unit.to_ascii_lowercase() {
        'm' => MINUTE_MS,
        'h' => HOUR_MS,
        'd' => DAY_MS,
        'w' => WEEK_MS,
        _ => return None,
    };

    digits.parse::<u64>().ok()?.checked_mul(unit_ms)
}

/// Render a remaining duration as `"1d 2h 5m"`, dropping zero units.
///
/// Seconds are truncated, so anything under a minute renders as `""`.
/// Negative input is treated as zero.
pub fn humanize_remaining(remaining_ms: i64) -> String {
    let ms = remaining_ms.max(0) as u64;
    let days = ms / DAY_MS;
    let hours = (ms % DAY_MS) / HOUR_MS;
    let minutes = (ms % HOUR_MS) / MINUTE_MS;

    let parts: Vec<String> = [(days, 'd'), (hours, 'h'), (minutes, 'm')]
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| format!("{n}{unit}"))
        .collect();
    parts.join(" ")
}

/// `humanize_remaining` for display: never empty.
pub fn display_remaining(remaining: &str) -> &str {
    if remaining.is_empty() {
        "less than a minute"
    } else {
        remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_each_unit() {
        assert_eq!(parse_duration_ms("10m"), Some(600_000));
        assert_eq!(parse_duration_ms("2h"), Some(7_200_000));
        assert_eq!(parse_duration_ms("3d"), Some(259_200_000));
        assert_eq!(parse_duration_ms("1w"), Some(604_800_000));
    }

    #[test]
    fn test_parse_is_exact_multiple() {
        for n in [1u64, 7, 59, 60, 1000, 123_456] {
            assert_eq!(parse_duration_ms(&format!("{n}m")), Some(n * 60_000));
            assert_eq!(parse_duration_ms(&format!("{n}h")), Some(n * 3_600_000));
            assert_eq!(parse_duration_ms(&format!("{n}d")), Some(n * 86_400_000));
            assert_eq!(parse_duration_ms(&format!("{n}w")), Some(n * 604_800_000));
        }
    }

    #[test]
    fn test_parse_unit_case_insensitive() {
        assert_eq!(parse_duration_ms("10M"), Some(600_000));
        assert_eq!(parse_duration_ms("1W"), Some(604_800_000));
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        for bad in [
            "", "m", "10", "10s", "1.5h", "-5m", "+5m", " 10m", "10m ", "10 m", "ten m", "10mm",
            "1h30m", "١٠m",
        ] {
            assert_eq!(parse_duration_ms(bad), None, "should reject {bad:?}");
        }
    }

    #[test]
    fn test_parse_rejects_overflow() {
        assert_eq!(parse_duration_ms("99999999999999999999w"), None);
        assert_eq!(parse_duration_ms("30500000000000w"), None);
    }

    #[test]
    fn test_humanize_examples() {
        assert_eq!(humanize_remaining(125 * 60_000), "2h 5m");
        assert_eq!(humanize_remaining(45 * 60_000), "45m");
        assert_eq!(humanize_remaining(DAY_MS as i64 + 2 * HOUR_MS as i64), "1d 2h");
        assert_eq!(humanize_remaining(DAY_MS as i64 + 5 * MINUTE_MS as i64), "1d 5m");
    }

    #[test]
    fn test_humanize_truncates_seconds() {
        assert_eq!(humanize_remaining(59_999), "");
        assert_eq!(humanize_remaining(60_000), "1m");
        assert_eq!(humanize_remaining(119_999), "1m");
        assert_eq!(humanize_remaining(0), "");
        assert_eq!(humanize_remaining(-5_000), "");
    }

    #[test]
    fn test_display_remaining_never_empty() {
        assert_eq!(display_remaining(""), "less than a minute");
        assert_eq!(display_remaining("5m"), "5m");
    }
}
