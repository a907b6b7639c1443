use std::time::Duration;

/// Parses cooldown hints like `"15m"`, `"1h30m"`, `"900000ms"` into a [`Duration`].
///
/// Each `\d+(ms|s|m|h)` run is summed. A bare integer with no unit is
/// interpreted as seconds, matching upstream `quotaResetDelay` hints that
/// omit units entirely.
pub fn parse_duration_hint(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(secs) = input.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let bytes = input.as_bytes();
    let mut i = 0;
    let mut total = Duration::ZERO;
    let mut matched = false;
    while i < bytes.len() {
        let digits_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == digits_start {
            return None;
        }
        let number: u64 = input[digits_start..i].parse().ok()?;

        let unit_start = i;
        while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        let unit = &input[unit_start..i];
        let unit_duration = match unit {
            "ms" => Duration::from_millis(number),
            "s" => Duration::from_secs(number),
            "m" => Duration::from_secs(number * 60),
            "h" => Duration::from_secs(number * 3600),
            _ => return None,
        };
        total += unit_duration;
        matched = true;
    }
    matched.then_some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_seconds() {
        assert_eq!(parse_duration_hint("30"), Some(Duration::from_secs(30)));
    }

    #[test]
    fn parses_single_unit() {
        assert_eq!(parse_duration_hint("15m"), Some(Duration::from_secs(900)));
    }

    #[test]
    fn parses_compound_units() {
        assert_eq!(parse_duration_hint("1h30m"), Some(Duration::from_secs(5400)));
    }

    #[test]
    fn parses_milliseconds() {
        assert_eq!(
            parse_duration_hint("900000ms"),
            Some(Duration::from_millis(900_000))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_duration_hint("soon"), None);
        assert_eq!(parse_duration_hint("15x"), None);
        assert_eq!(parse_duration_hint(""), None);
    }
}
