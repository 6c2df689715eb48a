//! LRC timestamp parsing.
//!
//! Everything here is a pure function over `&str`: a line goes in, the captured
//! timestamp and the remaining text come out. No match state is kept between
//! calls.

use std::time::Duration;

/// Placeholder text used for timed lines with no lyric when blank lines are kept.
pub const BLANK_LINE_PLACEHOLDER: &str = "\u{a0}";

/// A single line of LRC text that started with a timestamp tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedLine {
    pub time: Duration,
    /// Text after the tag, trimmed. Empty when the line had no lyric and blank
    /// lines are being removed.
    pub text: String,
}

impl TimedLine {
    /// Whether the line has no displayable text.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

/// Parse a line like `[01:02.50]Hello`.
///
/// Only the first tag is consumed: in `[00:05.00][00:15.00]Chorus` the second
/// tag is part of the text. Returns `None` when the line does not start with a
/// valid timestamp tag. With `remove_blank_lines` unset, an empty lyric is
/// replaced by [`BLANK_LINE_PLACEHOLDER`] so the line keeps its slot in the
/// timeline.
#[must_use]
pub fn parse_timed_line(line: &str, remove_blank_lines: bool) -> Option<TimedLine> {
    let (raw, rest) = split_timestamp_tag(line.trim())?;
    let time = parse_timestamp(raw)?;

    let text = rest.trim();
    let text = if text.is_empty() && !remove_blank_lines {
        BLANK_LINE_PLACEHOLDER.to_string()
    } else {
        text.to_string()
    };

    Some(TimedLine { time, text })
}

/// Split a leading `[digits:.]` tag off a line, returning the tag body and the rest.
fn split_timestamp_tag(line: &str) -> Option<(&str, &str)> {
    let body = line.strip_prefix('[')?;
    let end = body.find(']')?;
    let raw = &body[..end];

    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit() || c == ':' || c == '.') {
        return None;
    }

    Some((raw, &body[end + 1..]))
}

/// Drop a spurious third fractional digit: `00:01.500` becomes `00:01.50`.
///
/// Only a trailing zero after exactly two fractional digits is removed.
#[must_use]
pub fn normalize_timestamp(raw: &str) -> &str {
    match raw.as_bytes() {
        [.., b'.', first, second, b'0'] if first.is_ascii_digit() && second.is_ascii_digit() => {
            &raw[..raw.len() - 1]
        }
        _ => raw,
    }
}

/// Parse a timestamp tag body (`mm:ss`, `mm:ss.xx` or `hh:mm:ss.xx`) into a duration.
///
/// Non-numeric fragments count as zero. Any field count other than two or three
/// is rejected, as is a time past `i64::MAX` milliseconds.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<Duration> {
    let normalized = normalize_timestamp(raw);
    let fields: Vec<&str> = normalized.split(':').collect();

    let (hours, minutes, seconds) = match fields.as_slice() {
        [minutes, seconds] => ("0", *minutes, *seconds),
        [hours, minutes, seconds] => (*hours, *minutes, *seconds),
        _ => return None,
    };

    let (whole_seconds, fraction) = match seconds.split_once('.') {
        Some((whole, fraction)) => (whole, fraction.split('.').next().unwrap_or_default()),
        None => (seconds, ""),
    };

    let millis = parse_field(hours)
        .checked_mul(3_600_000)?
        .checked_add(parse_field(minutes).checked_mul(60_000)?)?
        .checked_add(parse_field(whole_seconds).checked_mul(1000)?)?
        .checked_add(fraction_millis(fraction))?;

    // Line times take part in signed drift arithmetic
    i64::try_from(millis).ok()?;

    Some(Duration::from_millis(millis))
}

/// Digits that do not fit a `u64` are treated like any other non-numeric
/// fragment.
fn parse_field(field: &str) -> u64 {
    field.parse().unwrap_or(0)
}

/// Interpret fractional digits as a decimal fraction of a second.
fn fraction_millis(fraction: &str) -> u64 {
    let digits: String = fraction.chars().take(3).collect();
    let scale = match digits.len() {
        1 => 100,
        2 => 10,
        _ => 1,
    };
    digits.parse::<u64>().map_or(0, |value| value * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_line() {
        let line = parse_timed_line("[01:02.50]hello", true).unwrap();
        assert_eq!(line.time, Duration::from_millis(62_500));
        assert_eq!(line.text, "hello");
    }

    #[test]
    fn test_normalize_trailing_zero() {
        assert_eq!(normalize_timestamp("00:01.500"), "00:01.50");
        assert_eq!(normalize_timestamp("00:01.50"), "00:01.50");
        assert_eq!(normalize_timestamp("00:01.505"), "00:01.505");
        assert_eq!(normalize_timestamp("00:10"), "00:10");
    }

    #[test]
    fn test_three_digit_fraction_is_not_misparsed() {
        assert_eq!(parse_timestamp("00:01.500"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_timestamp("00:01.505"), Some(Duration::from_millis(1505)));
    }

    #[test]
    fn test_fraction_precision() {
        assert_eq!(parse_timestamp("00:01.5"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_timestamp("00:01.05"), Some(Duration::from_millis(1050)));
        assert_eq!(parse_timestamp("00:01.0512"), Some(Duration::from_millis(1051)));
    }

    #[test]
    fn test_hours_field() {
        assert_eq!(
            parse_timestamp("01:02:03.40"),
            Some(Duration::from_millis(3_600_000 + 120_000 + 3_000 + 400))
        );
    }

    #[test]
    fn test_no_fraction() {
        assert_eq!(parse_timestamp("02:05"), Some(Duration::from_millis(125_000)));
    }

    #[test]
    fn test_empty_fragments_count_as_zero() {
        assert_eq!(parse_timestamp(":05."), Some(Duration::from_millis(5000)));
        assert_eq!(parse_timestamp("1:2.3.4"), Some(Duration::from_millis(62_300)));
    }

    #[test]
    fn test_invalid_field_counts() {
        assert_eq!(parse_timestamp("12"), None);
        assert_eq!(parse_timestamp("1:2:3:4"), None);
        assert!(parse_timed_line("[12]text", true).is_none());
    }

    #[test]
    fn test_untimed_lines() {
        assert!(parse_timed_line("plain text", true).is_none());
        assert!(parse_timed_line("[ti:Song Title]", true).is_none());
        assert!(parse_timed_line("[]empty tag", true).is_none());
        assert!(parse_timed_line("[00:01.00 unterminated", true).is_none());
        assert!(parse_timed_line("text [00:01.00] later", true).is_none());
    }

    #[test]
    fn test_text_is_trimmed() {
        let line = parse_timed_line("  [00:01.00]   spaced out   ", true).unwrap();
        assert_eq!(line.text, "spaced out");
    }

    #[test]
    fn test_blank_line_removed() {
        let line = parse_timed_line("[00:01.00]   ", true).unwrap();
        assert!(line.is_blank());
    }

    #[test]
    fn test_blank_line_placeholder() {
        let line = parse_timed_line("[00:01.00]", false).unwrap();
        assert_eq!(line.text, BLANK_LINE_PLACEHOLDER);
        assert!(!line.is_blank());
    }

    #[test]
    fn test_only_first_tag_is_consumed() {
        let line = parse_timed_line("[00:05.00][00:15.00]Repeated lyric", true).unwrap();
        assert_eq!(line.time, Duration::from_millis(5000));
        assert_eq!(line.text, "[00:15.00]Repeated lyric");
    }

    #[test]
    fn test_time_past_i64_millis_is_rejected() {
        assert_eq!(
            parse_timestamp("2562047788015:12:55.807"),
            Some(Duration::from_millis(9_223_372_036_854_775_807))
        );
        assert_eq!(parse_timestamp("2562047788015:12:55.808"), None);
        assert_eq!(parse_timestamp("5000000000000000:00:00"), None);
        assert!(parse_timed_line("[5000000000000000:00:00]b", true).is_none());
    }

    #[test]
    fn test_cjk_text() {
        let line = parse_timed_line("[00:05.00]你好世界", true).unwrap();
        assert_eq!(line.text, "你好世界");
    }

    #[test]
    fn test_non_timestamp_tag_after_timestamp_is_text() {
        let line = parse_timed_line("[00:05.00][ar:x]words", true).unwrap();
        assert_eq!(line.time, Duration::from_millis(5000));
        assert_eq!(line.text, "[ar:x]words");
    }
}
