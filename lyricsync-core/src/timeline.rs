use crate::locator::find_line_index;
use crate::lrc::{parse_timed_line, TimedLine};
use crate::time::DurationExt;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Lyric text handed to the player: a primary body plus optional extended
/// bodies (translations, romanizations) keyed by the same timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LyricSource {
    pub lyric: String,
    pub extended: Vec<String>,
}

impl LyricSource {
    /// Create a source with only a primary lyric body
    #[must_use]
    pub fn new(lyric: impl Into<String>) -> Self {
        Self {
            lyric: lyric.into(),
            extended: Vec::new(),
        }
    }

    /// Add an extended lyric body
    #[must_use]
    pub fn with_extended(mut self, extended: impl Into<String>) -> Self {
        self.extended.push(extended.into());
        self
    }
}

/// A single timed line of the primary lyric with any merged extended text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricLine {
    pub time: Duration,
    pub text: String,
    /// Extended lyric text sharing this timestamp, in encounter order
    pub extended_lines: Vec<String>,
}

impl LyricLine {
    #[must_use]
    pub fn new(time: Duration, text: impl Into<String>) -> Self {
        Self {
            time,
            text: text.into(),
            extended_lines: Vec::new(),
        }
    }

    /// Line start in signed milliseconds, for drift arithmetic.
    #[must_use]
    pub fn time_ms(&self) -> i64 {
        self.time.as_millis_i64()
    }
}

/// Immutable, time-ordered sequence of lyric lines.
///
/// Timestamps are unique, so line times are strictly increasing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    lines: Vec<LyricLine>,
}

impl Timeline {
    /// Build a timeline from a primary body and zero or more extended bodies.
    ///
    /// Untimed lines are skipped. A repeated primary timestamp replaces the
    /// earlier line. Extended lines are attached to the primary line with the
    /// same timestamp and dropped when there is none.
    #[must_use]
    pub fn build(lyric: &str, extended: &[String], remove_blank_lines: bool) -> Self {
        let mut lines: Vec<LyricLine> = Vec::new();
        let mut index_by_time: HashMap<Duration, usize> = HashMap::new();

        for timed in timed_lines(lyric, remove_blank_lines) {
            let line = LyricLine::new(timed.time, timed.text);
            match index_by_time.entry(timed.time) {
                Entry::Occupied(entry) => lines[*entry.get()] = line,
                Entry::Vacant(entry) => {
                    entry.insert(lines.len());
                    lines.push(line);
                }
            }
        }

        let mut dropped = 0_usize;
        for body in extended {
            for timed in timed_lines(body, remove_blank_lines) {
                if let Some(&index) = index_by_time.get(&timed.time) {
                    lines[index].extended_lines.push(timed.text);
                } else {
                    dropped += 1;
                }
            }
        }

        lines.sort_by_key(|line| line.time);

        debug!(
            "Built timeline: {} lines, {} extended bodies, {} unmatched extended lines",
            lines.len(),
            extended.len(),
            dropped
        );

        Self { lines }
    }

    /// Build a timeline from a [`LyricSource`]
    #[must_use]
    pub fn from_source(source: &LyricSource, remove_blank_lines: bool) -> Self {
        Self::build(&source.lyric, &source.extended, remove_blank_lines)
    }

    #[must_use]
    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&LyricLine> {
        self.lines.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Index of the last line, or 0 for an empty timeline.
    #[must_use]
    pub fn max_line_index(&self) -> usize {
        self.lines.len().saturating_sub(1)
    }

    /// Index of the line active at `elapsed_ms`, scanning forward from `start_index`.
    #[must_use]
    pub fn locate(&self, elapsed_ms: i64, start_index: usize) -> usize {
        find_line_index(&self.lines, elapsed_ms, start_index)
    }
}

/// Timed, non-blank lines of a body. `\r\n`, `\n` and bare `\r` all end a line;
/// the empty fragment between `\r` and `\n` is untimed and falls out.
fn timed_lines(body: &str, remove_blank_lines: bool) -> impl Iterator<Item = TimedLine> + '_ {
    body.split(['\r', '\n'])
        .filter_map(move |line| parse_timed_line(line, remove_blank_lines))
        .filter(|timed| !timed.is_blank())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lrc::BLANK_LINE_PLACEHOLDER;

    fn times(timeline: &Timeline) -> Vec<u64> {
        timeline
            .lines()
            .iter()
            .map(|line| line.time.as_millis_u64())
            .collect()
    }

    #[test]
    fn test_build_multiple_lines() {
        let input = r"
[00:05.00]First line
[00:10.00]Second line
[00:15.00]Third line
";
        let timeline = Timeline::build(input, &[], true);
        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline.lines()[0].text, "First line");
        assert_eq!(timeline.lines()[2].text, "Third line");
        assert_eq!(timeline.max_line_index(), 2);
    }

    #[test]
    fn test_line_endings() {
        let input = "[00:01.00]a\r\n[00:02.00]b\r[00:03.00]c\n[00:04.00]d";
        let timeline = Timeline::build(input, &[], true);
        assert_eq!(times(&timeline), vec![1000, 2000, 3000, 4000]);
    }

    #[test]
    fn test_sorted_numerically() {
        let input = "[00:10.00]ten\n[00:09.00]nine\n[01:00.00]sixty\n[00:02.00]two";
        let timeline = Timeline::build(input, &[], true);
        assert_eq!(times(&timeline), vec![2000, 9000, 10_000, 60_000]);
    }

    #[test]
    fn test_extended_merge() {
        let primary = "[00:00.00]zero\n[00:01.00]one\n[00:02.00]two";
        let extended = vec!["[00:01.00]uno".to_string()];
        let timeline = Timeline::build(primary, &extended, true);

        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline.lines()[1].extended_lines, vec!["uno".to_string()]);
        assert!(timeline.lines()[0].extended_lines.is_empty());
        assert!(timeline.lines()[2].extended_lines.is_empty());
    }

    #[test]
    fn test_extended_without_primary_match_is_dropped() {
        let primary = "[00:00.00]zero\n[00:01.00]one\n[00:02.00]two";
        let extended = vec!["[00:01.50]orphan".to_string()];
        let timeline = Timeline::build(primary, &extended, true);

        assert_eq!(timeline.len(), 3);
        assert!(timeline.lines().iter().all(|l| l.extended_lines.is_empty()));
    }

    #[test]
    fn test_multiple_extended_bodies_in_order() {
        let primary = "[00:01.00]hello";
        let extended = vec![
            "[00:01.00]hola".to_string(),
            "[00:01.000]bonjour".to_string(),
        ];
        let timeline = Timeline::build(primary, &extended, true);
        assert_eq!(
            timeline.lines()[0].extended_lines,
            vec!["hola".to_string(), "bonjour".to_string()]
        );
    }

    #[test]
    fn test_duplicate_timestamp_last_wins() {
        let input = "[00:01.00]first\n[00:02.00]middle\n[00:01.00]second";
        let timeline = Timeline::build(input, &[], true);
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.lines()[0].text, "second");
        assert_eq!(timeline.lines()[1].text, "middle");
    }

    #[test]
    fn test_equivalent_timestamps_merge() {
        let input = "[00:01.5]short\n[00:01.500]long";
        let timeline = Timeline::build(input, &[], true);
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.lines()[0].text, "long");
    }

    #[test]
    fn test_untimed_and_blank_lines_dropped() {
        let input = "[ti:Title]\nno timestamp\n[00:01.00]\n[00:02.00]kept\n";
        let timeline = Timeline::build(input, &[], true);
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.lines()[0].text, "kept");
    }

    #[test]
    fn test_blank_lines_kept_as_placeholder() {
        let input = "[00:01.00]\n[00:02.00]kept";
        let extended = vec!["[00:01.00]".to_string()];
        let timeline = Timeline::build(input, &extended, false);
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.lines()[0].text, BLANK_LINE_PLACEHOLDER);
        assert_eq!(
            timeline.lines()[0].extended_lines,
            vec![BLANK_LINE_PLACEHOLDER.to_string()]
        );
    }

    #[test]
    fn test_empty_input() {
        let timeline = Timeline::build("", &[], true);
        assert!(timeline.is_empty());
        assert_eq!(timeline.max_line_index(), 0);
    }

    #[test]
    fn test_second_leading_tag_stays_in_text() {
        let input = "[00:05.00][00:15.00]chorus\n[00:10.00]verse";
        let timeline = Timeline::build(input, &[], true);
        assert_eq!(times(&timeline), vec![5000, 10_000]);
        assert_eq!(timeline.lines()[0].text, "[00:15.00]chorus");
    }

    #[test]
    fn test_out_of_range_timestamps_dropped() {
        let input = "[00:00.00]a\n[5000000000000000:00:00]b\n[5000000000000001:00:00]c";
        let timeline = Timeline::build(input, &[], true);
        assert_eq!(times(&timeline), vec![0]);
    }

    #[test]
    fn test_from_source() {
        let source = LyricSource::new("[00:01.00]one").with_extended("[00:01.00]eins");
        let timeline = Timeline::from_source(&source, true);
        assert_eq!(timeline.lines()[0].extended_lines, vec!["eins".to_string()]);
    }
}
