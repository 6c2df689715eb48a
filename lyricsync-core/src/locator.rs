//! Mapping an elapsed playback time to the active lyric line.

use crate::timeline::LyricLine;

/// Find the index of the line active at `elapsed_ms`.
///
/// Scans forward from `start_index` for the first line that starts after
/// `elapsed_ms` and returns the line before it. During playback the answer is
/// at or just past the current line, so the scan is short; callers seeking
/// backwards pass `start_index = 0`.
///
/// Returns 0 when `elapsed_ms <= 0`, when the timeline is empty, or when the
/// first scanned line already starts after `elapsed_ms` at index 0. Returns the
/// last index when no scanned line starts after `elapsed_ms`.
#[must_use]
pub fn find_line_index(lines: &[LyricLine], elapsed_ms: i64, start_index: usize) -> usize {
    if elapsed_ms <= 0 || lines.is_empty() {
        return 0;
    }

    lines
        .iter()
        .enumerate()
        .skip(start_index)
        .find(|(_, line)| elapsed_ms < line.time_ms())
        .map_or(lines.len() - 1, |(index, _)| index.saturating_sub(1))
}
