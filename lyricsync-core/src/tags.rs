//! LRC ID tag extraction (`[ti:...]`, `[ar:...]`, ...).

/// Recognized LRC ID tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKey {
    Title,
    Artist,
    Album,
    Offset,
    By,
}

impl TagKey {
    pub const ALL: [Self; 5] = [Self::Title, Self::Artist, Self::Album, Self::Offset, Self::By];

    /// The tag code as it appears inside the brackets.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Title => "ti",
            Self::Artist => "ar",
            Self::Album => "al",
            Self::Offset => "offset",
            Self::By => "by",
        }
    }
}

impl std::fmt::Display for TagKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Track metadata embedded in the lyric body.
///
/// Missing tags are empty strings. `offset` is the authorial timing correction in
/// milliseconds and is zero when absent or unparseable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LyricTags {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub by: String,
    pub offset: i64,
}

impl LyricTags {
    /// Extract tags from a lyric body. The first `[key:value]` occurrence of each
    /// key wins, matched case-insensitively.
    #[must_use]
    pub fn parse(lyric: &str) -> Self {
        // ASCII lowercasing keeps byte offsets valid for slicing the original
        let haystack = lyric.to_ascii_lowercase();
        let mut tags = Self::default();

        for key in TagKey::ALL {
            let Some(value) = find_tag_value(lyric, &haystack, key) else {
                continue;
            };
            match key {
                TagKey::Title => tags.title = value.to_string(),
                TagKey::Artist => tags.artist = value.to_string(),
                TagKey::Album => tags.album = value.to_string(),
                TagKey::By => tags.by = value.to_string(),
                TagKey::Offset => tags.offset = parse_offset(value),
            }
        }

        tags
    }

    /// Get a string tag; `offset` is rendered back as its parsed value.
    #[must_use]
    pub fn get(&self, key: TagKey) -> String {
        match key {
            TagKey::Title => self.title.clone(),
            TagKey::Artist => self.artist.clone(),
            TagKey::Album => self.album.clone(),
            TagKey::By => self.by.clone(),
            TagKey::Offset => self.offset.to_string(),
        }
    }
}

fn find_tag_value<'a>(lyric: &'a str, haystack: &str, key: TagKey) -> Option<&'a str> {
    let needle = format!("[{}:", key.code());
    let start = haystack.find(&needle)? + needle.len();
    let end = start + lyric[start..].find(']')?;
    Some(&lyric[start..end])
}

/// Lenient integer parse: optional sign followed by leading digits, anything
/// after the digits is ignored.
fn parse_offset(value: &str) -> i64 {
    let value = value.trim_start();
    let (sign, digits) = match value.as_bytes().first() {
        Some(b'-') => (-1, &value[1..]),
        Some(b'+') => (1, &value[1..]),
        _ => (1, value),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    digits[..end].parse::<i64>().map_or(0, |n| sign * n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_tags() {
        let input = r"
[ti:Song Title]
[ar:Artist Name]
[al:Album Name]
[by:Someone]
[00:05.00]Lyrics here
";
        let tags = LyricTags::parse(input);
        assert_eq!(tags.title, "Song Title");
        assert_eq!(tags.artist, "Artist Name");
        assert_eq!(tags.album, "Album Name");
        assert_eq!(tags.by, "Someone");
        assert_eq!(tags.offset, 0);
    }

    #[test]
    fn test_missing_tags_are_empty() {
        let tags = LyricTags::parse("[00:01.00]only lyrics");
        assert_eq!(tags, LyricTags::default());
    }

    #[test]
    fn test_case_insensitive_match() {
        let tags = LyricTags::parse("[TI:Loud Title]\n[Ar:Mixed]");
        assert_eq!(tags.title, "Loud Title");
        assert_eq!(tags.artist, "Mixed");
    }

    #[test]
    fn test_first_match_wins() {
        let tags = LyricTags::parse("[ti:First]\n[ti:Second]");
        assert_eq!(tags.title, "First");
    }

    #[test]
    fn test_offset_values() {
        assert_eq!(LyricTags::parse("[offset:500]").offset, 500);
        assert_eq!(LyricTags::parse("[offset:-250]").offset, -250);
        assert_eq!(LyricTags::parse("[offset:+75]").offset, 75);
        assert_eq!(LyricTags::parse("[offset: 120ms]").offset, 120);
    }

    #[test]
    fn test_malformed_offset_is_zero() {
        assert_eq!(LyricTags::parse("[offset:abc]").offset, 0);
        assert_eq!(LyricTags::parse("[offset:]").offset, 0);
        assert_eq!(LyricTags::parse("[offset:-]").offset, 0);
    }

    #[test]
    fn test_values_are_kept_verbatim() {
        let tags = LyricTags::parse("[ti: Padded Title ]\n[ar:]");
        assert_eq!(tags.title, " Padded Title ");
        assert_eq!(tags.artist, "");
    }

    #[test]
    fn test_unterminated_tag_is_ignored() {
        let tags = LyricTags::parse("[ti:never closed");
        assert_eq!(tags.title, "");
    }

    #[test]
    fn test_non_ascii_values() {
        let tags = LyricTags::parse("[ti:夜に駆ける]\n[ar:YOASOBI]");
        assert_eq!(tags.title, "夜に駆ける");
        assert_eq!(tags.artist, "YOASOBI");
    }

    #[test]
    fn test_get_by_key() {
        let tags = LyricTags::parse("[al:Album][offset:-30]");
        assert_eq!(tags.get(TagKey::Album), "Album");
        assert_eq!(tags.get(TagKey::Offset), "-30");
        assert_eq!(TagKey::Offset.to_string(), "offset");
    }
}
