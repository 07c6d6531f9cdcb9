/// Source lines this short are stray punctuation or list bullets, not sources.
const MIN_SOURCE_LEN: usize = 3;

/// Parse the segment that follows the `[SOURCES]` marker into an ordered source list.
///
/// Lines are trimmed; anything of two UTF-16 code units or fewer is dropped.
/// Order is preserved and duplicates are kept.
pub fn parse_sources(segment: &str) -> Vec<String> {
    segment
        .trim()
        .split('\n')
        .map(str::trim)
        .filter(|line| line.encode_utf16().count() >= MIN_SOURCE_LEN)
        .map(str::to_string)
        .collect()
}

/// Short display label for a source: the last path segment of a URL, or the line itself.
pub fn source_label(source: &str) -> &str {
    if source.starts_with("http://") || source.starts_with("https://") {
        source
            .trim_end_matches('/')
            .rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or(source)
    } else {
        source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sources_basic() {
        let sources = parse_sources("\nphysics.pdf (page 3)\nnotes.pdf (page 1)\n");
        assert_eq!(sources, vec!["physics.pdf (page 3)", "notes.pdf (page 1)"]);
    }

    #[test]
    fn test_parse_sources_drops_short_lines() {
        let sources = parse_sources("- \n--\nab\nabc\n  .  \nchapter 2.pdf");
        assert_eq!(sources, vec!["abc", "chapter 2.pdf"]);
    }

    #[test]
    fn test_parse_sources_counts_utf16_units() {
        // An astral-plane emoji is two UTF-16 units, so "😀a" has length 3.
        let sources = parse_sources("😀a\né\n😀");
        assert_eq!(sources, vec!["😀a"]);
    }

    #[test]
    fn test_parse_sources_keeps_order_and_duplicates() {
        let sources = parse_sources("b.pdf\na.pdf\nb.pdf");
        assert_eq!(sources, vec!["b.pdf", "a.pdf", "b.pdf"]);
    }

    #[test]
    fn test_parse_sources_handles_crlf() {
        let sources = parse_sources("one.pdf\r\ntwo.pdf\r\n");
        assert_eq!(sources, vec!["one.pdf", "two.pdf"]);
    }

    #[test]
    fn test_parse_sources_empty() {
        assert!(parse_sources("").is_empty());
        assert!(parse_sources("\n\n  \n").is_empty());
    }

    #[test]
    fn test_source_label() {
        assert_eq!(source_label("https://example.com/docs/guide.md"), "guide.md");
        assert_eq!(source_label("https://example.com/docs/"), "docs");
        assert_eq!(source_label("lecture-4.pdf"), "lecture-4.pdf");
    }
}
