// src/utils/text.rs

//! Small text helpers shared by normalization and message rendering.

use unicode_segmentation::UnicodeSegmentation;

/// Collapse every run of whitespace to a single space and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut `s` to at most `max` grapheme clusters, appending `…` when cut.
pub fn truncate_graphemes(s: &str, max: usize) -> String {
    let mut graphemes = s.grapheme_indices(true);
    match graphemes.nth(max) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\t b  "), "a b");
        assert_eq!(normalize_whitespace(" \n "), "");
    }

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate_graphemes("Edital", 10), "Edital");
        assert_eq!(truncate_graphemes("Edital", 6), "Edital");
    }

    #[test]
    fn test_truncate_respects_grapheme_boundaries() {
        // "ç" written as c + combining cedilla stays whole
        let text = "Cac\u{0327}apava";
        assert_eq!(truncate_graphemes(text, 3), "Cac\u{0327}…");
        assert_eq!(truncate_graphemes("São José", 3), "São…");
    }
}
