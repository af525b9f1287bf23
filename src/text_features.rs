//! Primitive features computed from raw entry text.

/// Number of non-empty whitespace-separated tokens.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Splits on runs of `.`, `!` and `?`, trims each piece and drops blank ones.
pub fn sentence_segments(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Counts how many distinct keywords occur in `text`, ignoring case.
///
/// Matching is by substring, so `"plan"` also matches `"planning"`.
pub fn contains_any(text: &str, keywords: &[&str]) -> usize {
    let lowered = text.to_lowercase();
    let mut matched: Vec<String> = Vec::new();
    for keyword in keywords {
        let keyword = keyword.to_lowercase();
        if !matched.contains(&keyword) && lowered.contains(&keyword) {
            matched.push(keyword);
        }
    }
    matched.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", 0)]
    #[case("   \n\t ", 0)]
    #[case("one", 1)]
    #[case("  two   words ", 2)]
    #[case("line one\nline two\tand three", 5)]
    fn counts_words(#[case] text: &str, #[case] expected: usize) {
        assert_eq!(word_count(text), expected);
    }

    #[test]
    fn segments_on_terminal_punctuation_runs() {
        let segments = sentence_segments("First one. Second?! Third... ");
        assert_eq!(segments, vec!["First one", "Second", "Third"]);
    }

    #[test]
    fn segments_ignore_blank_pieces() {
        assert!(sentence_segments("").is_empty());
        assert!(sentence_segments(" ... !? ").is_empty());
        assert_eq!(sentence_segments("no terminator"), vec!["no terminator"]);
    }

    #[test]
    fn contains_any_counts_distinct_keywords_not_occurrences() {
        let keywords = ["happy", "joy"];
        assert_eq!(contains_any("happy happy HAPPY", &keywords), 1);
        assert_eq!(contains_any("Happy and full of Joy", &keywords), 2);
        assert_eq!(contains_any("nothing here", &keywords), 0);
    }

    #[test]
    fn contains_any_matches_substrings() {
        assert_eq!(contains_any("Planning the week", &["plan"]), 1);
    }

    #[test]
    fn contains_any_ignores_duplicate_keywords() {
        assert_eq!(contains_any("today", &["today", "TODAY"]), 1);
    }
}
