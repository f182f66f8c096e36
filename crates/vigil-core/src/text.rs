//! Text normalization helpers shared by extraction and matching.

use unicode_normalization::UnicodeNormalization;

/// Cues that suppress a symptom match when they appear in the word window
/// immediately preceding it.
pub const NEGATION_CUES: &[&str] = &["no", "denies", "without", "negative for", "not"];

/// Normalize free text for substring matching.
///
/// Applies Unicode NFKC, lowercases, maps curly apostrophes to `'`, and
/// collapses all whitespace runs to single spaces.
#[must_use]
pub fn normalize_for_matching(raw: &str) -> String {
    let folded: String = raw
        .nfkc()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            c => c,
        })
        .collect();
    collapse_whitespace(&folded.to_lowercase())
}

/// Collapse whitespace runs to single spaces and trim.
#[must_use]
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a match at this position is negated.
///
/// `preceding` is the normalized text up to the match start; `window` is the
/// number of words inspected. A match is negated when any single-word cue
/// equals one of those words, or a multi-word cue appears inside the window.
#[must_use]
pub fn is_negated(preceding: &str, window: usize) -> bool {
    let words: Vec<&str> = preceding.split_whitespace().collect();
    let start = words.len().saturating_sub(window);
    let span = &words[start..];
    if span.is_empty() {
        return false;
    }
    let joined = span.join(" ");
    NEGATION_CUES.iter().any(|cue| {
        if cue.contains(' ') {
            joined.contains(cue)
        } else {
            span.contains(cue)
        }
    })
}

/// Deduplicate strings preserving first-occurrence order. Blank entries are
/// dropped.
#[must_use]
pub fn dedupe(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            out.push(trimmed.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_and_lowercases() {
        assert_eq!(
            normalize_for_matching("  Chest   PAIN\n\tnow "),
            "chest pain now"
        );
    }

    #[test]
    fn normalize_folds_curly_apostrophe() {
        assert_eq!(normalize_for_matching("can\u{2019}t breathe"), "can't breathe");
    }

    #[test]
    fn normalize_applies_nfkc() {
        // Fullwidth digits fold to ASCII under NFKC.
        assert_eq!(normalize_for_matching("ＳｐＯ２ low"), "spo2 low");
    }

    #[test]
    fn negation_single_word_cue() {
        assert!(is_negated("patient denies", 4));
        assert!(is_negated("reports no", 4));
        assert!(is_negated("presented without", 4));
    }

    #[test]
    fn negation_multi_word_cue() {
        assert!(is_negated("workup negative for", 4));
    }

    #[test]
    fn negation_outside_window() {
        // "no" is five words back, window is four.
        assert!(!is_negated("no history of any prior", 4));
    }

    #[test]
    fn negation_absent() {
        assert!(!is_negated("sudden onset of severe", 4));
        assert!(!is_negated("", 4));
    }

    #[test]
    fn dedupe_preserves_order() {
        let out = dedupe(vec![
            "b".to_string(),
            "a".to_string(),
            "b".to_string(),
            " ".to_string(),
        ]);
        assert_eq!(out, vec!["b", "a"]);
    }
}
