//! Accent-insensitive word normalization and word-set similarity.

use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Normalize a word for fuzzy comparison: NFD decomposition, strip combining
/// marks, lowercase. Accented and unaccented forms of the same word compare
/// equal (Greek tonos/dialytika, Latin diacritics).
pub fn normalize_word(word: &str) -> String {
    word.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Jaccard similarity between two word lists over normalized word sets.
///
/// Returns 0.0 when either list is empty — an empty context must never count
/// as a vacuous perfect match.
pub fn jaccard_similarity<A: AsRef<str>, B: AsRef<str>>(words_a: &[A], words_b: &[B]) -> f64 {
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let set_a: HashSet<String> = words_a.iter().map(|w| normalize_word(w.as_ref())).collect();
    let set_b: HashSet<String> = words_b.iter().map(|w| normalize_word(w.as_ref())).collect();

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();

    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}
