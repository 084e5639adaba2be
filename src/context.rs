//! Context word extraction around a snippet occurrence in a source text.

/// Take up to `num_words` whitespace tokens immediately before and after the
/// first literal occurrence of `snippet` in `source`.
///
/// Returns two empty strings when the snippet is absent. Failure is silent at
/// this layer; callers count it as a statistic, not an error.
pub fn extract_context(source: &str, snippet: &str, num_words: usize) -> (String, String) {
    if num_words == 0 || snippet.is_empty() {
        return (String::new(), String::new());
    }

    let Some(start) = source.find(snippet) else {
        return (String::new(), String::new());
    };

    let before = &source[..start];
    let after = &source[start + snippet.len()..];

    let words_before: Vec<&str> = before.split_whitespace().collect();
    let context_before = words_before[words_before.len().saturating_sub(num_words)..].join(" ");

    let context_after = after
        .split_whitespace()
        .take(num_words)
        .collect::<Vec<_>>()
        .join(" ");

    (context_before, context_after)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_both_sides() {
        let source = "one two three four TARGET TEXT five six seven eight";
        let (before, after) = extract_context(source, "TARGET TEXT", 4);
        assert_eq!(before, "one two three four");
        assert_eq!(after, "five six seven eight");
    }

    #[test]
    fn context_shorter_than_requested() {
        let source = "alpha TARGET beta";
        let (before, after) = extract_context(source, "TARGET", 4);
        assert_eq!(before, "alpha");
        assert_eq!(after, "beta");
    }

    #[test]
    fn context_missing_snippet_is_silent() {
        let (before, after) = extract_context("some unrelated text", "TARGET", 4);
        assert_eq!(before, "");
        assert_eq!(after, "");
    }

    #[test]
    fn context_at_document_edges() {
        let (before, after) = extract_context("TARGET tail words here", "TARGET", 2);
        assert_eq!(before, "");
        assert_eq!(after, "tail words");

        let (before, after) = extract_context("head words here TARGET", "TARGET", 2);
        assert_eq!(before, "words here");
        assert_eq!(after, "");
    }

    #[test]
    fn zero_words_disables_context() {
        let (before, after) = extract_context("a TARGET b", "TARGET", 0);
        assert_eq!(before, "");
        assert_eq!(after, "");
    }

    #[test]
    fn first_occurrence_wins() {
        let source = "x DUP y ... z DUP w";
        let (before, after) = extract_context(source, "DUP", 1);
        assert_eq!(before, "x");
        assert_eq!(after, "y");
    }
}
