//! Snippet cleaning: ordered, independently testable string transforms that
//! repair PDF text-extraction artifacts before a snippet is matched against
//! HTML.
//!
//! Steps, applied in order when a reference text is available: strip
//! production metadata, rejoin line-break hyphenation, trim to a sentence
//! boundary, complete a partial edge word against the reference, and as a
//! last resort re-derive the snippet from an anchor run found in the
//! reference.

use regex::{Regex, RegexBuilder};

use crate::error::{Error, Result};

/// Suffix appended to a hyphen-marked fragment that could not be completed.
/// Explicit and greppable so a human can fix the entry by hand.
pub const MANUAL_REVIEW_MARKER: &str = "[?]";

/// Which end of the page the snippet was taken from. Trailing for end-of-page
/// extraction, leading for beginning-of-page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Trailing,
    Leading,
}

/// Sentence-terminal boundaries recognized when trimming. The `· ` entry is
/// the Greek ano teleia.
const BOUNDARIES: [&str; 4] = [". ", "; ", ": ", "\u{0387} "];
const TERMINALS: [char; 4] = ['.', ';', ':', '\u{0387}'];

pub struct SnippetCleaner {
    exclusions: Vec<Regex>,
    multi_space: Regex,
    line_hyphen: Regex,
}

impl SnippetCleaner {
    /// Build a cleaner from the union of the default production-metadata
    /// patterns (InDesign sluglines, timestamps) and user-supplied patterns.
    /// All patterns match case-insensitively.
    pub fn new(user_patterns: &[String], use_defaults: bool) -> Result<Self> {
        let mut patterns: Vec<String> = Vec::new();
        if use_defaults {
            // "<name>.indd <number>" sluglines and "D/M/YY H:MM AM|PM" stamps
            patterns.push(r"\S+\.indd\s+\d+".to_string());
            patterns.push(r"\d{1,2}/\d{1,2}/\d{2,4}\s+\d{1,2}:\d{2}\s*[AP]M".to_string());
        }
        patterns.extend(user_patterns.iter().cloned());

        let mut exclusions = Vec::with_capacity(patterns.len());
        for pattern in &patterns {
            let re = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    Error::InvalidParameter(format!("bad exclusion pattern '{pattern}': {e}"))
                })?;
            exclusions.push(re);
        }

        Ok(Self {
            exclusions,
            multi_space: Regex::new(r"\s+").expect("whitespace regex"),
            line_hyphen: Regex::new(r"(\p{L})-\s+(\p{L})").expect("hyphenation regex"),
        })
    }

    /// Remove every exclusion-pattern match and collapse whitespace.
    pub fn strip_excluded(&self, text: &str) -> String {
        let mut cleaned = text.to_string();
        for re in &self.exclusions {
            cleaned = re.replace_all(&cleaned, "").into_owned();
        }
        self.multi_space.replace_all(&cleaned, " ").trim().to_string()
    }

    /// Rejoin words hyphenated across PDF line breaks:
    /// `<letter>-<whitespace><letter>` becomes `<letter><letter>`.
    pub fn dehyphenate(&self, text: &str) -> String {
        self.line_hyphen.replace_all(text, "$1$2").into_owned()
    }

    /// Trim the snippet to a natural sentence boundary.
    ///
    /// Trailing edge: keep verbatim if the snippet already ends in terminal
    /// punctuation; otherwise cut after the last `<terminal><space>` boundary
    /// that retains at least one third of the snippet; with no such boundary,
    /// keep the snippet untrimmed (cutting text is worse than trailing junk).
    /// Leading edge: keep as-is when the first character is alphabetic, else
    /// advance to the first alphabetic character.
    pub fn trim_to_boundary(&self, text: &str, edge: Edge) -> String {
        let trimmed = text.trim();
        match edge {
            Edge::Trailing => {
                if trimmed
                    .chars()
                    .last()
                    .is_some_and(|c| TERMINALS.contains(&c))
                {
                    return trimmed.to_string();
                }

                let min_keep = trimmed.len() / 3;
                let cut = BOUNDARIES
                    .iter()
                    .filter_map(|b| trimmed.rfind(b).map(|pos| pos + b.len() - 1))
                    .max();
                match cut {
                    Some(end) if end >= min_keep => trimmed[..end].trim_end().to_string(),
                    _ => trimmed.to_string(),
                }
            }
            Edge::Leading => {
                if trimmed.chars().next().is_some_and(|c| c.is_alphabetic()) {
                    trimmed.to_string()
                } else {
                    match trimmed.char_indices().find(|(_, c)| c.is_alphabetic()) {
                        Some((idx, _)) => trimmed[idx..].to_string(),
                        None => trimmed.to_string(),
                    }
                }
            }
        }
    }

    /// Complete a partial edge word against the reference text.
    ///
    /// A fragment that already occurs in the reference as a whole word is left
    /// alone. Otherwise the reference is searched for the fragment stem
    /// anchored by one or two preceding snippet words; failing that, the first
    /// whole word starting with the stem anywhere. Hyphen-marked fragments
    /// that cannot be completed get [`MANUAL_REVIEW_MARKER`] appended; plain
    /// fragments are left untouched — deleting text is worse than an
    /// imperfect match.
    pub fn complete_edge_word(&self, snippet: &str, reference: &str, edge: Edge) -> String {
        let words: Vec<&str> = snippet.split_whitespace().collect();
        if words.is_empty() {
            return snippet.to_string();
        }

        let (frag_idx, fragment) = match edge {
            Edge::Trailing => (words.len() - 1, words[words.len() - 1]),
            Edge::Leading => (0, words[0]),
        };

        let hyphen_marked = fragment.ends_with('-') || fragment.ends_with('\u{2010}');
        let stem = fragment.trim_end_matches(['-', '\u{2010}']);
        if stem.is_empty() {
            return snippet.to_string();
        }

        if self.is_whole_word(stem, reference) {
            if hyphen_marked {
                // The hyphen was spurious; the stem is the full word.
                return Self::replace_word(&words, frag_idx, stem);
            }
            return snippet.to_string();
        }

        // Anchor on up to two preceding words, longest anchor first.
        let escaped_stem = regex::escape(stem);
        let anchors: Vec<String> = match edge {
            Edge::Trailing => {
                let mut a = Vec::new();
                if frag_idx >= 2 {
                    a.push(format!(
                        r"{}\s+{}\s+{}(\p{{L}}*)",
                        regex::escape(words[frag_idx - 2]),
                        regex::escape(words[frag_idx - 1]),
                        escaped_stem
                    ));
                }
                if frag_idx >= 1 {
                    a.push(format!(
                        r"{}\s+{}(\p{{L}}*)",
                        regex::escape(words[frag_idx - 1]),
                        escaped_stem
                    ));
                }
                a
            }
            Edge::Leading => {
                // A leading fragment is the tail of a word cut at the page
                // start; the missing letters precede the stem and the
                // disambiguating context follows it.
                let mut a = Vec::new();
                if words.len() > 2 {
                    a.push(format!(
                        r"(\p{{L}}+){}\s+{}\s+{}",
                        escaped_stem,
                        regex::escape(words[1]),
                        regex::escape(words[2])
                    ));
                }
                if words.len() > 1 {
                    a.push(format!(
                        r"(\p{{L}}+){}\s+{}",
                        escaped_stem,
                        regex::escape(words[1])
                    ));
                }
                a
            }
        };

        for pattern in anchors {
            if let Ok(re) = Regex::new(&pattern) {
                if let Some(caps) = re.captures(reference) {
                    let completion = &caps[1];
                    if !completion.is_empty() {
                        let whole = match edge {
                            Edge::Trailing => format!("{stem}{completion}"),
                            Edge::Leading => format!("{completion}{stem}"),
                        };
                        return Self::replace_word(&words, frag_idx, &whole);
                    }
                }
            }
        }

        // No contextual match — first word containing the stem at its edge.
        let loose = match edge {
            Edge::Trailing => format!(r"\b{escaped_stem}(\p{{L}}+)"),
            Edge::Leading => format!(r"\b(\p{{L}}+){escaped_stem}\b"),
        };
        if let Ok(re) = Regex::new(&loose) {
            if let Some(caps) = re.captures(reference) {
                let whole = match edge {
                    Edge::Trailing => format!("{stem}{}", &caps[1]),
                    Edge::Leading => format!("{}{stem}", &caps[1]),
                };
                return Self::replace_word(&words, frag_idx, &whole);
            }
        }

        if hyphen_marked {
            return Self::replace_word(&words, frag_idx, &format!("{fragment}{MANUAL_REVIEW_MARKER}"));
        }

        snippet.to_string()
    }

    /// Re-derive a snippet that does not occur literally in the reference.
    ///
    /// Scans the snippet's words for a contiguous run of four (falling back to
    /// three) that appears verbatim in the reference, then rebuilds the
    /// snippet as the `target_words`-word reference window that ends where the
    /// snippet ends relative to the anchor. Recovers snippets where the PDF
    /// text layer merged two words into one. Returns `None` when no anchor run
    /// is found.
    pub fn anchor_correct(
        &self,
        snippet: &str,
        reference: &str,
        target_words: usize,
    ) -> Option<String> {
        let snippet_words: Vec<&str> = snippet.split_whitespace().collect();
        let ref_words: Vec<&str> = reference.split_whitespace().collect();
        if target_words == 0 || ref_words.is_empty() {
            return None;
        }

        for run_len in [4usize, 3] {
            if snippet_words.len() < run_len {
                continue;
            }
            for start in 0..=snippet_words.len() - run_len {
                let run = snippet_words[start..start + run_len].join(" ");
                let Some(pos) = reference.find(&run) else {
                    continue;
                };

                let anchor_word_idx = reference[..pos].split_whitespace().count();
                let words_after_anchor = snippet_words.len() - (start + run_len);
                let end = (anchor_word_idx + run_len + words_after_anchor).min(ref_words.len());
                let window_start = end.saturating_sub(target_words);
                return Some(ref_words[window_start..end].join(" "));
            }
        }

        None
    }

    /// Full pipeline for one raw PDF snippet. `reference` enables the
    /// completion and anchor-correction steps.
    pub fn clean(
        &self,
        raw: &str,
        reference: Option<&str>,
        edge: Edge,
        target_words: usize,
    ) -> String {
        let stripped = self.strip_excluded(raw);
        let rejoined = self.dehyphenate(&stripped);
        let trimmed = self.trim_to_boundary(&rejoined, edge);

        let Some(reference) = reference else {
            return trimmed;
        };

        let completed = self.complete_edge_word(&trimmed, reference, edge);
        if reference.contains(&completed) {
            return completed;
        }

        self.anchor_correct(&completed, reference, target_words)
            .unwrap_or(completed)
    }

    fn is_whole_word(&self, word: &str, reference: &str) -> bool {
        Regex::new(&format!(r"\b{}\b", regex::escape(word)))
            .is_ok_and(|re| re.is_match(reference))
    }

    fn replace_word(words: &[&str], idx: usize, replacement: &str) -> String {
        let mut out: Vec<&str> = words.to_vec();
        out[idx] = replacement;
        out.join(" ")
    }
}
