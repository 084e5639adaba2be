//! Snippet resolution: find where a page-boundary snippet falls in the
//! document's container text.
//!
//! Snippets travel with the page they close. A `|` inside the snippet marks
//! the exact break; without one the break sits at the snippet's end. Search
//! is whitespace-flexible and moves strictly forward through the document,
//! so each resolved page advances a cursor that later pages cannot precede.

use regex::Regex;

use crate::error::{Error, Result};
use crate::html::HtmlDocument;
use crate::normalize::{jaccard_similarity, normalize_word};

/// Forward-only position in the container sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub container_index: usize,
    pub position: usize,
}

/// A resolved break point: byte offset into the flattened text of one
/// container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub container_index: usize,
    pub offset: usize,
}

/// How a snippet was pinned to its location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// Exactly one occurrence past the cursor.
    Unique(Location),
    /// Several occurrences, contexts picked one.
    ContextChosen { location: Location, score: f64 },
    /// Several occurrences, contexts scored below threshold; first taken.
    ContextFallback(Location),
    /// Several occurrences and no contexts to choose by; first taken.
    FirstOfMany(Location),
    NotFound,
}

impl Resolution {
    pub fn location(&self) -> Option<Location> {
        match *self {
            Resolution::Unique(loc)
            | Resolution::ContextChosen { location: loc, .. }
            | Resolution::ContextFallback(loc)
            | Resolution::FirstOfMany(loc) => Some(loc),
            Resolution::NotFound => None,
        }
    }
}

/// Disambiguation knobs. The after-context weighs heavier than the before
/// because text opening the next page is the stronger signal for a break.
#[derive(Debug, Clone, Copy)]
pub struct MatchTuning {
    pub before_weight: f64,
    pub after_weight: f64,
    pub accept_threshold: f64,
    pub context_words: usize,
}

impl Default for MatchTuning {
    fn default() -> Self {
        MatchTuning {
            before_weight: 0.4,
            after_weight: 0.6,
            accept_threshold: 0.3,
            context_words: 4,
        }
    }
}

struct Candidate {
    location: Location,
    match_start: usize,
    match_end: usize,
}

pub struct Locator<'a> {
    doc: &'a HtmlDocument,
    pub tuning: MatchTuning,
}

impl<'a> Locator<'a> {
    pub fn new(doc: &'a HtmlDocument) -> Self {
        Locator {
            doc,
            tuning: MatchTuning::default(),
        }
    }

    /// Resolve `snippet` to a break location at or past `cursor`.
    pub fn resolve(
        &self,
        snippet: &str,
        context_before: Option<&str>,
        context_after: Option<&str>,
        cursor: Cursor,
    ) -> Result<Resolution> {
        let Some(pattern) = SnippetPattern::build(snippet)? else {
            return Ok(Resolution::NotFound);
        };

        let candidates = self.find_candidates(&pattern, cursor);
        match candidates.len() {
            0 => Ok(Resolution::NotFound),
            1 => Ok(Resolution::Unique(candidates[0].location)),
            _ => Ok(self.disambiguate(&candidates, context_before, context_after)),
        }
    }

    fn find_candidates(&self, pattern: &SnippetPattern, cursor: Cursor) -> Vec<Candidate> {
        let mut out = Vec::new();
        for (index, container) in self
            .doc
            .containers()
            .iter()
            .enumerate()
            .skip(cursor.container_index)
        {
            for caps in pattern.regex.captures_iter(&container.text) {
                let Some(whole) = caps.get(0) else { continue };
                if index == cursor.container_index && whole.start() < cursor.position {
                    continue;
                }
                let break_offset = match pattern.break_at_head_end {
                    true => caps.get(1).map_or(whole.end(), |head| head.end()),
                    false => whole.start(),
                };
                out.push(Candidate {
                    location: Location {
                        container_index: index,
                        offset: break_offset,
                    },
                    match_start: whole.start(),
                    match_end: whole.end(),
                });
            }
        }
        out
    }

    fn disambiguate(
        &self,
        candidates: &[Candidate],
        context_before: Option<&str>,
        context_after: Option<&str>,
    ) -> Resolution {
        let before_words = context_words(context_before);
        let after_words = context_words(context_after);
        if before_words.is_empty() && after_words.is_empty() {
            return Resolution::FirstOfMany(candidates[0].location);
        }

        let mut best: Option<(usize, f64)> = None;
        for (i, candidate) in candidates.iter().enumerate() {
            let score = self.score(candidate, &before_words, &after_words);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((i, score));
            }
        }
        // non-empty candidate list, best is always set
        let (index, score) = best.unwrap_or((0, 0.0));
        if score >= self.tuning.accept_threshold {
            Resolution::ContextChosen {
                location: candidates[index].location,
                score,
            }
        } else {
            Resolution::ContextFallback(candidates[0].location)
        }
    }

    /// Weighted Jaccard of the reference contexts against the words
    /// surrounding the candidate in its container. Weights renormalize when
    /// only one side of context is available.
    fn score(&self, candidate: &Candidate, before: &[String], after: &[String]) -> f64 {
        let text = &self.doc.containers()[candidate.location.container_index].text;
        let n = self.tuning.context_words;

        let mut score = 0.0;
        let mut weight = 0.0;
        if !before.is_empty() {
            let local: Vec<String> = text[..candidate.match_start]
                .split_whitespace()
                .rev()
                .take(n)
                .map(normalize_word)
                .collect();
            score += self.tuning.before_weight * jaccard_similarity(before, &local);
            weight += self.tuning.before_weight;
        }
        if !after.is_empty() {
            let local: Vec<String> = text[candidate.match_end..]
                .split_whitespace()
                .take(n)
                .map(normalize_word)
                .collect();
            score += self.tuning.after_weight * jaccard_similarity(after, &local);
            weight += self.tuning.after_weight;
        }
        if weight > 0.0 { score / weight * (self.tuning.before_weight + self.tuning.after_weight) } else { 0.0 }
    }
}

fn context_words(context: Option<&str>) -> Vec<String> {
    context
        .map(|c| c.split_whitespace().map(normalize_word).collect())
        .unwrap_or_default()
}

struct SnippetPattern {
    regex: Regex,
    /// Break falls at the end of capture group 1 (the text closing the
    /// page); false means the break precedes the whole match.
    break_at_head_end: bool,
}

impl SnippetPattern {
    /// Compile a snippet into a whitespace-flexible regex. Returns `None`
    /// for snippets with no words at all.
    fn build(snippet: &str) -> Result<Option<SnippetPattern>> {
        let (head, tail) = match snippet.split_once('|') {
            Some((head, tail)) => (head, tail),
            None => (snippet, ""),
        };
        let head_pat = words_pattern(head);
        let tail_pat = words_pattern(tail);

        let (source, break_at_head_end) = match (head_pat, tail_pat) {
            (None, None) => return Ok(None),
            (Some(h), None) => (format!("({h})"), true),
            (None, Some(t)) => (t, false),
            (Some(h), Some(t)) => (format!("({h})\\s+{t}"), true),
        };
        let regex = Regex::new(&source)
            .map_err(|e| Error::InvalidParameter(format!("unusable snippet: {e}")))?;
        Ok(Some(SnippetPattern {
            regex,
            break_at_head_end,
        }))
    }
}

fn words_pattern(text: &str) -> Option<String> {
    let words: Vec<String> = text.split_whitespace().map(|w| regex::escape(w)).collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join("\\s+"))
    }
}
