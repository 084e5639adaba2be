//! PDF snippet extraction.
//!
//! Walks the pages of a PDF, captures the text closing each page, runs it
//! through the cleaning pipeline, and emits page references ready for marker
//! insertion. Reference HTML text, when given, drives word completion or
//! fuzzy window matching plus context extraction.

pub mod backend;
pub mod layout;

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

use crate::cleaner::{Edge, SnippetCleaner};
use crate::context::extract_context;
use crate::error::{Error, Result};
use crate::pdf::backend::{BackendChoice, PageBackend, open_backend};
use crate::pdf::layout::{drop_small_text, joined_text, lowest_block_text, reading_order};
use crate::refs::{PLACEHOLDER_SNIPPET, PageReference, SnippetMethod};
use crate::segment::WordSegmenter;

/// Where on the page the snippet is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Tail of the page's raw text.
    #[default]
    TailOfPage,
    /// Text of the visually lowest block; needs a layout-aware backend.
    LowestBlock,
    /// Head of the page's raw text.
    HeadOfPage,
}

/// Acceptance threshold for fuzzy reference windows.
const FUZZY_ACCEPT: f64 = 0.6;
/// A window this close is taken without scanning further.
const FUZZY_EARLY_EXIT: f64 = 0.95;

/// Raw material handed to the cleaner, in words per requested snippet word.
const RAW_WORD_FACTOR: usize = 3;
/// Raw material for segmentation, in chars per requested snippet word.
const RAW_CHAR_FACTOR: usize = 12;

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub backend: BackendChoice,
    pub strategy: Strategy,
    /// Target snippet length in words.
    pub snippet_words: usize,
    /// Pages yielding fewer words than this get a placeholder.
    pub min_words: usize,
    /// Reconstruct word boundaries with the dictionary segmenter.
    pub segment_words: bool,
    /// Dictionary language for segmentation.
    pub language: String,
    pub dictionary: Option<PathBuf>,
    /// Match snippets against reference text by edit distance instead of
    /// word completion.
    pub fuzzy_match: bool,
    /// Drop lines printed below `min_font_size` when layout is available.
    pub skip_footnotes: bool,
    pub min_font_size: f32,
    /// Two-column reading order; needs a layout-aware backend.
    pub two_column: bool,
    pub exclude_patterns: Vec<String>,
    pub default_excludes: bool,
    /// 1-based inclusive PDF page range.
    pub start_page: Option<usize>,
    pub end_page: Option<usize>,
    /// Added to the PDF page number to produce the book page label.
    pub page_offset: i64,
    /// Context words captured on each side of the snippet; 0 disables.
    pub context_words: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            backend: BackendChoice::default(),
            strategy: Strategy::default(),
            snippet_words: 10,
            min_words: 3,
            segment_words: false,
            language: "el".to_string(),
            dictionary: None,
            fuzzy_match: false,
            skip_footnotes: true,
            min_font_size: 8.5,
            two_column: false,
            exclude_patterns: Vec::new(),
            default_excludes: true,
            start_page: None,
            end_page: None,
            page_offset: 0,
            context_words: 4,
        }
    }
}

impl ExtractOptions {
    pub fn validate(&self) -> Result<()> {
        if !(1..=1000).contains(&self.snippet_words) {
            return Err(Error::InvalidParameter(format!(
                "snippet words must be between 1 and 1000, got {}",
                self.snippet_words
            )));
        }
        if self.min_words == 0 {
            return Err(Error::InvalidParameter(
                "minimum words must be at least 1".into(),
            ));
        }
        if self.min_words > self.snippet_words {
            return Err(Error::InvalidParameter(format!(
                "minimum words ({}) cannot exceed snippet words ({})",
                self.min_words, self.snippet_words
            )));
        }
        if !self.min_font_size.is_finite() || self.min_font_size <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "minimum font size must be positive, got {}",
                self.min_font_size
            )));
        }
        match (self.start_page, self.end_page) {
            (Some(0), _) | (_, Some(0)) => {
                return Err(Error::InvalidParameter("page numbers are 1-based".into()));
            }
            (Some(start), Some(end)) if start > end => {
                return Err(Error::InvalidParameter(format!(
                    "start page {start} is past end page {end}"
                )));
            }
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractStats {
    pub total_pages: usize,
    pub successful: usize,
    pub insufficient_text: usize,
    pub failed: usize,
}

/// Extract page references from a PDF file. `reference` is the flattened
/// text of the HTML rendition, when available.
pub fn extract_references(
    pdf: &Path,
    reference: Option<&str>,
    options: &ExtractOptions,
) -> Result<(Vec<PageReference>, ExtractStats)> {
    options.validate()?;
    let backend = open_backend(pdf, options.backend)?;
    extract_from_backend(backend.as_ref(), reference, options)
}

pub fn extract_from_backend(
    backend: &dyn PageBackend,
    reference: Option<&str>,
    options: &ExtractOptions,
) -> Result<(Vec<PageReference>, ExtractStats)> {
    options.validate()?;

    let cleaner = SnippetCleaner::new(&options.exclude_patterns, options.default_excludes)?;
    let segmenter = if options.segment_words {
        Some(WordSegmenter::load(
            &options.language,
            options.dictionary.as_deref(),
        )?)
    } else {
        None
    };

    let page_count = backend.page_count();
    let first = options.start_page.unwrap_or(1);
    let last = options.end_page.unwrap_or(page_count).min(page_count);

    let mut references = Vec::new();
    let mut stats = ExtractStats::default();

    for page_number in first..=last {
        stats.total_pages += 1;
        let label = page_number as i64 + options.page_offset;
        if label <= 0 {
            debug!("page {page_number}: label {label} not positive, skipping");
            continue;
        }
        let label = label.to_string();

        let raw = match page_material(backend, page_number - 1, options) {
            Ok(raw) => raw,
            Err(Error::MissingCapability(msg)) => return Err(Error::MissingCapability(msg)),
            Err(e) => {
                warn!("page {page_number}: {e}");
                stats.failed += 1;
                let mut entry = PageReference::new(label, PLACEHOLDER_SNIPPET);
                entry.note = Some("text extraction failed".to_string());
                references.push(entry);
                continue;
            }
        };

        let entry = build_entry(
            label,
            &raw,
            reference,
            &cleaner,
            segmenter.as_ref(),
            options,
            &mut stats,
        );
        references.push(entry);
    }

    info!(
        "extracted {} snippets from {} pages ({} thin, {} failed)",
        stats.successful, stats.total_pages, stats.insufficient_text, stats.failed
    );
    Ok((references, stats))
}

fn snippet_edge(strategy: Strategy) -> Edge {
    match strategy {
        Strategy::TailOfPage | Strategy::LowestBlock => Edge::Trailing,
        Strategy::HeadOfPage => Edge::Leading,
    }
}

/// Raw text for one page according to the strategy, trimmed to a workable
/// amount of material around the page edge.
fn page_material(
    backend: &dyn PageBackend,
    index: usize,
    options: &ExtractOptions,
) -> Result<String> {
    let layout = if options.two_column || options.skip_footnotes {
        backend.page_layout(index)?
    } else {
        None
    };

    if options.two_column && layout.is_none() {
        return Err(Error::MissingCapability(
            "two-column ordering needs a layout-aware backend".into(),
        ));
    }

    let text = match layout {
        Some(layout) => {
            let layout = if options.skip_footnotes {
                layout::PageLayout {
                    width: layout.width,
                    height: layout.height,
                    spans: drop_small_text(layout.spans, options.min_font_size),
                }
            } else {
                layout
            };
            if options.strategy == Strategy::LowestBlock {
                let ordered = reading_order(layout, options.two_column);
                return Ok(lowest_block_text(&ordered).unwrap_or_default());
            }
            joined_text(&reading_order(layout, options.two_column))
        }
        None => {
            if options.strategy == Strategy::LowestBlock {
                return Err(Error::MissingCapability(
                    "lowest-block capture needs a layout-aware backend".into(),
                ));
            }
            backend.page_text(index)?
        }
    };

    Ok(match options.strategy {
        Strategy::TailOfPage | Strategy::LowestBlock => {
            if options.segment_words {
                tail_chars(&text, options.snippet_words * RAW_CHAR_FACTOR)
            } else {
                tail_words(&text, options.snippet_words * RAW_WORD_FACTOR)
            }
        }
        Strategy::HeadOfPage => {
            if options.segment_words {
                head_chars(&text, options.snippet_words * RAW_CHAR_FACTOR)
            } else {
                head_words(&text, options.snippet_words * RAW_WORD_FACTOR)
            }
        }
    })
}

fn build_entry(
    label: String,
    raw: &str,
    reference: Option<&str>,
    cleaner: &SnippetCleaner,
    segmenter: Option<&WordSegmenter>,
    options: &ExtractOptions,
    stats: &mut ExtractStats,
) -> PageReference {
    let edge = snippet_edge(options.strategy);

    let mut entry = PageReference::new(label, "");
    if let Some(segmenter) = segmenter {
        let stripped = cleaner.strip_excluded(raw);
        let (segmented, confidence) = segmenter.segment_text(&stripped, options.snippet_words);
        entry.snippet = segmented;
        entry.confidence = Some(confidence);
        entry.method = Some(SnippetMethod::WordSegmentation);
    } else if options.fuzzy_match {
        let cleaned = cleaner.clean(raw, None, edge, options.snippet_words);
        let cleaned = clamp_words(&cleaned, options.snippet_words, edge);
        match reference.and_then(|r| fuzzy_reference_match(&cleaned, r, options.snippet_words)) {
            Some((window, confidence)) => {
                entry.snippet = window;
                entry.confidence = Some(confidence);
                entry.method = Some(SnippetMethod::HtmlMatch);
            }
            None => {
                entry.snippet = cleaned;
                entry.note = Some("no reference window above threshold".to_string());
            }
        }
    } else {
        let cleaned = cleaner.clean(raw, reference, edge, options.snippet_words);
        entry.snippet = clamp_words(&cleaned, options.snippet_words, edge);
        if reference.is_some() {
            entry.method = Some(SnippetMethod::HtmlMatch);
        }
    }

    let words = entry.snippet.split_whitespace().count();
    if words < options.min_words {
        debug!(
            "page {}: only {words} words extracted, leaving a placeholder",
            entry.page
        );
        stats.insufficient_text += 1;
        entry.note = Some(format!("insufficient text ({words} words)"));
        entry.snippet = PLACEHOLDER_SNIPPET.to_string();
        entry.confidence = None;
        entry.method = None;
        return entry;
    }

    if options.context_words > 0 {
        if let Some(reference) = reference {
            let (before, after) = extract_context(reference, &entry.snippet, options.context_words);
            if !before.is_empty() {
                entry.context_before = Some(before);
            }
            if !after.is_empty() {
                entry.context_after = Some(after);
            }
        }
    }

    stats.successful += 1;
    entry
}

/// Best `window_words`-word window of the reference by normalized edit
/// distance over space-stripped NFC text.
fn fuzzy_reference_match(
    snippet: &str,
    reference: &str,
    window_words: usize,
) -> Option<(String, f64)> {
    let target = compact(snippet);
    if target.is_empty() || window_words == 0 {
        return None;
    }
    let words: Vec<&str> = reference.split_whitespace().collect();
    if words.len() < window_words {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    for start in 0..=words.len() - window_words {
        let candidate = words[start..start + window_words].join(" ");
        let score = strsim::normalized_levenshtein(&compact(&candidate), &target);
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((start, score));
        }
        if score > FUZZY_EARLY_EXIT {
            break;
        }
    }

    let (start, score) = best?;
    (score >= FUZZY_ACCEPT).then(|| (words[start..start + window_words].join(" "), score))
}

fn compact(text: &str) -> String {
    text.nfc().filter(|c| !c.is_whitespace()).collect()
}

fn clamp_words(text: &str, max: usize, edge: Edge) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let kept = match edge {
        Edge::Trailing => &words[words.len().saturating_sub(max)..],
        Edge::Leading => &words[..max.min(words.len())],
    };
    kept.join(" ")
}

fn tail_words(text: &str, n: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    words[words.len().saturating_sub(n)..].join(" ")
}

fn head_words(text: &str, n: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    words[..n.min(words.len())].join(" ")
}

fn tail_chars(text: &str, n: usize) -> String {
    let trimmed = text.trim();
    let count = trimmed.chars().count();
    trimmed.chars().skip(count.saturating_sub(n)).collect()
}

fn head_chars(text: &str, n: usize) -> String {
    text.trim().chars().take(n).collect()
}
