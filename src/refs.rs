//! Page reference records: the JSON interchange between PDF extraction and
//! marker insertion, plus template generation and snippet-set validation.

use std::collections::HashMap;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Snippet placeholder written for pages that need manual entry.
pub const PLACEHOLDER_SNIPPET: &str = "PASTE_TEXT_FROM_END_OF_PAGE_HERE";

/// How a snippet was produced, recorded for manual review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnippetMethod {
    HtmlMatch,
    WordSegmentation,
}

/// One page boundary: the label to insert and the snippet locating it.
///
/// `snippet` may embed a single `|` pagebreak marker splitting it into the
/// text ending the page and the text opening the next one. Context fields
/// disambiguate snippets whose text occurs more than once in the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageReference {
    pub page: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<SnippetMethod>,
}

impl PageReference {
    pub fn new(page: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            snippet: snippet.into(),
            context_before: None,
            context_after: None,
            confidence: None,
            note: None,
            method: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.snippet == PLACEHOLDER_SNIPPET
    }
}

/// Ordering key for page labels: digit strings sort by numeric value and
/// come after everything else. Non-numeric labels (Roman numeral front
/// matter, arbitrary strings) count as 0 and order among themselves by the
/// label text.
pub fn page_sort_key(page: &str) -> (u64, String) {
    let numeric = if !page.is_empty() && page.chars().all(|c| c.is_ascii_digit()) {
        page.parse().unwrap_or(0)
    } else {
        0
    };
    (numeric, page.to_string())
}

/// Numeric value of a page label, if it is a plain digit string.
pub fn numeric_page(page: &str) -> Option<u64> {
    if !page.is_empty() && page.chars().all(|c| c.is_ascii_digit()) {
        page.parse().ok()
    } else {
        None
    }
}

pub fn load_references(path: &Path) -> Result<Vec<PageReference>> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_references(path: &Path, references: &[PageReference]) -> Result<()> {
    let content = serde_json::to_string_pretty(references).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, content).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Roman numerals for front matter templates.
const ROMAN_NUMERALS: [&str; 20] = [
    "i", "ii", "iii", "iv", "v", "vi", "vii", "viii", "ix", "x", "xi", "xii", "xiii", "xiv", "xv",
    "xvi", "xvii", "xviii", "xix", "xx",
];

/// Generate `num_pages` placeholder entries starting at `start_page`,
/// optionally labeled with Roman numerals (digits past xx, with a warning).
pub fn generate_template(num_pages: usize, start_page: usize, roman: bool) -> Vec<PageReference> {
    (0..num_pages)
        .map(|i| {
            let page_num = start_page + i;
            let label = if roman {
                match ROMAN_NUMERALS.get(page_num.wrapping_sub(1)) {
                    Some(numeral) => (*numeral).to_string(),
                    None => {
                        warn!("no Roman numeral defined for page {page_num}, using digits");
                        page_num.to_string()
                    }
                }
            } else {
                page_num.to_string()
            };
            PageReference::new(label, PLACEHOLDER_SNIPPET)
        })
        .collect()
}

/// Snippet-set quality report.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub total: usize,
    pub unique: usize,
    /// Snippet text -> occurrence count, for snippets appearing more than once.
    pub duplicates: HashMap<String, usize>,
    pub placeholders: usize,
    /// Pages whose snippet was not found verbatim in the HTML text.
    pub missing_from_html: Option<Vec<String>>,
    /// Fraction of non-placeholder snippets found verbatim.
    pub html_match_rate: Option<f64>,
}

/// Check references for duplicates and placeholders; with `html_text`, also
/// check which snippets occur verbatim in the document's flattened text.
pub fn validate_references(
    references: &[PageReference],
    html_text: Option<&str>,
) -> ValidationReport {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in references {
        *counts.entry(r.snippet.as_str()).or_insert(0) += 1;
    }

    let duplicates = counts
        .iter()
        .filter(|&(_, &count)| count > 1)
        .map(|(&text, &count)| (text.to_string(), count))
        .collect();

    let placeholders = references.iter().filter(|r| r.is_placeholder()).count();

    let mut report = ValidationReport {
        total: references.len(),
        unique: counts.len(),
        duplicates,
        placeholders,
        missing_from_html: None,
        html_match_rate: None,
    };

    if let Some(text) = html_text {
        let missing: Vec<String> = references
            .iter()
            .filter(|r| !r.is_placeholder() && !r.snippet.is_empty())
            .filter(|r| {
                // A `|` pagebreak marker never appears in the document text.
                let search = r.snippet.replace('|', " ").split_whitespace().collect::<Vec<_>>().join(" ");
                !text.contains(&search)
            })
            .map(|r| r.page.clone())
            .collect();

        let checked = references.len().saturating_sub(report.placeholders);
        report.html_match_rate = Some(if checked == 0 {
            1.0
        } else {
            (checked - missing.len()) as f64 / checked as f64
        });
        report.missing_from_html = Some(missing);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_keys_sort_numerics_after_front_matter() {
        let mut pages = vec!["10", "2", "iv", "1", "ii"];
        pages.sort_by_key(|p| page_sort_key(p));
        assert_eq!(pages, vec!["ii", "iv", "1", "2", "10"]);
    }

    #[test]
    fn numeric_page_parses_digits_only() {
        assert_eq!(numeric_page("42"), Some(42));
        assert_eq!(numeric_page("iv"), None);
        assert_eq!(numeric_page(""), None);
        assert_eq!(numeric_page("4a"), None);
    }

    #[test]
    fn template_roman_and_fallback() {
        let refs = generate_template(3, 19, true);
        assert_eq!(refs[0].page, "xix");
        assert_eq!(refs[1].page, "xx");
        assert_eq!(refs[2].page, "21");
        assert!(refs.iter().all(|r| r.is_placeholder()));
    }

    #[test]
    fn template_digits() {
        let refs = generate_template(2, 11, false);
        assert_eq!(refs[0].page, "11");
        assert_eq!(refs[1].page, "12");
    }

    #[test]
    fn validation_counts() {
        let refs = vec![
            PageReference::new("1", "alpha beta"),
            PageReference::new("2", "alpha beta"),
            PageReference::new("3", PLACEHOLDER_SNIPPET),
            PageReference::new("4", "gamma delta"),
        ];
        let report = validate_references(&refs, None);
        assert_eq!(report.total, 4);
        assert_eq!(report.unique, 3);
        assert_eq!(report.placeholders, 1);
        assert_eq!(report.duplicates.get("alpha beta"), Some(&2));
    }

    #[test]
    fn validation_against_html_text() {
        let refs = vec![
            PageReference::new("1", "present text"),
            PageReference::new("2", "absent text"),
            PageReference::new("3", PLACEHOLDER_SNIPPET),
        ];
        let report = validate_references(&refs, Some("some present text here"));
        assert_eq!(report.missing_from_html.as_deref(), Some(&["2".to_string()][..]));
        assert_eq!(report.html_match_rate, Some(0.5));
    }

    #[test]
    fn reference_json_round_trip() {
        let mut r = PageReference::new("12", "end of page|start of next");
        r.context_before = Some("words before".into());
        r.confidence = Some(0.91);
        r.method = Some(SnippetMethod::WordSegmentation);

        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"word_segmentation\""));
        let back: PageReference = serde_json::from_str(&json).unwrap();
        assert_eq!(back.page, "12");
        assert_eq!(back.snippet, "end of page|start of next");
        assert_eq!(back.context_before.as_deref(), Some("words before"));
        assert!(back.context_after.is_none());
    }

    #[test]
    fn minimal_json_entry_parses() {
        let refs: Vec<PageReference> =
            serde_json::from_str(r#"[{"page": "1", "snippet": "text"}]"#).unwrap();
        assert_eq!(refs.len(), 1);
        assert!(refs[0].note.is_none());
    }
}
