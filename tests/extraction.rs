//! Extraction pipeline scenarios: fake page backends through cleaning,
//! reference repair, JSON round trip, and on into marker insertion.

use pagemark::pdf::backend::PageBackend;
use pagemark::pdf::layout::PageLayout;
use pagemark::pdf::{ExtractOptions, extract_from_backend};
use pagemark::{
    HtmlDocument, InsertOptions, Result, load_references, mark_html, save_references,
    validate_references,
};

struct FakePdf(Vec<&'static str>);

impl PageBackend for FakePdf {
    fn page_count(&self) -> usize {
        self.0.len()
    }
    fn page_text(&self, index: usize) -> Result<String> {
        Ok(self.0[index].to_string())
    }
    fn page_layout(&self, _index: usize) -> Result<Option<PageLayout>> {
        Ok(None)
    }
}

fn options(words: usize) -> ExtractOptions {
    ExtractOptions {
        snippet_words: words,
        min_words: 2,
        ..ExtractOptions::default()
    }
}

#[test]
fn extracted_snippets_mark_the_html_rendition() {
    let html = "<html><body>\
        <p>The voyage began in calm waters and the crew settled into routine.</p>\
        <p>By the third week the supplies ran low and tempers ran lower.</p>\
        <p>Land appeared at dawn on the fortieth day to great relief.</p>\
        </body></html>";
    let reference = HtmlDocument::parse(html).unwrap().text();

    // PDF pages end where the HTML paragraphs end
    let pdf = FakePdf(vec![
        "The voyage began in calm waters and the crew settled into routine.",
        "By the third week the supplies ran low and tempers ran lower.",
    ]);
    let (refs, stats) =
        extract_from_backend(&pdf, Some(&reference), &options(5)).unwrap();
    assert_eq!(stats.successful, 2);

    let (out, report) = mark_html(
        html,
        &refs,
        &InsertOptions {
            inject_css: false,
            ..InsertOptions::default()
        },
    )
    .unwrap();
    assert_eq!(report.stats.found, 2);
    let p1 = out.find("aria-label=\"Page 1\"").unwrap();
    let p2 = out.find("aria-label=\"Page 2\"").unwrap();
    assert!(p1 < p2);
}

#[test]
fn production_metadata_stripped_before_matching() {
    let pdf = FakePdf(vec![
        "and the chapter closed on that thought. 04_Ch01.indd 17 5/12/21 10:45 AM",
    ]);
    let (refs, _) = extract_from_backend(&pdf, None, &options(6)).unwrap();
    assert_eq!(refs[0].snippet, "the chapter closed on that thought.");
    assert!(!refs[0].snippet.contains("indd"));
}

#[test]
fn hyphenation_repaired_across_line_breaks() {
    let pdf = FakePdf(vec!["the meeting was post- poned until further notice"]);
    let (refs, _) = extract_from_backend(&pdf, None, &options(6)).unwrap();
    assert!(refs[0].snippet.contains("postponed"));
}

#[test]
fn truncated_edge_word_completed_from_reference() {
    let html = "<html><body><p>the committee reached its decision after lengthy deliberation that evening</p></body></html>";
    let reference = HtmlDocument::parse(html).unwrap().text();
    let pdf = FakePdf(vec!["reached its decision after lengthy delibera"]);
    let (refs, _) = extract_from_backend(&pdf, Some(&reference), &options(5)).unwrap();
    assert_eq!(refs[0].snippet, "its decision after lengthy deliberation");
}

#[test]
fn contexts_travel_with_the_snippet() {
    let html = "<html><body><p>alpha beta gamma delta epsilon zeta eta theta iota kappa</p></body></html>";
    let reference = HtmlDocument::parse(html).unwrap().text();
    let pdf = FakePdf(vec!["gamma delta epsilon zeta"]);
    let opts = ExtractOptions {
        context_words: 2,
        ..options(4)
    };
    let (refs, _) = extract_from_backend(&pdf, Some(&reference), &opts).unwrap();
    assert_eq!(refs[0].context_before.as_deref(), Some("alpha beta"));
    assert_eq!(refs[0].context_after.as_deref(), Some("eta theta"));
}

#[test]
fn json_round_trip_through_disk() {
    let pdf = FakePdf(vec![
        "first page closes with these words",
        "second page closes with other words",
    ]);
    let (refs, _) = extract_from_backend(&pdf, None, &options(4)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pages.json");
    save_references(&path, &refs).unwrap();
    let loaded = load_references(&path).unwrap();

    assert_eq!(loaded.len(), refs.len());
    assert_eq!(loaded[0].page, refs[0].page);
    assert_eq!(loaded[0].snippet, refs[0].snippet);
}

#[test]
fn validation_flags_extraction_gaps() {
    let pdf = FakePdf(vec!["plenty of words on this page", "x"]);
    let (refs, stats) = extract_from_backend(&pdf, None, &options(4)).unwrap();
    assert_eq!(stats.insufficient_text, 1);

    let report = validate_references(&refs, None);
    assert_eq!(report.total, 2);
    assert_eq!(report.placeholders, 1);
}

#[test]
fn validation_against_rendition_text() {
    let html = "<html><body><p>only this sentence exists in the book</p></body></html>";
    let text = HtmlDocument::parse(html).unwrap().text();
    let pdf = FakePdf(vec![
        "only this sentence exists in the book",
        "a page of entirely unrelated material",
    ]);
    let (refs, _) = extract_from_backend(&pdf, None, &options(5)).unwrap();

    let report = validate_references(&refs, Some(&text));
    let missing = report.missing_from_html.unwrap();
    assert_eq!(missing, vec!["2".to_string()]);
}
