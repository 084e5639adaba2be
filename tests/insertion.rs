//! End-to-end marker insertion over synthetic book HTML.

use pagemark::{HtmlDocument, InsertOptions, PageReference, mark_html};

fn book_html() -> String {
    let mut body = String::new();
    body.push_str("<p>It was the best of times, it was the worst of times, it was the age of wisdom.</p>");
    body.push_str("<p>There were a king with a large jaw and a queen with a plain face, on the throne of England.</p>");
    body.push_str("<p>It was the year of Our Lord one thousand seven hundred and seventy-five.</p>");
    body.push_str("<p>Spiritual revelations were conceded to England at that favoured period.</p>");
    format!("<html><head><title>t</title></head><body>{body}</body></html>")
}

fn no_css() -> InsertOptions {
    InsertOptions {
        inject_css: false,
        ..InsertOptions::default()
    }
}

fn reference(page: &str, snippet: &str) -> PageReference {
    PageReference::new(page, snippet)
}

#[test]
fn markers_inserted_in_ascending_page_order() {
    let refs = vec![
        reference("3", "seven hundred and seventy-five.|Spiritual"),
        reference("1", "the age of wisdom.|There were"),
        reference("2", "throne of England.|It was the year"),
    ];
    let (out, report) = mark_html(&book_html(), &refs, &no_css()).unwrap();
    assert_eq!(report.stats.found, 3);
    assert_eq!(report.stats.not_found, 0);

    let positions: Vec<usize> = ["1", "2", "3"]
        .iter()
        .map(|p| out.find(&format!("aria-label=\"Page {p}\"")).unwrap())
        .collect();
    assert!(positions[0] < positions[1]);
    assert!(positions[1] < positions[2]);
}

#[test]
fn break_marker_splits_between_pages() {
    let refs = vec![reference("1", "the age of wisdom.|There were")];
    let (out, _) = mark_html(&book_html(), &refs, &no_css()).unwrap();
    // marker sits after the text closing page 1, before the next paragraph
    let marker = out.find("aria-label=\"Page 1\"").unwrap();
    let closing = out.find("the age of wisdom.").unwrap();
    let opening = out.find("There were a king").unwrap();
    assert!(closing < marker);
    assert!(marker < opening);
}

#[test]
fn snippet_without_break_marks_its_end() {
    let refs = vec![reference("1", "best of times")];
    let (out, _) = mark_html(&book_html(), &refs, &no_css()).unwrap();
    let marker = out.find("<span").unwrap();
    assert!(out.find("best of times").unwrap() < marker);
    assert!(marker < out.find(", it was the worst").unwrap());
}

#[test]
fn document_text_survives_marking() {
    let refs = vec![
        reference("1", "the age of wisdom."),
        reference("2", "throne of England."),
    ];
    let (out, _) = mark_html(&book_html(), &refs, &no_css()).unwrap();
    let original = HtmlDocument::parse(&book_html()).unwrap().text();
    let marked = HtmlDocument::parse(&out).unwrap().text();
    assert_eq!(original, marked);
}

#[test]
fn roman_front_matter_precedes_numeric_pages() {
    let refs = vec![
        reference("2", "throne of England."),
        reference("ix", "best of times,"),
    ];
    let (out, report) = mark_html(&book_html(), &refs, &no_css()).unwrap();
    assert_eq!(report.stats.found, 2);
    let roman = out.find("aria-label=\"Page ix\"").unwrap();
    let numeric = out.find("aria-label=\"Page 2\"").unwrap();
    assert!(roman < numeric);
}

#[test]
fn repeated_phrase_disambiguated_by_context() {
    let html = "<html><body>\
        <p>The captain said nothing more that day and went below deck quietly.</p>\
        <p>The mate said nothing more that day and wrote the log entry instead.</p>\
        </body></html>";
    let mut r = PageReference::new("7", "nothing more that day");
    r.context_before = Some("The mate said".into());
    r.context_after = Some("and wrote the log".into());
    let (out, report) = mark_html(html, &[r], &no_css()).unwrap();
    assert_eq!(report.stats.context_used, 1);
    let marker = out.find("aria-label=\"Page 7\"").unwrap();
    let second = out.find("The mate said").unwrap();
    assert!(marker > second);
}

#[test]
fn unmatched_pages_reported_not_fatal() {
    let refs = vec![
        reference("1", "best of times"),
        reference("2", "this text appears nowhere at all"),
        reference("3", "favoured period."),
    ];
    let (out, report) = mark_html(&book_html(), &refs, &no_css()).unwrap();
    assert_eq!(report.stats.found, 2);
    assert_eq!(report.stats.not_found, 1);
    assert_eq!(report.failures[0].page, "2");
    assert!(out.contains("aria-label=\"Page 3\""));
}

#[test]
fn css_rule_injected_on_request() {
    let refs = vec![reference("1", "best of times")];
    let options = InsertOptions::default();
    let (out, _) = mark_html(&book_html(), &refs, &options).unwrap();
    assert!(out.contains("span.page-number"));
    let style = out.find("span.page-number {").unwrap();
    let head_end = out.find("</head>").unwrap();
    assert!(style < head_end);
}

#[test]
fn marking_twice_does_not_duplicate_matches() {
    // markers from the first pass are invisible to the second pass's text
    let refs = vec![reference("1", "the age of wisdom.|There were")];
    let (first, _) = mark_html(&book_html(), &refs, &no_css()).unwrap();
    let refs2 = vec![reference("2", "throne of England.")];
    let (second, report) = mark_html(&first, &refs2, &no_css()).unwrap();
    assert_eq!(report.stats.found, 1);
    assert!(second.contains("aria-label=\"Page 1\""));
    assert!(second.contains("aria-label=\"Page 2\""));
}

#[test]
fn whitespace_variations_between_snippet_and_html() {
    let html = "<html><body><p>words that\n        wrap across\n        source lines</p></body></html>";
    let refs = vec![reference("1", "that wrap across")];
    let (_, report) = mark_html(html, &refs, &no_css()).unwrap();
    assert_eq!(report.stats.found, 1);
}

#[test]
fn snippet_spanning_inline_elements() {
    let html = "<html><body><p>an <em>emphasised</em> phrase in flowing text</p></body></html>";
    let refs = vec![reference("1", "emphasised phrase in")];
    let (out, report) = mark_html(html, &refs, &no_css()).unwrap();
    assert_eq!(report.stats.found, 1);
    assert!(out.contains("aria-label=\"Page 1\""));
}
