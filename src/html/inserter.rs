//! Marker insertion orchestrator.
//!
//! Walks the page references in page order, resolves each snippet through
//! the locator, splices a marker span at the resolved break, and finishes
//! with a repair pass that removes numeric markers the fallback matching
//! left out of document order.

use log::{debug, info, warn};

use crate::error::Result;
use crate::html::locator::{Cursor, Locator, MatchTuning, Resolution};
use crate::html::{DEFAULT_MARKER_CSS, HtmlDocument, marker_label, remove_marker};
use crate::refs::{PageReference, numeric_page, page_sort_key};

#[derive(Debug, Clone)]
pub struct InsertOptions {
    pub tuning: MatchTuning,
    /// Inject the default marker stylesheet into `<head>`.
    pub inject_css: bool,
    /// Remove numeric markers that ended up behind a higher-numbered one.
    pub repair_out_of_order: bool,
}

impl Default for InsertOptions {
    fn default() -> Self {
        InsertOptions {
            tuning: MatchTuning::default(),
            inject_css: true,
            repair_out_of_order: true,
        }
    }
}

/// Counters for one insertion run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InsertStats {
    pub found: usize,
    pub not_found: usize,
    /// Resolved by taking the first of several occurrences, no context given.
    pub multiple_matches: usize,
    /// Resolved by context scoring.
    pub context_used: usize,
    /// Contexts given but inconclusive, first occurrence taken.
    pub context_fallback: usize,
    pub placeholders_skipped: usize,
    pub out_of_order_removed: usize,
}

/// A page whose snippet could not be located.
#[derive(Debug, Clone)]
pub struct InsertFailure {
    pub page: String,
    pub snippet: String,
}

#[derive(Debug, Default)]
pub struct InsertReport {
    pub stats: InsertStats,
    pub failures: Vec<InsertFailure>,
}

/// Insert markers for every reference into `doc`.
pub fn insert_markers(
    doc: &HtmlDocument,
    references: &[PageReference],
    options: &InsertOptions,
) -> Result<InsertReport> {
    let mut ordered: Vec<&PageReference> = references.iter().collect();
    ordered.sort_by_key(|r| page_sort_key(&r.page));

    let mut locator = Locator::new(doc);
    locator.tuning = options.tuning;
    let mut report = InsertReport::default();
    let mut cursor = Cursor::default();

    for reference in ordered {
        if reference.is_placeholder() || reference.snippet.trim().is_empty() {
            debug!("page {}: placeholder snippet, skipping", reference.page);
            report.stats.placeholders_skipped += 1;
            continue;
        }

        let resolution = locator.resolve(
            &reference.snippet,
            reference.context_before.as_deref(),
            reference.context_after.as_deref(),
            cursor,
        )?;

        match resolution {
            Resolution::Unique(_) => report.stats.found += 1,
            Resolution::ContextChosen { score, .. } => {
                debug!("page {}: context score {score:.2}", reference.page);
                report.stats.found += 1;
                report.stats.context_used += 1;
            }
            Resolution::ContextFallback(_) => {
                warn!(
                    "page {}: contexts inconclusive, taking first occurrence",
                    reference.page
                );
                report.stats.found += 1;
                report.stats.context_fallback += 1;
            }
            Resolution::FirstOfMany(_) => {
                warn!(
                    "page {}: snippet occurs more than once, taking first occurrence",
                    reference.page
                );
                report.stats.found += 1;
                report.stats.multiple_matches += 1;
            }
            Resolution::NotFound => {
                warn!("page {}: snippet not found", reference.page);
                report.stats.not_found += 1;
                report.failures.push(InsertFailure {
                    page: reference.page.clone(),
                    snippet: reference.snippet.clone(),
                });
                continue;
            }
        }

        // location is always present for the non-NotFound arms above
        if let Some(location) = resolution.location() {
            doc.insert_marker(location.container_index, location.offset, &reference.page)?;
            cursor = Cursor {
                container_index: location.container_index,
                position: location.offset,
            };
        }
    }

    if options.repair_out_of_order {
        report.stats.out_of_order_removed = repair_out_of_order(doc)?;
    }
    if options.inject_css {
        doc.inject_css(DEFAULT_MARKER_CSS);
    }

    info!(
        "inserted {}/{} markers ({} not found, {} skipped, {} removed as out of order)",
        report.stats.found,
        references.len(),
        report.stats.not_found,
        report.stats.placeholders_skipped,
        report.stats.out_of_order_removed,
    );
    for failure in &report.failures {
        info!("  page {} missing: {:?}", failure.page, failure.snippet);
    }
    Ok(report)
}

/// Drop numeric markers that sit behind a higher page number in document
/// order. Non-numeric labels carry no ordering and are left alone.
fn repair_out_of_order(doc: &HtmlDocument) -> Result<usize> {
    let mut removed = 0;
    let mut running_max: Option<u64> = None;
    for marker in doc.markers() {
        let Some(label) = marker_label(&marker) else {
            continue;
        };
        let Some(value) = numeric_page(&label) else {
            continue;
        };
        match running_max {
            Some(max) if value < max => {
                warn!("removing out-of-order marker for page {label}");
                remove_marker(&marker)?;
                removed += 1;
            }
            _ => running_max = Some(value),
        }
    }
    Ok(removed)
}

/// Parse, mark, and serialize in one step.
pub fn mark_html(
    html: &str,
    references: &[PageReference],
    options: &InsertOptions,
) -> Result<(String, InsertReport)> {
    let doc = HtmlDocument::parse(html)?;
    let report = insert_markers(&doc, references, options)?;
    Ok((doc.serialize()?, report))
}
