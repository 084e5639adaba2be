//! Positioned-text geometry.
//!
//! Layout-aware backends report each line as a span with its page position
//! and font size. The helpers here turn those spans into reading-order text:
//! dropping footnote-sized print, ordering two-column layouts away from the
//! shared footnote zone, and picking the visually lowest block of a page.

/// One line of text with its top-left position, in page points.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    /// Index of the layout block the line belongs to.
    pub block: usize,
}

/// Spans of one page plus the page dimensions they are measured against.
#[derive(Debug, Clone)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub spans: Vec<TextSpan>,
}

/// Fraction of the page height, measured from the bottom, excluded as the
/// footnote zone in two-column ordering.
pub const FOOTNOTE_ZONE_FRACTION: f32 = 0.25;

/// Drop spans printed smaller than `min_font_size` points. Footnotes and
/// page furniture usually sit well below body size.
pub fn drop_small_text(spans: Vec<TextSpan>, min_font_size: f32) -> Vec<TextSpan> {
    spans
        .into_iter()
        .filter(|s| s.font_size >= min_font_size)
        .collect()
}

/// Order spans for reading. Single-column pages read top to bottom. In
/// two-column mode the bottom quarter of the page is a full-width footnote
/// zone shared by both columns and is dropped entirely, so a tail capture
/// lands on the text that closes the page rather than its notes; everything
/// above reads left column first, then right, each top to bottom.
pub fn reading_order(layout: PageLayout, two_column: bool) -> Vec<TextSpan> {
    let PageLayout {
        width,
        height,
        mut spans,
    } = layout;

    if !two_column {
        spans.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));
        return spans;
    }

    let zone_top = height * (1.0 - FOOTNOTE_ZONE_FRACTION);
    let mid = width / 2.0;
    let mut main: Vec<TextSpan> = spans.into_iter().filter(|s| s.y < zone_top).collect();

    main.sort_by(|a, b| {
        let col_a = a.x >= mid;
        let col_b = b.x >= mid;
        col_a
            .cmp(&col_b)
            .then(a.y.total_cmp(&b.y))
            .then(a.x.total_cmp(&b.x))
    });
    main
}

/// Text of the block whose lowest line sits furthest down the page. Spans
/// within the block keep their reading order.
pub fn lowest_block_text(spans: &[TextSpan]) -> Option<String> {
    let lowest = spans
        .iter()
        .max_by(|a, b| a.y.total_cmp(&b.y))?
        .block;
    let lines: Vec<&str> = spans
        .iter()
        .filter(|s| s.block == lowest)
        .map(|s| s.text.as_str())
        .collect();
    Some(lines.join(" "))
}

/// All span text joined in the given order.
pub fn joined_text(spans: &[TextSpan]) -> String {
    let lines: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
    lines.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, x: f32, y: f32, size: f32, block: usize) -> TextSpan {
        TextSpan {
            text: text.to_string(),
            x,
            y,
            font_size: size,
            block,
        }
    }

    #[test]
    fn small_print_filtered_out() {
        let spans = vec![
            span("body", 50.0, 100.0, 11.0, 0),
            span("1. a footnote", 50.0, 700.0, 7.5, 1),
        ];
        let kept = drop_small_text(spans, 8.5);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].text, "body");
    }

    #[test]
    fn threshold_is_inclusive() {
        let spans = vec![span("edge", 0.0, 0.0, 8.5, 0)];
        assert_eq!(drop_small_text(spans, 8.5).len(), 1);
    }

    #[test]
    fn single_column_reads_top_to_bottom() {
        let layout = PageLayout {
            width: 600.0,
            height: 800.0,
            spans: vec![
                span("second", 50.0, 400.0, 11.0, 1),
                span("first", 50.0, 100.0, 11.0, 0),
            ],
        };
        let ordered = reading_order(layout, false);
        assert_eq!(joined_text(&ordered), "first second");
    }

    #[test]
    fn two_column_reads_left_column_first() {
        let layout = PageLayout {
            width: 600.0,
            height: 800.0,
            spans: vec![
                span("right top", 350.0, 100.0, 11.0, 2),
                span("left bottom", 50.0, 500.0, 11.0, 1),
                span("left top", 50.0, 100.0, 11.0, 0),
                span("right bottom", 350.0, 500.0, 11.0, 3),
            ],
        };
        let ordered = reading_order(layout, true);
        assert_eq!(
            joined_text(&ordered),
            "left top left bottom right top right bottom"
        );
    }

    #[test]
    fn footnote_zone_excluded_in_two_column() {
        let layout = PageLayout {
            width: 600.0,
            height: 800.0,
            spans: vec![
                // bottom quarter starts at y = 600
                span("note", 50.0, 650.0, 9.0, 9),
                span("right body", 350.0, 200.0, 11.0, 1),
                span("left body", 50.0, 200.0, 11.0, 0),
            ],
        };
        let ordered = reading_order(layout, true);
        assert_eq!(joined_text(&ordered), "left body right body");
    }

    #[test]
    fn lowest_block_keeps_all_its_lines() {
        let spans = vec![
            span("heading", 50.0, 100.0, 14.0, 0),
            span("para line one", 50.0, 300.0, 11.0, 1),
            span("para line two", 50.0, 315.0, 11.0, 1),
        ];
        assert_eq!(
            lowest_block_text(&spans).as_deref(),
            Some("para line one para line two")
        );
    }

    #[test]
    fn lowest_block_of_empty_page_is_none() {
        assert_eq!(lowest_block_text(&[]), None);
    }
}
