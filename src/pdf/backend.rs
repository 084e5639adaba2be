//! PDF page access behind a trait.
//!
//! Two backends: a pure-Rust one on lopdf that gives per-page text only, and
//! a layout-aware one on mupdf (behind the `mupdf` feature) that also
//! reports line positions and font sizes. Options that need geometry fail
//! with `MissingCapability` on a text-only backend.

use std::path::Path;

use crate::error::{Error, Result};
use crate::pdf::layout::PageLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendChoice {
    /// Layout-aware when compiled in, text-only otherwise.
    #[default]
    Auto,
    /// lopdf, pure Rust, per-page text only.
    FastNative,
    /// mupdf, requires the `mupdf` feature.
    LayoutAware,
}

pub trait PageBackend {
    fn page_count(&self) -> usize;
    /// Raw text of a 0-based page.
    fn page_text(&self, index: usize) -> Result<String>;
    /// Positioned lines of a 0-based page, `None` when the backend carries
    /// no layout information.
    fn page_layout(&self, index: usize) -> Result<Option<PageLayout>>;
}

pub fn open_backend(path: &Path, choice: BackendChoice) -> Result<Box<dyn PageBackend>> {
    match choice {
        BackendChoice::FastNative => Ok(Box::new(LopdfBackend::open(path)?)),
        BackendChoice::LayoutAware => {
            #[cfg(feature = "mupdf")]
            {
                Ok(Box::new(MupdfBackend::open(path)?))
            }
            #[cfg(not(feature = "mupdf"))]
            {
                Err(Error::MissingCapability(
                    "layout-aware backend requires the mupdf feature".into(),
                ))
            }
        }
        BackendChoice::Auto => {
            #[cfg(feature = "mupdf")]
            {
                Ok(Box::new(MupdfBackend::open(path)?))
            }
            #[cfg(not(feature = "mupdf"))]
            {
                Ok(Box::new(LopdfBackend::open(path)?))
            }
        }
    }
}

/// Text-only backend on lopdf.
pub struct LopdfBackend {
    doc: lopdf::Document,
    pages: Vec<u32>,
}

impl LopdfBackend {
    pub fn open(path: &Path) -> Result<Self> {
        let doc = lopdf::Document::load(path)
            .map_err(|e| Error::Pdf(format!("{}: {e}", path.display())))?;
        let pages = doc.get_pages().keys().copied().collect();
        Ok(LopdfBackend { doc, pages })
    }
}

impl PageBackend for LopdfBackend {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> Result<String> {
        let page = self
            .pages
            .get(index)
            .copied()
            .ok_or_else(|| Error::Pdf(format!("page {index} out of range")))?;
        self.doc
            .extract_text(&[page])
            .map_err(|e| Error::Pdf(format!("text extraction failed on page {page}: {e}")))
    }

    fn page_layout(&self, _index: usize) -> Result<Option<PageLayout>> {
        Ok(None)
    }
}

/// Layout-aware backend on mupdf.
#[cfg(feature = "mupdf")]
pub struct MupdfBackend {
    doc: mupdf::Document,
    pages: usize,
}

#[cfg(feature = "mupdf")]
impl MupdfBackend {
    pub fn open(path: &Path) -> Result<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| Error::Pdf(format!("non-UTF-8 path {}", path.display())))?;
        let doc = mupdf::Document::open(path_str)
            .map_err(|e| Error::Pdf(format!("{path_str}: {e}")))?;
        let pages = doc
            .page_count()
            .map_err(|e| Error::Pdf(format!("{path_str}: {e}")))? as usize;
        Ok(MupdfBackend { doc, pages })
    }
}

#[cfg(feature = "mupdf")]
impl PageBackend for MupdfBackend {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn page_text(&self, index: usize) -> Result<String> {
        let layout = self
            .page_layout(index)?
            .ok_or_else(|| Error::Pdf(format!("no text on page {index}")))?;
        Ok(crate::pdf::layout::joined_text(&layout.spans))
    }

    fn page_layout(&self, index: usize) -> Result<Option<PageLayout>> {
        use mupdf::TextPageFlags;
        use mupdf::text_page::TextBlockType;

        use crate::pdf::layout::TextSpan;

        let page = self
            .doc
            .load_page(index as i32)
            .map_err(|e| Error::Pdf(format!("page {index}: {e}")))?;
        let bounds = page
            .bounds()
            .map_err(|e| Error::Pdf(format!("page {index}: {e}")))?;
        let text_page = page
            .to_text_page(TextPageFlags::COLLECT_STYLES)
            .map_err(|e| Error::Pdf(format!("page {index}: {e}")))?;

        let mut spans = Vec::new();
        for (block_idx, block) in text_page.blocks().enumerate() {
            if block.r#type() != TextBlockType::Text {
                continue;
            }
            for line in block.lines() {
                let bbox = line.bounds();
                let mut text = String::new();
                let mut font_size = 0.0f32;
                for ch in line.chars() {
                    font_size = font_size.max(ch.size());
                    if let Some(c) = ch.char() {
                        text.push(c);
                    }
                }
                if text.trim().is_empty() {
                    continue;
                }
                spans.push(TextSpan {
                    text,
                    x: bbox.x0,
                    y: bbox.y0,
                    font_size,
                    block: block_idx,
                });
            }
        }

        Ok(Some(PageLayout {
            width: bounds.x1 - bounds.x0,
            height: bounds.y1 - bounds.y0,
            spans,
        }))
    }
}
