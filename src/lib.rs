// Export modules for use in tests
pub mod cleaner;
pub mod context;
pub mod error;
pub mod html;
pub mod normalize;
pub mod pdf;
pub mod refs;
pub mod segment;

pub use error::{Error, Result};
pub use html::inserter::{InsertOptions, InsertReport, InsertStats, insert_markers, mark_html};
pub use html::locator::{Cursor, Locator, MatchTuning, Resolution};
pub use html::{Container, HtmlDocument};
pub use pdf::backend::BackendChoice;
pub use pdf::{ExtractOptions, ExtractStats, Strategy, extract_references};
pub use refs::{
    PLACEHOLDER_SNIPPET, PageReference, ValidationReport, generate_template, load_references,
    save_references, validate_references,
};
