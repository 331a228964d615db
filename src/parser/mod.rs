//! PDF page content extraction.

mod content;
mod extractor;
mod images;
mod layout;
mod options;

pub use extractor::PdfExtractor;
pub use options::{ErrorMode, ExtractOptions, PageSelection};
