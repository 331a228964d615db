//! # sheetquiz
//!
//! Turns worksheet PDFs into quiz data.
//!
//! The pipeline extracts positioned text blocks and embedded images from
//! every page, sends the page texts to a classification service, and pairs
//! the answers it returns with the pictures they label.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sheetquiz::{extract_file, flatten, ExtractionIndex};
//!
//! fn main() -> sheetquiz::Result<()> {
//!     // Extract text blocks and images; writes the index and transcript
//!     let doc = extract_file("worksheet.pdf", "out")?;
//!
//!     // Per-page text lists for classification
//!     let pages = flatten(&ExtractionIndex::from(&doc));
//!     println!("{} pages with text", pages.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Stages
//!
//! - **Extraction**: content stream interpretation with lopdf, images
//!   written as JPEG / JPEG 2000 / PNG files
//! - **Flattening**: per-page text lists
//! - **Classification**: prompt building and reply parsing behind the
//!   [`Classifier`] trait
//! - **Pairing and assembly**: geometric label-to-image matching

pub mod assemble;
pub mod classify;
pub mod detect;
pub mod error;
pub mod flatten;
pub mod model;
pub mod pairing;
pub mod parser;
pub mod pipeline;
pub mod render;

// Re-export commonly used types
pub use assemble::assemble_quiz;
pub use classify::{build_prompt, parse_response, ClassificationSet, Classifier};
pub use detect::{detect_format_from_bytes, detect_format_from_path, PdfHeader};
pub use error::{Error, Result};
pub use flatten::{flatten, FlatPage};
pub use model::{
    AnswerCandidate, BBox, ClassifiedPage, ExtractedDocument, ExtractionIndex, ImageBlock,
    ImageFormat, PageContent, QuestionType, QuizItems, QuizPage, TextBlock, TextImagePair,
};
pub use pairing::{find_pairs, PairingOptions, PairingStrategy};
pub use parser::{ErrorMode, ExtractOptions, PageSelection, PdfExtractor};
pub use pipeline::{ClassifierCredentials, Pipeline, PipelineConfig, PipelineOutput};
pub use render::JsonFormat;

use std::path::Path;

/// Extract a PDF file into `output_dir`.
///
/// Writes one file per embedded image, `extracted_results.json` and
/// `extracted_text.txt`.
///
/// # Example
///
/// ```no_run
/// use sheetquiz::extract_file;
///
/// let doc = extract_file("worksheet.pdf", "out").unwrap();
/// println!("Images: {}", doc.image_count());
/// ```
pub fn extract_file<P: AsRef<Path>, Q: AsRef<Path>>(path: P, output_dir: Q) -> Result<ExtractedDocument> {
    PdfExtractor::open(path)?.extract_to(output_dir)
}

/// Extract a PDF file with custom options.
///
/// # Example
///
/// ```no_run
/// use sheetquiz::{extract_file_with_options, ExtractOptions, PageSelection};
///
/// let options = ExtractOptions::new()
///     .strict()
///     .with_pages(PageSelection::Range(1..=3));
/// let doc = extract_file_with_options("worksheet.pdf", "out", options).unwrap();
/// ```
pub fn extract_file_with_options<P: AsRef<Path>, Q: AsRef<Path>>(
    path: P,
    output_dir: Q,
    options: ExtractOptions,
) -> Result<ExtractedDocument> {
    PdfExtractor::open_with_options(path, options)?.extract_to(output_dir)
}

/// Extract a PDF held in memory into `output_dir`.
pub fn extract_bytes<Q: AsRef<Path>>(data: &[u8], output_dir: Q) -> Result<ExtractedDocument> {
    PdfExtractor::from_bytes(data)?.extract_to(output_dir)
}

/// Load an extraction index written by an earlier run.
pub fn load_index<P: AsRef<Path>>(path: P) -> Result<ExtractionIndex> {
    render::read_json(path.as_ref())
}

/// Load a saved classifier reply (raw or already parsed).
pub fn load_classifications<P: AsRef<Path>>(path: P) -> Result<ClassificationSet> {
    let raw = std::fs::read_to_string(path)?;
    ClassificationSet::from_response(&raw)
}
