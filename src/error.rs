//! Error types for sheetquiz.

use std::io;
use thiserror::Error;

/// Result type alias for sheetquiz operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting, classifying or assembling.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted and cannot be read.
    #[error("Document is encrypted")]
    Encrypted,

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// Invalid page range specification.
    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    /// Error extracting an image from the PDF.
    #[error("Image extraction error: {0}")]
    ImageExtract(String),

    /// Error extracting text content.
    #[error("Text extraction error: {0}")]
    TextExtract(String),

    /// A previously written artifact could not be read back.
    #[error("Invalid artifact {0}: {1}")]
    InvalidArtifact(String, String),

    /// Error serializing or writing an output artifact.
    #[error("Rendering error: {0}")]
    Render(String),

    /// The classification service could not be reached or failed.
    #[error("Classifier request failed: {0}")]
    Classifier(String),

    /// The classification response does not follow the expected shape.
    #[error("Malformed classification response: {0}")]
    ClassificationContract(String),

    /// The classification response lists the same page more than once.
    #[error("Duplicate classification entry for page {0}")]
    DuplicatePage(u32),

    /// Missing or invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageExtract(err.to_string())
    }
}
