//! PDF input detection.
//!
//! Acceptance is decided by content: a `%PDF-` marker near the start of the
//! file. The file extension is only advisory.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Readers tolerate junk before the header within the first kilobyte.
const HEADER_SEARCH_LEN: usize = 1024;

/// Detected header information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfHeader {
    /// Byte offset of the `%PDF-` marker
    pub offset: usize,
    /// Declared version (e.g., "1.7"), if well formed
    pub version: Option<String>,
}

impl std::fmt::Display for PdfHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.version {
            Some(v) => write!(f, "PDF {}", v),
            None => write!(f, "PDF (unknown version)"),
        }
    }
}

/// Detect a PDF header in the first bytes of a file.
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<PdfHeader> {
    let mut header = Vec::with_capacity(HEADER_SEARCH_LEN);
    File::open(path)?
        .take(HEADER_SEARCH_LEN as u64)
        .read_to_end(&mut header)?;
    detect_format_from_bytes(&header)
}

/// Detect a PDF header in a byte buffer.
///
/// Returns `Error::UnknownFormat` when no `%PDF-` marker appears in the
/// first kilobyte.
pub fn detect_format_from_bytes(data: &[u8]) -> Result<PdfHeader> {
    let window = &data[..data.len().min(HEADER_SEARCH_LEN)];
    let offset = window
        .windows(PDF_MAGIC.len())
        .position(|w| w == PDF_MAGIC)
        .ok_or(Error::UnknownFormat)?;

    let version = window
        .get(offset + PDF_MAGIC.len()..offset + PDF_MAGIC.len() + 3)
        .map(|v| String::from_utf8_lossy(v).into_owned())
        .filter(|v| is_valid_version(v));

    Ok(PdfHeader { offset, version })
}

/// Check if a version string is valid.
fn is_valid_version(version: &str) -> bool {
    let bytes = version.as_bytes();
    bytes.len() == 3 && bytes[0].is_ascii_digit() && bytes[1] == b'.' && bytes[2].is_ascii_digit()
}

/// Check whether a path carries a `.pdf` extension (any case).
pub fn has_pdf_extension<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Check if bytes start like a PDF.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    detect_format_from_bytes(data).is_ok()
}
