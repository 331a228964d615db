//! Image blocks extracted from a page.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::BBox;

/// Encoded format of an extracted image file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Baseline/progressive JPEG, copied verbatim from a DCT stream
    Jpeg,
    /// JPEG 2000 codestream, copied verbatim from a JPX stream
    Jpx,
    /// Decoded pixel data re-encoded as PNG
    Png,
}

impl ImageFormat {
    /// File extension used for extracted files.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Jpx => "jpx",
            ImageFormat::Png => "png",
        }
    }

    /// MIME type for the encoded bytes.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Jpx => "image/jp2",
            ImageFormat::Png => "image/png",
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// One embedded raster image, written to disk during extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    /// Generated file name, `page_{p}_img_{i}.{ext}`
    pub filename: String,
    /// Where the file was written
    pub path: PathBuf,
    /// Encoded size in bytes
    pub size: usize,
    /// Encoded format
    pub format: ImageFormat,
    /// Placement on the page, when it could be resolved
    pub bbox: Option<BBox>,
    /// PDF object number of the image XObject
    pub xref: u32,
}

impl ImageBlock {
    /// File name for the `seq`-th image (1-based) of page `page`.
    pub fn file_name(page: u32, seq: usize, format: ImageFormat) -> String {
        format!("page_{}_img_{}.{}", page, seq, format.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        assert_eq!(
            ImageBlock::file_name(3, 2, ImageFormat::Png),
            "page_3_img_2.png"
        );
        assert_eq!(
            ImageBlock::file_name(1, 1, ImageFormat::Jpeg),
            "page_1_img_1.jpeg"
        );
    }

    #[test]
    fn test_format_serde() {
        assert_eq!(
            serde_json::to_string(&ImageFormat::Jpeg).unwrap(),
            "\"jpeg\""
        );
        assert_eq!(ImageFormat::Png.mime_type(), "image/png");
    }
}
