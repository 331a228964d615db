//! Page-level extraction results.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{ImageBlock, TextBlock};

/// Everything extracted from one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    /// Page number (1-indexed)
    pub number: u32,

    /// Page width in points
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Text blocks in rendering order
    pub text_blocks: Vec<TextBlock>,

    /// Images in reference-list order
    pub images: Vec<ImageBlock>,
}

impl PageContent {
    /// Create an empty page.
    pub fn new(number: u32, width: f32, height: f32) -> Self {
        Self {
            number,
            width,
            height,
            text_blocks: Vec::new(),
            images: Vec::new(),
        }
    }

    /// Check if nothing was extracted from the page.
    pub fn is_empty(&self) -> bool {
        self.text_blocks.is_empty() && self.images.is_empty()
    }
}

/// Result of running the extractor over a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Source PDF path
    pub source: PathBuf,

    /// Directory the images and artifacts were written to
    pub output_dir: PathBuf,

    /// Total pages in the source document
    pub page_count: u32,

    /// Extracted pages in document order
    pub pages: Vec<PageContent>,
}

impl ExtractedDocument {
    /// Get a page by number (1-indexed).
    pub fn page(&self, number: u32) -> Option<&PageContent> {
        self.pages.iter().find(|p| p.number == number)
    }

    /// Total number of images across all pages.
    pub fn image_count(&self) -> usize {
        self.pages.iter().map(|p| p.images.len()).sum()
    }

    /// Total number of text blocks across all pages.
    pub fn text_block_count(&self) -> usize {
        self.pages.iter().map(|p| p.text_blocks.len()).sum()
    }
}
