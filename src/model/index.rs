//! The persisted JSON index (`extracted_results.json`).
//!
//! The index is the hand-off point between extraction and the later stages:
//! the flattener and the quiz assembler both read it, so they can run against
//! an index written by an earlier process.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{BBox, ExtractedDocument, ImageFormat, PageContent};

/// Image record in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexImage {
    pub filename: String,
    pub path: String,
    pub format: ImageFormat,
    pub size: usize,
    /// `null` when the placement could not be resolved
    pub coordinates: Option<BBox>,
}

/// Text block record in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexTextBlock {
    pub text: String,
    pub coordinates: BBox,
    pub line_count: usize,
}

/// One page of the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexPage {
    pub page: u32,
    pub images: Vec<IndexImage>,
    pub text_blocks: Vec<IndexTextBlock>,
    pub total_images: usize,
    pub total_text_blocks: usize,
}

impl From<&PageContent> for IndexPage {
    fn from(page: &PageContent) -> Self {
        let images: Vec<IndexImage> = page
            .images
            .iter()
            .map(|img| IndexImage {
                filename: img.filename.clone(),
                path: img.path.to_string_lossy().into_owned(),
                format: img.format,
                size: img.size,
                coordinates: img.bbox,
            })
            .collect();

        let text_blocks: Vec<IndexTextBlock> = page
            .text_blocks
            .iter()
            .map(|block| IndexTextBlock {
                text: block.text.clone(),
                coordinates: block.bbox,
                line_count: block.line_count(),
            })
            .collect();

        IndexPage {
            page: page.number,
            total_images: images.len(),
            total_text_blocks: text_blocks.len(),
            images,
            text_blocks,
        }
    }
}

/// The whole index: one entry per extracted page, in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractionIndex {
    pub pages: Vec<IndexPage>,
}

impl ExtractionIndex {
    /// Look up a page by number.
    pub fn page(&self, number: u32) -> Option<&IndexPage> {
        self.pages.iter().find(|p| p.page == number)
    }

    /// Pages keyed by number, for repeated lookups.
    ///
    /// A page number listed twice resolves to its first entry, as with
    /// [`page`](Self::page).
    pub fn by_page(&self) -> BTreeMap<u32, &IndexPage> {
        let mut pages = BTreeMap::new();
        for page in &self.pages {
            pages.entry(page.page).or_insert(page);
        }
        pages
    }
}

impl From<&ExtractedDocument> for ExtractionIndex {
    fn from(doc: &ExtractedDocument) -> Self {
        ExtractionIndex {
            pages: doc.pages.iter().map(IndexPage::from).collect(),
        }
    }
}
