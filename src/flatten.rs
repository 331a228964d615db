//! Text flattening: the per-page text lists sent for classification.

use serde::{Deserialize, Serialize};

use crate::model::ExtractionIndex;

/// Plain text blocks of one page, in index order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatPage {
    pub page: u32,
    pub text_blocks: Vec<String>,
}

/// Project an extraction index onto per-page text lists.
///
/// Pages without text blocks are omitted; everything else keeps index order.
pub fn flatten(index: &ExtractionIndex) -> Vec<FlatPage> {
    index
        .pages
        .iter()
        .filter(|page| !page.text_blocks.is_empty())
        .map(|page| FlatPage {
            page: page.page,
            text_blocks: page.text_blocks.iter().map(|b| b.text.clone()).collect(),
        })
        .collect()
}
