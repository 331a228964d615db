//! Text-image pairing.
//!
//! A worksheet answer is paired with an image when its text block sits
//! directly below the image: horizontally inside the image's span, starting
//! below its bottom edge, and within a configurable vertical gap.

use serde::{Deserialize, Serialize};

use crate::model::{AnswerCandidate, BBox, IndexPage, TextImagePair};

/// Default maximum gap between an image's bottom edge and a label's top edge.
pub const DEFAULT_THRESHOLD: f32 = 50.0;

/// What to keep when one text block matches several images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairingStrategy {
    /// Keep every match
    #[default]
    All,
    /// Keep only the image with the smallest vertical gap (first on ties)
    Nearest,
}

/// Options for the pairing engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairingOptions {
    /// Maximum vertical gap, in page units
    pub threshold: f32,
    /// Multi-match handling
    pub strategy: PairingStrategy,
}

impl PairingOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the vertical gap threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the multi-match strategy.
    pub fn with_strategy(mut self, strategy: PairingStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

impl Default for PairingOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            strategy: PairingStrategy::All,
        }
    }
}

/// Check whether block text matches an accepted answer.
///
/// Matches exactly, or with the block's final character dropped (so
/// `"Apple."` matches `"Apple"`).
pub fn matches_answer(text: &str, answer: &str) -> bool {
    text == answer || without_last_char(text) == Some(answer)
}

fn without_last_char(text: &str) -> Option<&str> {
    let (idx, _) = text.char_indices().next_back()?;
    Some(&text[..idx])
}

/// Find the first candidate (in classifier order) whose answer the text matches.
pub fn find_candidate<'a>(text: &str, candidates: &'a [AnswerCandidate]) -> Option<&'a AnswerCandidate> {
    candidates.iter().find(|c| matches_answer(text, &c.right_ans))
}

/// Vertical gap if `text` sits below `image` within the threshold.
///
/// Both horizontal edges of the text must lie within the image's span, the
/// text must start strictly below the image, and the gap must stay under
/// the threshold.
pub fn label_gap(image: &BBox, text: &BBox, threshold: f32) -> Option<f32> {
    if !image.contains_x_span(text.x0, text.x1) {
        return None;
    }
    let gap = text.y0 - image.y1;
    (gap > 0.0 && gap < threshold).then_some(gap)
}

/// Pair the page's answer labels with the images above them.
///
/// Pairs come out in text-block order, then image order. Images without a
/// resolved bounding box are ignored and unmatched text blocks are dropped.
pub fn find_pairs(
    page: &IndexPage,
    candidates: &[AnswerCandidate],
    options: &PairingOptions,
) -> Vec<TextImagePair> {
    let mut pairs = Vec::new();

    for block in &page.text_blocks {
        let Some(candidate) = find_candidate(&block.text, candidates) else {
            continue;
        };

        let matches = page.images.iter().filter_map(|image| {
            let bbox = image.coordinates.as_ref()?;
            label_gap(bbox, &block.coordinates, options.threshold).map(|gap| (gap, image))
        });

        let make_pair = |image: &crate::model::IndexImage| TextImagePair {
            right_ans: block.text.clone(),
            wrong_ans: candidate.wrong_ans.clone(),
            image_link: image.path.clone(),
        };

        match options.strategy {
            PairingStrategy::All => pairs.extend(matches.map(|(_, image)| make_pair(image))),
            PairingStrategy::Nearest => {
                let nearest = matches.fold(None, |best: Option<(f32, _)>, (gap, image)| match best {
                    Some((best_gap, _)) if best_gap <= gap => best,
                    _ => Some((gap, image)),
                });
                if let Some((_, image)) = nearest {
                    pairs.push(make_pair(image));
                }
            }
        }
    }

    log::debug!("Page {}: {} text-image pairs", page.page, pairs.len());
    pairs
}

/// Texts on the page that match an accepted answer, in block order.
pub fn find_texts(page: &IndexPage, candidates: &[AnswerCandidate]) -> Vec<String> {
    page.text_blocks
        .iter()
        .filter(|block| find_candidate(&block.text, candidates).is_some())
        .map(|block| block.text.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageFormat, IndexImage, IndexTextBlock};

    fn candidate(right: &str, wrong: &[&str]) -> AnswerCandidate {
        AnswerCandidate {
            right_ans: right.to_string(),
            wrong_ans: wrong.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn image(name: &str, bbox: Option<BBox>) -> IndexImage {
        IndexImage {
            filename: name.to_string(),
            path: format!("out/{}", name),
            format: ImageFormat::Png,
            size: 10,
            coordinates: bbox,
        }
    }

    fn text(t: &str, bbox: BBox) -> IndexTextBlock {
        IndexTextBlock {
            text: t.to_string(),
            coordinates: bbox,
            line_count: 1,
        }
    }

    fn page(images: Vec<IndexImage>, text_blocks: Vec<IndexTextBlock>) -> IndexPage {
        IndexPage {
            page: 1,
            total_images: images.len(),
            total_text_blocks: text_blocks.len(),
            images,
            text_blocks,
        }
    }

    #[test]
    fn test_matches_answer() {
        assert!(matches_answer("Apple", "Apple"));
        assert!(matches_answer("Apple.", "Apple"));
        assert!(!matches_answer("Appl", "Apple"));
        assert!(!matches_answer("", "Apple"));
        assert!(matches_answer("café!", "café"));
        assert!(matches_answer("猫。", "猫"));
    }

    #[test]
    fn test_label_gap_geometry() {
        let img = BBox::new(10.0, 10.0, 110.0, 60.0);
        assert_eq!(label_gap(&img, &BBox::new(20.0, 65.0, 90.0, 80.0), 50.0), Some(5.0));
        // too far below
        assert_eq!(label_gap(&img, &BBox::new(20.0, 200.0, 90.0, 215.0), 50.0), None);
        // overlapping the image vertically
        assert_eq!(label_gap(&img, &BBox::new(20.0, 60.0, 90.0, 75.0), 50.0), None);
        // wider than the image
        assert_eq!(label_gap(&img, &BBox::new(5.0, 65.0, 90.0, 80.0), 50.0), None);
    }

    #[test]
    fn test_find_pairs_basic() {
        let p = page(
            vec![image("page_1_img_1.png", Some(BBox::new(10.0, 10.0, 110.0, 60.0)))],
            vec![
                text("Apple.", BBox::new(20.0, 65.0, 90.0, 80.0)),
                text("Banana", BBox::new(20.0, 200.0, 90.0, 215.0)),
                text("Name:", BBox::new(20.0, 66.0, 60.0, 78.0)),
            ],
        );
        let candidates = vec![candidate("Apple", &["Ant"]), candidate("Banana", &[])];

        let pairs = find_pairs(&p, &candidates, &PairingOptions::default());
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].right_ans, "Apple.");
        assert_eq!(pairs[0].wrong_ans, vec!["Ant"]);
        assert_eq!(pairs[0].image_link, "out/page_1_img_1.png");
    }

    #[test]
    fn test_first_candidate_supplies_wrong_answers() {
        let p = page(
            vec![image("a.png", Some(BBox::new(0.0, 0.0, 100.0, 50.0)))],
            vec![text("Cat", BBox::new(10.0, 55.0, 40.0, 65.0))],
        );
        let candidates = vec![candidate("Cat", &["Cap"]), candidate("Cat", &["Cot"])];
        let pairs = find_pairs(&p, &candidates, &PairingOptions::default());
        assert_eq!(pairs[0].wrong_ans, vec!["Cap"]);
    }

    #[test]
    fn test_images_without_bbox_are_skipped() {
        let p = page(
            vec![image("a.png", None)],
            vec![text("Cat", BBox::new(10.0, 55.0, 40.0, 65.0))],
        );
        assert!(find_pairs(&p, &[candidate("Cat", &[])], &PairingOptions::default()).is_empty());
    }

    #[test]
    fn test_strategies() {
        let p = page(
            vec![
                image("far.png", Some(BBox::new(0.0, 0.0, 100.0, 20.0))),
                image("near.png", Some(BBox::new(0.0, 30.0, 100.0, 50.0))),
            ],
            vec![text("Cat", BBox::new(10.0, 55.0, 40.0, 65.0))],
        );
        let candidates = [candidate("Cat", &[])];

        let all = find_pairs(&p, &candidates, &PairingOptions::default());
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].image_link, "out/far.png");

        let nearest = find_pairs(
            &p,
            &candidates,
            &PairingOptions::new().with_strategy(PairingStrategy::Nearest),
        );
        assert_eq!(nearest.len(), 1);
        assert_eq!(nearest[0].image_link, "out/near.png");

        let tight = find_pairs(&p, &candidates, &PairingOptions::new().with_threshold(10.0));
        assert_eq!(tight.len(), 1);
    }

    #[test]
    fn test_find_texts() {
        let p = page(
            vec![],
            vec![
                text("I see a cat.", BBox::new(0.0, 0.0, 10.0, 10.0)),
                text("Name:", BBox::new(0.0, 20.0, 10.0, 30.0)),
                text("I see a dog", BBox::new(0.0, 40.0, 10.0, 50.0)),
            ],
        );
        let texts = find_texts(&p, &[candidate("I see a cat", &[]), candidate("I see a dog", &[])]);
        assert_eq!(texts, vec!["I see a cat.", "I see a dog"]);
    }
}
