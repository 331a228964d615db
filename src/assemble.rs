//! Quiz assembly.

use crate::classify::ClassificationSet;
use crate::model::{ExtractionIndex, QuestionType, QuizItems, QuizPage};
use crate::pairing::{find_pairs, find_texts, PairingOptions};

/// Turn classified pages into quiz records, in page order.
///
/// Image-bearing question types are paired with the images above their
/// answers; other types keep the matching texts. Pages with a question type
/// outside the known vocabulary are logged and left out. A classified page
/// missing from the index yields an empty item list.
pub fn assemble_quiz(
    index: &ExtractionIndex,
    classifications: &ClassificationSet,
    options: &PairingOptions,
) -> Vec<QuizPage> {
    let pages = index.by_page();
    let mut quiz = Vec::new();

    for classified in classifications.iter() {
        let question_type = match classified.question_type.parse::<QuestionType>() {
            Ok(t) => t,
            Err(e) => {
                log::warn!("Skipping page {}: {}", classified.page, e);
                continue;
            }
        };

        let page = pages.get(&classified.page).copied();
        if page.is_none() {
            log::warn!("Page {} is classified but not in the extraction index", classified.page);
        }

        let items = if question_type.contains_image() {
            QuizItems::TextImagePairs(
                page.map(|p| find_pairs(p, &classified.content, options))
                    .unwrap_or_default(),
            )
        } else {
            QuizItems::Texts(
                page.map(|p| find_texts(p, &classified.content))
                    .unwrap_or_default(),
            )
        };

        log::info!(
            "Page {} ({}): {} items",
            classified.page,
            question_type,
            items.len()
        );

        quiz.push(QuizPage {
            page: classified.page,
            question_type,
            items,
        });
    }

    quiz
}
