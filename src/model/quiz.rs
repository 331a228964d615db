//! Classification and quiz records.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One quiz item proposed by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerCandidate {
    pub right_ans: String,
    pub wrong_ans: Vec<String>,
}

/// The classifier's verdict for one page.
///
/// `question_type` stays a raw string here; whether it belongs to the known
/// vocabulary is decided at assembly time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedPage {
    pub page: u32,
    pub question_type: String,
    pub content: Vec<AnswerCandidate>,
}

/// Question types the assembler knows how to turn into quiz items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "read alphabets/words")]
    ReadAlphabetsWords,
    #[serde(rename = "read images")]
    ReadImages,
    #[serde(rename = "phonetic awareness")]
    PhoneticAwareness,
    #[serde(rename = "read sentences")]
    ReadSentences,
}

impl QuestionType {
    /// The full vocabulary, in prompt order.
    pub const ALL: [QuestionType; 4] = [
        QuestionType::ReadAlphabetsWords,
        QuestionType::ReadImages,
        QuestionType::PhoneticAwareness,
        QuestionType::ReadSentences,
    ];

    /// Label used on the wire.
    pub fn label(&self) -> &'static str {
        match self {
            QuestionType::ReadAlphabetsWords => "read alphabets/words",
            QuestionType::ReadImages => "read images",
            QuestionType::PhoneticAwareness => "phonetic awareness",
            QuestionType::ReadSentences => "read sentences",
        }
    }

    /// Whether answers of this type are paired with images.
    pub fn contains_image(&self) -> bool {
        matches!(self, QuestionType::ReadImages)
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuestionType::ALL
            .into_iter()
            .find(|t| t.label() == s)
            .ok_or_else(|| format!("unknown question type '{}'", s))
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// An answer associated with the image it labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextImagePair {
    pub right_ans: String,
    pub wrong_ans: Vec<String>,
    pub image_link: String,
}

/// Items of a quiz page; the variant name is the JSON key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuizItems {
    #[serde(rename = "text_image_pairs")]
    TextImagePairs(Vec<TextImagePair>),
    #[serde(rename = "texts")]
    Texts(Vec<String>),
}

impl QuizItems {
    /// Number of items.
    pub fn len(&self) -> usize {
        match self {
            QuizItems::TextImagePairs(pairs) => pairs.len(),
            QuizItems::Texts(texts) => texts.len(),
        }
    }

    /// Check if there are no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Final assembled record for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizPage {
    pub page: u32,
    pub question_type: QuestionType,
    #[serde(flatten)]
    pub items: QuizItems,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_type_roundtrip_labels() {
        for t in QuestionType::ALL {
            assert_eq!(t.label().parse::<QuestionType>().unwrap(), t);
        }
        assert!("draw shapes".parse::<QuestionType>().is_err());
        assert!(QuestionType::ReadImages.contains_image());
        assert!(!QuestionType::ReadSentences.contains_image());
    }

    #[test]
    fn test_quiz_page_json_keys() {
        let page = QuizPage {
            page: 2,
            question_type: QuestionType::ReadImages,
            items: QuizItems::TextImagePairs(vec![TextImagePair {
                right_ans: "Cat".to_string(),
                wrong_ans: vec!["Dog".to_string()],
                image_link: "out/page_2_img_1.png".to_string(),
            }]),
        };
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["question_type"], "read images");
        assert_eq!(value["text_image_pairs"][0]["right_ans"], "Cat");

        let texts = QuizPage {
            page: 3,
            question_type: QuestionType::ReadSentences,
            items: QuizItems::Texts(vec!["I see a cat.".to_string()]),
        };
        let value = serde_json::to_value(&texts).unwrap();
        assert_eq!(value["texts"][0], "I see a cat.");
        assert!(value.get("text_image_pairs").is_none());
    }

    #[test]
    fn test_classified_page_requires_keys() {
        let ok: Result<ClassifiedPage, _> = serde_json::from_str(
            r#"{"page": 1, "question_type": "read images", "content": []}"#,
        );
        assert!(ok.is_ok());

        let missing: Result<ClassifiedPage, _> =
            serde_json::from_str(r#"{"page": 1, "content": []}"#);
        assert!(missing.is_err());
    }
}
