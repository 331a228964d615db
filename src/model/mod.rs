//! Data model shared by the extraction, classification and assembly stages.
//!
//! Extraction produces [`ExtractedDocument`] (full span/line/block detail) and
//! its projection [`ExtractionIndex`] (what gets persisted). Classification
//! yields [`ClassifiedPage`] records, and assembly emits [`QuizPage`]s.

mod geometry;
mod image;
mod index;
mod page;
mod quiz;
mod text;

pub use geometry::{BBox, Matrix};
pub use image::{ImageBlock, ImageFormat};
pub use index::{ExtractionIndex, IndexImage, IndexPage, IndexTextBlock};
pub use page::{ExtractedDocument, PageContent};
pub use quiz::{
    AnswerCandidate, ClassifiedPage, QuestionType, QuizItems, QuizPage, TextImagePair,
};
pub use text::{TextBlock, TextLine, TextSpan};
