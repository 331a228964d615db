//! Rendering of pipeline artifacts.
//!
//! Every stage persists what it produced next to the extracted images, so a
//! run can be inspected or resumed from any stage.

mod json;
mod text;

pub use json::{read_json, to_json, write_json, JsonFormat};
pub use text::to_transcript;

/// JSON index of pages, text blocks and images.
pub const INDEX_FILE: &str = "extracted_results.json";

/// Plain-text transcript of the extraction.
pub const TRANSCRIPT_FILE: &str = "extracted_text.txt";

/// Flattened per-page text sent to the classifier.
pub const FLATTENED_FILE: &str = "llm_preprocess.json";

/// Parsed classifier response.
pub const RESPONSE_FILE: &str = "llm_response.json";

/// Assembled quiz.
pub const QUIZ_FILE: &str = "final.json";
