//! Classification adapter.
//!
//! Builds the request text sent to the classification service and turns its
//! reply into [`ClassifiedPage`] records keyed by page. The transport lives
//! behind the [`Classifier`] trait so the pipeline can run against any
//! service, or a canned response in tests.

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::{Error, Result};
use crate::flatten::FlatPage;
use crate::model::ClassifiedPage;
use crate::render::{to_json, JsonFormat};

/// System message sent with every classification request.
pub const SYSTEM_MESSAGE: &str = "You are a helpful assistant";

/// Matches a reply wrapped in a Markdown code fence.
const CODE_FENCE_PATTERN: &str = r"(?s)^\s*```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)\s*```\s*$";

/// A text classification service.
pub trait Classifier {
    /// Send the request text and return the raw reply.
    fn classify(&self, prompt: &str) -> Result<String>;
}

impl<C: Classifier + ?Sized> Classifier for &C {
    fn classify(&self, prompt: &str) -> Result<String> {
        (**self).classify(prompt)
    }
}

/// Compose the request text: the prompt template, the task description,
/// then the flattened pages as JSON.
pub fn build_prompt(template: &str, task: &str, pages: &[FlatPage]) -> Result<String> {
    let mut prompt = template.trim_end().to_string();

    if !task.trim().is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(task.trim());
    }

    prompt.push_str("\n\n");
    prompt.push_str(&to_json(pages, JsonFormat::Compact)?);
    Ok(prompt)
}

/// Remove a surrounding Markdown code fence, if any.
pub fn strip_code_fence(raw: &str) -> Result<&str> {
    let re = Regex::new(CODE_FENCE_PATTERN).map_err(|e| Error::Config(e.to_string()))?;
    Ok(match re.captures(raw).and_then(|c| c.get(1)) {
        Some(body) => body.as_str(),
        None => raw.trim(),
    })
}

/// Parse a classifier reply into page records.
///
/// The reply must be a JSON list of `{page, question_type, content}`
/// objects; anything else is a contract violation.
pub fn parse_response(raw: &str) -> Result<Vec<ClassifiedPage>> {
    let body = strip_code_fence(raw)?;
    serde_json::from_str(body).map_err(|e| Error::ClassificationContract(e.to_string()))
}

/// Classification results keyed by page number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationSet {
    pages: BTreeMap<u32, ClassifiedPage>,
}

impl ClassificationSet {
    /// Index parsed records by page, rejecting duplicate entries.
    pub fn from_pages(pages: Vec<ClassifiedPage>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for page in pages {
            let number = page.page;
            if map.insert(number, page).is_some() {
                return Err(Error::DuplicatePage(number));
            }
        }
        Ok(Self { pages: map })
    }

    /// Parse a raw classifier reply.
    pub fn from_response(raw: &str) -> Result<Self> {
        Self::from_pages(parse_response(raw)?)
    }

    /// Get the record for a page.
    pub fn get(&self, page: u32) -> Option<&ClassifiedPage> {
        self.pages.get(&page)
    }

    /// Records in page order.
    pub fn iter(&self) -> impl Iterator<Item = &ClassifiedPage> {
        self.pages.values()
    }

    /// Number of classified pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Check if nothing was classified.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Records in page order, for persisting.
    pub fn to_vec(&self) -> Vec<ClassifiedPage> {
        self.pages.values().cloned().collect()
    }
}

/// Run one classification round-trip for the flattened pages.
pub fn classify_pages<C: Classifier + ?Sized>(
    classifier: &C,
    template: &str,
    task: &str,
    pages: &[FlatPage],
) -> Result<ClassificationSet> {
    let prompt = build_prompt(template, task, pages)?;
    log::info!("Sending classification request ({} pages, {} bytes)", pages.len(), prompt.len());

    let reply = classifier.classify(&prompt)?;
    log::debug!("Classification reply: {} bytes", reply.len());

    let set = ClassificationSet::from_response(&reply)?;
    log::info!("Classified {} pages", set.len());
    Ok(set)
}
