//! End-to-end pipeline: extract, flatten, classify, assemble.
//!
//! Every stage writes its artifact into the output directory, so each one can
//! also be run on its own from a previous stage's files.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::assemble::assemble_quiz;
use crate::classify::{classify_pages, ClassificationSet, Classifier};
use crate::error::{Error, Result};
use crate::flatten::{flatten, FlatPage};
use crate::model::{ExtractionIndex, QuizPage};
use crate::pairing::PairingOptions;
use crate::parser::{ExtractOptions, PdfExtractor};
use crate::render::{self, JsonFormat};

/// Default chat-completions endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";

/// Default classification model.
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// Credentials and endpoint for the classification service.
#[derive(Clone, PartialEq, Eq)]
pub struct ClassifierCredentials {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl ClassifierCredentials {
    /// Credentials for the default endpoint and model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Set the endpoint base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Check that the key, endpoint and model are all set.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Config("missing classifier API key".to_string()));
        }
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("classifier base URL is empty".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(Error::Config("classifier model is empty".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for ClassifierCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierCredentials")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Everything a pipeline run needs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Worksheet PDF to process
    pub document_path: PathBuf,
    /// Directory for images and artifacts
    pub output_dir: PathBuf,
    /// Instructional prompt placed before the page texts
    pub prompt_template: String,
    /// Caller-provided task description appended to the prompt
    pub task_description: String,
    /// Classification service credentials; transports are built from these
    pub classifier: ClassifierCredentials,
    /// Extraction options
    pub extract: ExtractOptions,
    /// Pairing options
    pub pairing: PairingOptions,
}

impl PipelineConfig {
    /// Create a configuration with default options.
    pub fn new(
        document_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        prompt_template: impl Into<String>,
        classifier: ClassifierCredentials,
    ) -> Self {
        Self {
            document_path: document_path.into(),
            output_dir: output_dir.into(),
            prompt_template: prompt_template.into(),
            task_description: String::new(),
            classifier,
            extract: ExtractOptions::default(),
            pairing: PairingOptions::default(),
        }
    }

    /// Set the task description.
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task_description = task.into();
        self
    }

    /// Set extraction options.
    pub fn with_extract_options(mut self, options: ExtractOptions) -> Self {
        self.extract = options;
        self
    }

    /// Set pairing options.
    pub fn with_pairing_options(mut self, options: PairingOptions) -> Self {
        self.pairing = options;
        self
    }

    /// Check the configuration before any output is written.
    pub fn validate(&self) -> Result<()> {
        if !self.document_path.is_file() {
            return Err(Error::Config(format!(
                "document '{}' does not exist",
                self.document_path.display()
            )));
        }
        if self.prompt_template.trim().is_empty() {
            return Err(Error::Config("prompt template is empty".to_string()));
        }
        self.classifier.validate()?;
        if self.pairing.threshold.is_nan() || self.pairing.threshold <= 0.0 {
            return Err(Error::Config(format!(
                "pairing threshold must be positive, got {}",
                self.pairing.threshold
            )));
        }
        Ok(())
    }
}

/// Read a prompt template file.
pub fn read_prompt_template<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read prompt file '{}': {}", path.display(), e)))
}

/// Artifacts of a complete run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub index: ExtractionIndex,
    pub flattened: Vec<FlatPage>,
    pub classifications: ClassificationSet,
    pub quiz: Vec<QuizPage>,
}

/// Runs the stages against one configuration and classifier.
pub struct Pipeline<C> {
    config: PipelineConfig,
    classifier: C,
}

impl<C: Classifier> Pipeline<C> {
    /// Create a pipeline.
    pub fn new(config: PipelineConfig, classifier: C) -> Self {
        Self { config, classifier }
    }

    /// The configuration in use.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Extract the document; writes images, the index and the transcript.
    pub fn extract(&self) -> Result<ExtractionIndex> {
        let extractor =
            PdfExtractor::open_with_options(&self.config.document_path, self.config.extract.clone())?;
        let document = extractor.extract_to(&self.config.output_dir)?;
        Ok(ExtractionIndex::from(&document))
    }

    /// Flatten the index; writes the per-page text lists.
    pub fn flatten(&self, index: &ExtractionIndex) -> Result<Vec<FlatPage>> {
        let pages = flatten(index);
        render::write_json(&self.artifact(render::FLATTENED_FILE)?, &pages, JsonFormat::Pretty)?;
        Ok(pages)
    }

    /// Classify the flattened pages; writes the parsed response.
    pub fn classify(&self, pages: &[FlatPage]) -> Result<ClassificationSet> {
        let set = classify_pages(
            &self.classifier,
            &self.config.prompt_template,
            &self.config.task_description,
            pages,
        )?;
        render::write_json(&self.artifact(render::RESPONSE_FILE)?, &set.to_vec(), JsonFormat::Pretty)?;
        Ok(set)
    }

    /// Assemble the quiz; writes the final records.
    pub fn assemble(&self, index: &ExtractionIndex, set: &ClassificationSet) -> Result<Vec<QuizPage>> {
        let quiz = assemble_quiz(index, set, &self.config.pairing);
        render::write_json(&self.artifact(render::QUIZ_FILE)?, &quiz, JsonFormat::Pretty)?;
        Ok(quiz)
    }

    /// Run every stage in order.
    pub fn run(&self) -> Result<PipelineOutput> {
        self.config.validate()?;

        let index = self.extract()?;
        let flattened = self.flatten(&index)?;
        let classifications = self.classify(&flattened)?;
        let quiz = self.assemble(&index, &classifications)?;

        log::info!(
            "Pipeline complete: {} quiz pages written to {}",
            quiz.len(),
            self.config.output_dir.display()
        );

        Ok(PipelineOutput {
            index,
            flattened,
            classifications,
            quiz,
        })
    }

    /// Path of an artifact, creating the output directory if needed.
    fn artifact(&self, name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.config.output_dir)?;
        Ok(self.config.output_dir.join(name))
    }
}
