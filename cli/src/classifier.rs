//! Chat-completions classifier over HTTP.

use serde::Deserialize;
use serde_json::json;

use sheetquiz::classify::SYSTEM_MESSAGE;
use sheetquiz::{Classifier, ClassifierCredentials, Error, PipelineConfig, Result};

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

/// Classifier backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatClassifier {
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    credentials: ClassifierCredentials,
}

impl ChatClassifier {
    pub fn new(credentials: ClassifierCredentials) -> Result<Self> {
        credentials.validate()?;

        let runtime = tokio::runtime::Runtime::new()?;

        Ok(Self {
            client: reqwest::Client::new(),
            runtime,
            credentials,
        })
    }

    /// Classifier for the credentials held by a pipeline configuration.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::new(config.classifier.clone())
    }

    fn endpoint(&self) -> String {
        let base = self.credentials.base_url.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }

    async fn request(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.credentials.model,
            "messages": [
                { "role": "system", "content": SYSTEM_MESSAGE },
                { "role": "user", "content": prompt }
            ],
            "stream": false
        });

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.credentials.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Classifier(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Classifier(format!("API error ({}): {}", status, text)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Classifier(format!("Failed to parse JSON: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Classifier("Invalid response format".to_string()))
    }
}

impl Classifier for ChatClassifier {
    fn classify(&self, prompt: &str) -> Result<String> {
        log::debug!("POST {} (model {})", self.endpoint(), self.credentials.model);
        self.runtime.block_on(self.request(prompt))
    }
}
