//! Google Gemini `generateContent` client
//!
//! API: https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent

use crate::model::{InlineData, LanguageModel};
use crate::{AnalysisError, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Multimodal model used for both text and vision prompts
pub const GEMINI_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Inline { inline_data: Blob<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct Blob<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(self) -> Option<String> {
        let parts = self.candidates.into_iter().next()?.content?.parts;
        let text: String = parts.into_iter().filter_map(|p| p.text).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

pub struct GeminiClient {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(AnalysisError::Config("Gemini API key is empty".to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| AnalysisError::Config(e.to_string()))?;

        Ok(Self {
            api_key: api_key.to_string(),
            http,
            base_url: GEMINI_API_URL.to_string(),
            model: GEMINI_MODEL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

fn build_request<'a>(prompt: &'a str, attachment: Option<&'a InlineData>) -> GenerateRequest<'a> {
    let mut parts = Vec::with_capacity(2);
    if let Some(data) = attachment {
        parts.push(Part::Inline {
            inline_data: Blob {
                mime_type: &data.mime_type,
                data: BASE64.encode(&data.data),
            },
        });
    }
    parts.push(Part::Text { text: prompt });

    GenerateRequest {
        contents: vec![Content { parts }],
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, attachment: Option<&InlineData>) -> Result<String> {
        debug!(
            model = %self.model,
            prompt_len = prompt.len(),
            attachment = ?attachment.map(|a| &a.mime_type),
            "Gemini generateContent request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&build_request(prompt, attachment))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Api { status, body });
        }

        let body: GenerateResponse = response.json().await?;
        body.text().ok_or(AnalysisError::EmptyResponse)
    }
}
