//! Generative text proxy.
//!
//! The service forwards a prompt plus the session text to a hosted model and
//! hands the reply back to the client. Transcripts are persisted by clients
//! through the session chat endpoint, never here.

use crate::models::AiConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI service is not configured")]
    NotConfigured,

    #[error("AI request failed: {0}")]
    Request(String),

    #[error("API Error: {0}")]
    Api(String),

    #[error("Model returned an empty response (possibly blocked by safety filters)")]
    EmptyResponse,
}

/// Text-in, text-out model
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Answer `prompt`, optionally grounded on `context`
    async fn ask(&self, prompt: &str, context: &str) -> Result<String, AiError>;
}

/// Combine the user's prompt with the shared text
pub fn compose_prompt(prompt: &str, context: &str) -> String {
    if context.is_empty() {
        prompt.to_string()
    } else {
        format!("Context: {}\n\nTask: {}", context, prompt)
    }
}

/// Client for the Gemini `generateContent` REST endpoint
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AiError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build a client from configuration; `None` when no API key is set
    pub fn from_config(config: &AiConfig) -> Result<Option<Self>, AiError> {
        match config.api_key.as_deref() {
            Some(key) if !key.is_empty() => Self::new(
                key,
                config.model.clone(),
                config.base_url.clone(),
                Duration::from_secs(config.timeout_secs),
            )
            .map(Some),
            _ => Ok(None),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }
}

#[async_trait]
impl TextModel for GeminiClient {
    async fn ask(&self, prompt: &str, context: &str) -> Result<String, AiError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: compose_prompt(prompt, context),
                }],
            }],
        };

        debug!("Sending prompt to model {}", self.model);

        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                // The URL carries the API key
                let e = e.without_url();
                error!("AI request failed: {}", e);
                AiError::Request(e.to_string())
            })?;

        // The API reports failures in the body, with or without an error status
        let status = response.status();
        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            AiError::Request(format!("Failed to parse AI response ({}): {}", status, e))
        })?;

        extract_reply(body)
    }
}

fn extract_reply(body: GenerateContentResponse) -> Result<String, AiError> {
    if let Some(err) = body.error {
        let message = err.message.unwrap_or_else(|| "unknown error".to_string());
        error!("AI API error: {}", message);
        return Err(AiError::Api(message));
    }

    body.candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| {
            warn!("AI response blocked or empty");
            AiError::EmptyResponse
        })
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}
