//! Gemini `generateContent` client
//!
//! Implements `GenerativeModel` against
//! `{base_url}/v1beta/models/{model}:generateContent`.
//!
//! Settings come from `Config` (config.yaml `model:` section) with env overrides:
//! - `GEMINI_API_KEY` (required for real calls)
//! - `GEMINI_MODEL` (default: `gemini-2.0-flash`)
//! - `GEMINI_BASE_URL` (default: `https://generativelanguage.googleapis.com`)
//! - `GEMINI_TIMEOUT_SECS` (default: `60`)

use super::traits::{GenerativeModel, ModelError, Turn};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection settings for the generative API.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// HTTP client for the Gemini REST API.
///
/// Cheaply cloneable (shares the reqwest client internally).
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    settings: ModelSettings,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
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
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Google-style error envelope
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl GeminiClient {
    pub fn new(settings: ModelSettings) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;

        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }
}

/// Pull the first candidate's first text part out of a response body.
fn first_candidate_text(body: &str) -> Result<String, ModelError> {
    let resp: GenerateResponse = serde_json::from_str(body)?;

    resp.candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or(ModelError::EmptyCandidate)
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, turns: &[Turn]) -> Result<String, ModelError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(ModelError::MissingApiKey)?;

        let request = GenerateRequest {
            contents: turns
                .iter()
                .map(|t| Content {
                    role: t.role.as_str(),
                    parts: [RequestPart { text: &t.text }],
                })
                .collect(),
        };

        debug!(
            model = %self.settings.model,
            turns = turns.len(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let body = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(ErrorResponse {
                    error: Some(detail),
                }) => detail.message,
                _ => body,
            };
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        first_candidate_text(&body)
    }

    fn model_name(&self) -> &str {
        &self.settings.model
    }
}
