//! GenerativeModel trait definition
//!
//! Async trait + Send + Sync so the relay can hold an `Arc<dyn GenerativeModel>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Who authored a turn in the server-side history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One role-tagged text turn sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Every way a call to the external model can fail.
///
/// The relay never surfaces these to its callers; they are logged and
/// replaced by a fallback reply.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to reach generative API: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("generative API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed generative API response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("generative API response contained no candidate text")]
    EmptyCandidate,

    #[error("generative API key is not configured")]
    MissingApiKey,
}

/// Abstract interface for a hosted completion model.
///
/// # Implementations
///
/// - [`GeminiClient`](super::GeminiClient): HTTP client for the Gemini
///   `generateContent` endpoint
/// - [`MockModel`](super::MockModel): scripted replies, records every history
///   it was called with
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Generate the next reply for the ordered history.
    ///
    /// Returns the first candidate's first text part.
    async fn generate(&self, turns: &[Turn]) -> Result<String, ModelError>;

    /// The name of the model being used (reported by `/health`).
    fn model_name(&self) -> &str;
}
