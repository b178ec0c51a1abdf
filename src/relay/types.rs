//! Relay wire types: request/response bodies of `POST /api/server`

use serde::{Deserialize, Serialize};

/// Session used by callers that do not send a `session_id`.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Body of `POST /api/server`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayRequest {
    /// The user's message (absent, null, or empty is a 400)
    #[serde(default)]
    pub message: Option<String>,
    /// Conversation to append to (shared `default` session if absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl RelayRequest {
    /// The message, if present and non-empty.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }

    /// The session to use, falling back to the shared default.
    pub fn session_id(&self) -> &str {
        self.session_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SESSION_ID)
    }
}

/// Successful relay reply. `wpm` is an optional reading-speed hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wpm: Option<f64>,
}
