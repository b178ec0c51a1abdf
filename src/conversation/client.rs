//! Relay client and the async send workflow

use super::store::ConversationStore;
use super::types::SubmitOutcome;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Reply body of `POST /api/server`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RelayReply {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub wpm: Option<f64>,
}

/// Transport to the relay server.
#[async_trait]
pub trait RelayApi: Send + Sync {
    /// Send one user message for `session_id` and return the decoded reply.
    /// `Err` means the reply never arrived or was not JSON.
    async fn send(&self, message: &str, session_id: &str) -> Result<RelayReply>;
}

#[derive(Serialize)]
struct RelayRequestBody<'a> {
    message: &'a str,
    session_id: &'a str,
}

/// HTTP implementation of [`RelayApi`].
pub struct HttpRelayClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpRelayClient {
    pub fn new(server_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            endpoint: format!("{}/api/server", server_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RelayApi for HttpRelayClient {
    async fn send(&self, message: &str, session_id: &str) -> Result<RelayReply> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&RelayRequestBody {
                message,
                session_id,
            })
            .send()
            .await
            .with_context(|| format!("Failed to reach relay at {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Relay answered with status {}", status);
        }

        // Error bodies are JSON too; a body without `message` is the caller's concern
        response
            .json::<RelayReply>()
            .await
            .context("Relay reply was not valid JSON")
    }
}

/// Drives the send workflow: append, wait, relay, complete.
///
/// The store lock is released across the delay and the relay call, so the
/// view can keep reading state (and see `is_loading`) while a request is out.
#[derive(Clone)]
pub struct ChatController {
    store: Arc<Mutex<ConversationStore>>,
    relay: Arc<dyn RelayApi>,
    response_delay: Duration,
}

impl ChatController {
    pub fn new(
        store: ConversationStore,
        relay: Arc<dyn RelayApi>,
        response_delay: Duration,
    ) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            relay,
            response_delay,
        }
    }

    pub fn store(&self) -> &Arc<Mutex<ConversationStore>> {
        &self.store
    }

    /// Submit `text` as a user message and wait for the assistant reply.
    ///
    /// Returns the index of the appended assistant message when a request was
    /// sent, `None` when the input was blank or another request is in flight.
    pub async fn submit(&self, text: &str) -> Option<usize> {
        let pending = match self.store.lock().await.append_user_message(text) {
            SubmitOutcome::Sent(pending) => pending,
            SubmitOutcome::Ignored => return None,
            SubmitOutcome::Busy => {
                debug!("Submit ignored while a request is outstanding");
                return None;
            }
        };

        if !self.response_delay.is_zero() {
            tokio::time::sleep(self.response_delay).await;
        }

        let outcome = self
            .relay
            .send(&pending.question, &pending.session_id)
            .await;

        self.store
            .lock()
            .await
            .complete_request(pending.token, outcome)
    }

    /// Submit the contents of a text file as the next user message.
    pub async fn submit_file(&self, path: impl AsRef<Path>) -> Result<Option<usize>> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(self.submit(&text).await)
    }
}
