//! RelayService: persona-prefixed forwarding to the generative model

use super::config::RelayConfig;
use super::history::HistoryStore;
use crate::model::{GenerativeModel, Turn};
use std::sync::Arc;
use tracing::{debug, error};

/// Reply returned whenever the model call fails in any way.
pub const FALLBACK_REPLY: &str = "Sorry, something went wrong.";

pub struct RelayService {
    model: Arc<dyn GenerativeModel>,
    histories: Arc<HistoryStore>,
    config: RelayConfig,
}

impl RelayService {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        histories: Arc<HistoryStore>,
        config: RelayConfig,
    ) -> Self {
        Self {
            model,
            histories,
            config,
        }
    }

    pub fn histories(&self) -> &Arc<HistoryStore> {
        &self.histories
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// The text actually sent to the model for `message`.
    pub fn personalize(&self, message: &str) -> String {
        format!("{} {}", self.config.persona, message)
    }

    /// Relay one user message within `session_id`.
    ///
    /// Never fails: any downstream error is logged and replaced by
    /// [`FALLBACK_REPLY`]. On failure the user turn is removed again so the
    /// history keeps alternating user/model turns.
    pub async fn relay(&self, session_id: &str, message: &str) -> String {
        let session = self.histories.session(session_id).await;
        let mut history = session.lock().await;

        history.push(Turn::user(self.personalize(message)));
        debug!(session_id, turns = history.len(), "Relaying message");

        match self.model.generate(history.turns()).await {
            Ok(reply) => {
                history.push(Turn::model(reply.clone()));
                history.truncate_front(self.config.max_history_turns);
                reply
            }
            Err(e) => {
                error!(session_id, "Error generating content: {}", e);
                history.pop();
                FALLBACK_REPLY.to_string()
            }
        }
    }
}
