//! ConversationStore: the persisted message log and everything derived from it

use super::client::RelayReply;
use super::markup;
use super::narration::{NarrationHandle, Narrator, Utterance};
use super::storage::{KeyValueStore, MESSAGES_KEY, SESSION_COUNT_KEY, SESSION_ID_KEY};
use super::types::{
    Message, NarrationState, PendingRequest, RequestToken, Statistics, SubmitOutcome,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const WELCOME_MESSAGE: &str = "Hello! I'm your Speed Reading AI assistant. I can help you \
improve your reading speed and comprehension. What would you like to learn today?";
pub const CONNECTION_ERROR_REPLY: &str =
    "Sorry, I had trouble connecting to the server. Please try again later.";
pub const PROCESSING_ERROR_REPLY: &str =
    "Sorry, I encountered an error processing your request.";
pub const NARRATION_UNAVAILABLE_REPLY: &str = "Text-to-Speech is not available on this system.";

/// Reading speed assumed until a reply says otherwise
pub const DEFAULT_WPM: f64 = 250.0;

/// Current layout of the persisted message log
const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct PersistedLog<'a> {
    version: u32,
    messages: &'a [Message],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredLog {
    Versioned { version: u32, messages: Vec<Message> },
    /// Bare array written before the log carried a version
    Legacy(Vec<Message>),
}

/// Decode a persisted log, flagging whether it used the legacy layout.
/// `Err` carries the reason it was rejected.
fn decode_log(raw: &str) -> Result<(Vec<Message>, bool), String> {
    let (messages, legacy) = match serde_json::from_str::<StoredLog>(raw) {
        Ok(StoredLog::Versioned {
            version: SCHEMA_VERSION,
            messages,
        }) => (messages, false),
        Ok(StoredLog::Versioned { version, .. }) => {
            return Err(format!("unsupported schema version {}", version))
        }
        Ok(StoredLog::Legacy(messages)) => {
            info!("Migrating unversioned message log ({} messages)", messages.len());
            (messages, true)
        }
        Err(e) => return Err(e.to_string()),
    };

    if messages.is_empty() {
        return Err("empty message log".to_string());
    }
    Ok((messages, legacy))
}

struct ActiveNarration {
    index: usize,
    handle: Box<dyn NarrationHandle>,
}

/// Owns the conversation state and keeps it persisted and consistent.
pub struct ConversationStore {
    storage: Arc<dyn KeyValueStore>,
    narrator: Option<Box<dyn Narrator>>,
    messages: Vec<Message>,
    user_input: String,
    current_wpm: f64,
    stats: Statistics,
    session_count: u64,
    session_id: String,
    in_flight: Option<RequestToken>,
    next_token: u64,
    narration: Option<ActiveNarration>,
}

impl ConversationStore {
    /// Activate the store: restore (or seed) the log, bump the session count,
    /// and compute statistics. Never fails; unreadable state falls back to
    /// the seed conversation.
    pub fn initialize(
        storage: Arc<dyn KeyValueStore>,
        narrator: Option<Box<dyn Narrator>>,
        default_wpm: f64,
    ) -> Self {
        let restored = match storage.get(MESSAGES_KEY) {
            Ok(Some(raw)) => match decode_log(&raw) {
                Ok(decoded) => Some(decoded),
                Err(reason) => {
                    warn!("Discarding persisted messages: {}", reason);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read persisted messages: {}", e);
                None
            }
        };
        let (messages, migrate) = restored
            .unwrap_or_else(|| (vec![Message::assistant(WELCOME_MESSAGE, None)], false));

        let previous_count = match storage.get(SESSION_COUNT_KEY) {
            Ok(Some(raw)) => raw.trim().parse::<u64>().unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                warn!("Failed to read session count: {}", e);
                0
            }
        };

        let session_id = match storage.get(SESSION_ID_KEY) {
            Ok(Some(id)) if !id.trim().is_empty() => id.trim().to_string(),
            _ => {
                let id = Uuid::new_v4().to_string();
                if let Err(e) = storage.set(SESSION_ID_KEY, &id) {
                    warn!("Failed to persist session id: {}", e);
                }
                id
            }
        };

        let mut store = Self {
            storage,
            narrator,
            messages,
            user_input: String::new(),
            current_wpm: default_wpm,
            stats: Statistics::default(),
            session_count: previous_count.saturating_add(1),
            session_id,
            in_flight: None,
            next_token: 0,
            narration: None,
        };

        if let Err(e) = store
            .storage
            .set(SESSION_COUNT_KEY, &store.session_count.to_string())
        {
            warn!("Failed to persist session count: {}", e);
        }
        if migrate {
            store.persist_messages();
        }
        store.recompute_statistics();

        debug!(
            session_count = store.session_count,
            messages = store.messages.len(),
            "Conversation store initialized"
        );
        store
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn user_input(&self) -> &str {
        &self.user_input
    }

    pub fn set_user_input(&mut self, text: impl Into<String>) {
        self.user_input = text.into();
    }

    /// True while a relay request is outstanding.
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn current_wpm(&self) -> f64 {
        self.current_wpm
    }

    pub fn statistics(&self) -> Statistics {
        self.stats
    }

    pub fn total_words(&self) -> usize {
        self.stats.total_words
    }

    pub fn average_wpm(&self) -> f64 {
        self.stats.average_wpm
    }

    pub fn session_count(&self) -> u64 {
        self.session_count
    }

    /// Relay session this conversation belongs to (stable across activations).
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Index of the message being narrated. Natural completion is only
    /// observed after [`refresh_narration`](Self::refresh_narration).
    pub fn speaking_index(&self) -> Option<usize> {
        self.narration.as_ref().map(|n| n.index)
    }

    pub fn has_narrator(&self) -> bool {
        self.narrator.is_some()
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Submit whatever is currently in the input field.
    pub fn submit(&mut self) -> SubmitOutcome {
        let text = self.user_input.clone();
        self.append_user_message(&text)
    }

    /// Append a user message and open the send workflow.
    ///
    /// Blank input is ignored and a submit while a request is outstanding is
    /// rejected; neither touches the log or storage.
    pub fn append_user_message(&mut self, text: &str) -> SubmitOutcome {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return SubmitOutcome::Ignored;
        }
        if self.in_flight.is_some() {
            debug!("Submit rejected: a request is already outstanding");
            return SubmitOutcome::Busy;
        }

        self.messages.push(Message::user(trimmed));
        self.persist_messages();
        self.recompute_statistics();
        self.user_input.clear();

        self.next_token += 1;
        let token = RequestToken(self.next_token);
        self.in_flight = Some(token);

        SubmitOutcome::Sent(PendingRequest {
            token,
            question: trimmed.to_string(),
            session_id: self.session_id.clone(),
        })
    }

    /// Append an assistant message. A provided `wpm` becomes the current
    /// reading speed; otherwise the message carries the current one.
    /// Returns the new message's index.
    pub fn append_assistant_message(&mut self, content: impl Into<String>, wpm: Option<f64>) -> usize {
        self.messages
            .push(Message::assistant(content, Some(wpm.unwrap_or(self.current_wpm))));
        self.persist_messages();
        if let Some(wpm) = wpm {
            self.current_wpm = wpm;
        }
        self.recompute_statistics();
        self.messages.len() - 1
    }

    /// Resolve the outstanding request with the relay's outcome.
    ///
    /// Returns the index of the appended assistant message, or `None` when
    /// `token` is not the outstanding request.
    pub fn complete_request(
        &mut self,
        token: RequestToken,
        outcome: anyhow::Result<RelayReply>,
    ) -> Option<usize> {
        if self.in_flight != Some(token) {
            warn!(?token, "Ignoring completion of a request that is not outstanding");
            return None;
        }
        self.in_flight = None;

        let index = match outcome {
            Ok(RelayReply {
                message: Some(message),
                wpm,
            }) if !message.trim().is_empty() => {
                self.append_assistant_message(markup::render_markdown(&message), wpm)
            }
            Ok(_) => {
                warn!("Relay reply carried no message");
                self.append_assistant_message(PROCESSING_ERROR_REPLY, None)
            }
            Err(e) => {
                warn!("Error fetching response: {:#}", e);
                self.append_assistant_message(CONNECTION_ERROR_REPLY, None)
            }
        };
        Some(index)
    }

    /// Recompute derived statistics from the log.
    pub fn recompute_statistics(&mut self) -> Statistics {
        self.stats = Statistics::compute(&self.messages, self.current_wpm);
        self.stats
    }

    /// Start, switch, or stop narration of the message at `index`.
    pub fn toggle_speech(&mut self, index: usize) -> NarrationState {
        self.refresh_narration();

        if let Some(mut active) = self.narration.take() {
            active.handle.cancel();
            if active.index == index {
                return NarrationState::Stopped;
            }
        }

        let text = match self.messages.get(index) {
            Some(message) if message.is_assistant() => message.plain_text(),
            _ => return NarrationState::Ignored,
        };
        let text = text.trim();
        if text.is_empty() {
            return NarrationState::Ignored;
        }

        let started = match &self.narrator {
            Some(narrator) => narrator.speak(&Utterance::new(text)).map_err(|e| {
                warn!("Narration failed to start: {}", e);
            }),
            None => Err(()),
        };

        match started {
            Ok(handle) => {
                self.narration = Some(ActiveNarration { index, handle });
                NarrationState::Started
            }
            Err(()) => {
                self.append_assistant_message(NARRATION_UNAVAILABLE_REPLY, None);
                NarrationState::Unavailable
            }
        }
    }

    /// Clear the narration if it ended on its own. Returns the speaking index.
    pub fn refresh_narration(&mut self) -> Option<usize> {
        if let Some(active) = self.narration.as_mut() {
            if active.handle.is_finished() {
                debug!(index = active.index, "Narration finished");
                self.narration = None;
            }
        }
        self.speaking_index()
    }

    /// Stop any narration (used on shutdown).
    pub fn stop_narration(&mut self) {
        if let Some(mut active) = self.narration.take() {
            active.handle.cancel();
        }
    }

    fn persist_messages(&self) {
        let log = PersistedLog {
            version: SCHEMA_VERSION,
            messages: &self.messages,
        };
        let result = serde_json::to_string(&log)
            .map_err(|e| e.to_string())
            .and_then(|json| {
                self.storage
                    .set(MESSAGES_KEY, &json)
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = result {
            warn!("Failed to persist messages: {}", e);
        }
    }
}
