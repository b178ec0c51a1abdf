//! Conversation types: messages, statistics, and send-workflow outcomes

use super::markup;
use serde::{Deserialize, Serialize};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// One entry of the conversation log.
///
/// `content` is plain text for user messages and rendered markup for
/// assistant replies. `wpm` is the reading speed attached to the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub content: String,
    pub wpm: Option<f64>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            content: content.into(),
            wpm: None,
        }
    }

    pub fn assistant(content: impl Into<String>, wpm: Option<f64>) -> Self {
        Self {
            sender: Sender::Assistant,
            content: content.into(),
            wpm,
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.sender == Sender::Assistant
    }

    /// Content with markup removed (what gets counted and narrated).
    pub fn plain_text(&self) -> String {
        markup::strip_html(&self.content)
    }
}

/// Statistics derived from the message log.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Statistics {
    /// Word count over the plain text of all assistant messages
    pub total_words: usize,
    /// Mean of all non-null `wpm` values, or `current_wpm` when there are none
    pub average_wpm: f64,
}

impl Statistics {
    /// Pure function of the log and the current reading speed.
    pub fn compute(messages: &[Message], current_wpm: f64) -> Self {
        let total_words = messages
            .iter()
            .filter(|m| m.is_assistant())
            .map(|m| markup::word_count(&m.content))
            .sum();

        let wpms: Vec<f64> = messages.iter().filter_map(|m| m.wpm).collect();
        let average_wpm = if wpms.is_empty() {
            current_wpm
        } else {
            wpms.iter().sum::<f64>() / wpms.len() as f64
        };

        Self {
            total_words,
            average_wpm,
        }
    }
}

/// Identifies the single outstanding relay request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(pub(crate) u64);

/// A submitted user message waiting to be sent to the relay.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub token: RequestToken,
    /// The trimmed text of the user message
    pub question: String,
    /// Relay session this conversation belongs to
    pub session_id: String,
}

/// What happened to a submit.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Empty or whitespace-only input: nothing changed
    Ignored,
    /// A request is already outstanding: nothing changed
    Busy,
    /// The user message was appended and a request is now outstanding
    Sent(PendingRequest),
}

/// Result of `toggle_speech`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationState {
    /// Narration of the requested message started
    Started,
    /// The requested message was already being narrated and is now stopped
    Stopped,
    /// No narration capability: an informational message was appended
    Unavailable,
    /// Index out of range, not an assistant message, or nothing to read
    Ignored,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_format() {
        let msg = Message::user("hi");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            serde_json::json!({"sender": "user", "content": "hi", "wpm": null})
        );

        let msg: Message =
            serde_json::from_str(r#"{"sender":"assistant","content":"<p>ok</p>","wpm":300}"#)
                .unwrap();
        assert_eq!(msg, Message::assistant("<p>ok</p>", Some(300.0)));
    }

    #[test]
    fn test_average_falls_back_to_current_wpm() {
        let messages = vec![Message::assistant("a", None), Message::user("b")];
        let stats = Statistics::compute(&messages, 250.0);
        assert_eq!(stats.average_wpm, 250.0);
    }

    #[test]
    fn test_average_of_non_null_wpm() {
        let messages = vec![
            Message::assistant("a", Some(200.0)),
            Message::user("b"),
            Message::assistant("c", Some(300.0)),
        ];
        let stats = Statistics::compute(&messages, 999.0);
        assert_eq!(stats.average_wpm, 250.0);
    }

    #[test]
    fn test_total_words_counts_assistant_plain_text_only() {
        let messages = vec![
            Message::assistant("<p>Read <strong>three</strong> words</p>", None),
            Message::user("these four are ignored"),
            Message::assistant("two words", Some(250.0)),
        ];
        let stats = Statistics::compute(&messages, 250.0);
        assert_eq!(stats.total_words, 5);
    }

    #[test]
    fn test_compute_is_idempotent() {
        let messages = vec![
            Message::assistant("<p>hello there</p>", Some(180.0)),
            Message::assistant("general kenobi", Some(220.0)),
        ];
        let first = Statistics::compute(&messages, 250.0);
        let second = Statistics::compute(&messages, 250.0);
        assert_eq!(first, second);
    }
}
