//! Scripted mock model for tests
//!
//! Replies are popped from a queue; once the queue is empty the mock echoes
//! the last user turn. Every history it receives is recorded so tests can
//! assert on exactly what the relay forwarded.

use super::traits::{GenerativeModel, ModelError, Role, Turn};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// One scripted outcome.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Fail,
    Empty,
}

#[derive(Default)]
pub struct MockModel {
    script: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<Vec<Turn>>>,
    delay: Option<Duration>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock that answers with the given texts, in order.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self::new();
        for reply in replies {
            mock.push(MockReply::Text(reply.into()));
        }
        mock
    }

    /// Mock whose every call fails with a transport-like error.
    pub fn failing() -> Self {
        let mock = Self::new();
        mock.push(MockReply::Fail);
        mock
    }

    /// Sleep this long inside every call (for concurrency tests).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, reply: MockReply) {
        self.script.lock().unwrap().push_back(reply);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Histories received, in call order.
    pub fn calls(&self) -> Vec<Vec<Turn>> {
        self.calls.lock().unwrap().clone()
    }

    fn next_reply(&self, turns: &[Turn]) -> MockReply {
        let mut script = self.script.lock().unwrap();
        match script.front() {
            // A lone Fail keeps failing
            Some(MockReply::Fail) if script.len() == 1 => MockReply::Fail,
            Some(_) => script.pop_front().unwrap_or(MockReply::Empty),
            None => {
                let last_user = turns
                    .iter()
                    .rev()
                    .find(|t| t.role == Role::User)
                    .map(|t| t.text.clone())
                    .unwrap_or_default();
                MockReply::Text(format!("echo: {}", last_user))
            }
        }
    }
}

#[async_trait]
impl GenerativeModel for MockModel {
    async fn generate(&self, turns: &[Turn]) -> Result<String, ModelError> {
        self.calls.lock().unwrap().push(turns.to_vec());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.next_reply(turns) {
            MockReply::Text(text) => Ok(text),
            MockReply::Fail => Err(ModelError::Status {
                status: 503,
                body: "mock upstream failure".to_string(),
            }),
            MockReply::Empty => Err(ModelError::EmptyCandidate),
        }
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
