//! Mock capabilities for tests: a narrator that records utterances and a
//! relay with scripted replies.

use super::client::{RelayApi, RelayReply};
use super::narration::{NarrationError, NarrationHandle, Narrator, Utterance};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// MockNarrator
// ============================================================================

#[derive(Default)]
struct NarrationLog {
    spoken: Vec<Utterance>,
    cancelled: usize,
    handles: Vec<Arc<AtomicBool>>,
}

/// Records every utterance; narrations run until cancelled or `finish_all`.
///
/// Clones share the same log, so a test can keep one clone while the store
/// owns another.
#[derive(Clone, Default)]
pub struct MockNarrator {
    log: Arc<Mutex<NarrationLog>>,
    unavailable: bool,
}

impl MockNarrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Narrator whose `speak` always fails.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Texts spoken so far, in order.
    pub fn spoken(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .spoken
            .iter()
            .map(|u| u.text.clone())
            .collect()
    }

    pub fn last_utterance(&self) -> Option<Utterance> {
        self.log.lock().unwrap().spoken.last().cloned()
    }

    pub fn cancel_count(&self) -> usize {
        self.log.lock().unwrap().cancelled
    }

    /// Number of narrations neither finished nor cancelled.
    pub fn active_count(&self) -> usize {
        self.log
            .lock()
            .unwrap()
            .handles
            .iter()
            .filter(|f| !f.load(Ordering::SeqCst))
            .count()
    }

    /// Let every running narration end on its own.
    pub fn finish_all(&self) {
        for flag in &self.log.lock().unwrap().handles {
            flag.store(true, Ordering::SeqCst);
        }
    }
}

struct MockHandle {
    finished: Arc<AtomicBool>,
    log: Arc<Mutex<NarrationLog>>,
}

impl NarrationHandle for MockHandle {
    fn is_finished(&mut self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    fn cancel(&mut self) {
        if !self.finished.swap(true, Ordering::SeqCst) {
            self.log.lock().unwrap().cancelled += 1;
        }
    }
}

impl Narrator for MockNarrator {
    fn speak(&self, utterance: &Utterance) -> Result<Box<dyn NarrationHandle>, NarrationError> {
        if self.unavailable {
            return Err(NarrationError::Unavailable);
        }

        let finished = Arc::new(AtomicBool::new(false));
        let mut log = self.log.lock().unwrap();
        log.spoken.push(utterance.clone());
        log.handles.push(Arc::clone(&finished));

        Ok(Box::new(MockHandle {
            finished,
            log: Arc::clone(&self.log),
        }))
    }
}

// ============================================================================
// MockRelay
// ============================================================================

/// Relay with scripted outcomes. When the script runs out it echoes the
/// message back.
#[derive(Default)]
pub struct MockRelay {
    script: Mutex<VecDeque<Result<RelayReply, String>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, message: Option<&str>, wpm: Option<f64>) {
        self.script.lock().unwrap().push_back(Ok(RelayReply {
            message: message.map(str::to_string),
            wpm,
        }));
    }

    pub fn push_failure(&self, error: &str) {
        self.script.lock().unwrap().push_back(Err(error.to_string()));
    }

    /// `(message, session_id)` pairs received, in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RelayApi for MockRelay {
    async fn send(&self, message: &str, session_id: &str) -> Result<RelayReply> {
        self.calls
            .lock()
            .unwrap()
            .push((message.to_string(), session_id.to_string()));

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(e)) => Err(anyhow!(e)),
            None => Ok(RelayReply {
                message: Some(format!("echo: {}", message)),
                wpm: None,
            }),
        }
    }
}
