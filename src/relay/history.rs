//! Per-session conversation histories held in server memory.
//!
//! Each session lives behind its own `Mutex` so a request holds its session
//! for the whole model round trip (turns stay paired) while other sessions
//! proceed in parallel. Nothing is persisted.

use crate::model::Turn;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// One session's ordered turns.
#[derive(Debug)]
pub struct SessionHistory {
    turns: Vec<Turn>,
    last_activity: Instant,
}

impl SessionHistory {
    fn new() -> Self {
        Self {
            turns: Vec::new(),
            last_activity: Instant::now(),
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.last_activity = Instant::now();
    }

    /// Drop the most recent turn (used to undo a user turn whose reply failed).
    pub fn pop(&mut self) -> Option<Turn> {
        self.turns.pop()
    }

    /// Drop the oldest turns until at most `max` remain.
    ///
    /// Turns are removed in user/model pairs so the history still starts with
    /// a user turn.
    pub fn truncate_front(&mut self, max: usize) {
        if self.turns.len() <= max {
            return;
        }
        let mut excess = self.turns.len() - max;
        if excess % 2 == 1 {
            excess += 1;
        }
        let excess = excess.min(self.turns.len());
        self.turns.drain(..excess);
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }
}

/// Manages session histories and their lifecycle
pub struct HistoryStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<SessionHistory>>>>,
    idle_timeout: Duration,
}

impl HistoryStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Get the history for `session_id`, creating an empty one if needed.
    ///
    /// The session's activity is refreshed while the map lock is held, so an
    /// eviction pass cannot remove it before the caller locks it.
    pub async fn session(&self, session_id: &str) -> Arc<Mutex<SessionHistory>> {
        {
            let sessions = self.sessions.read().await;
            if let Some(existing) = sessions.get(session_id) {
                Self::refresh(existing);
                return Arc::clone(existing);
            }
        }

        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(session_id.to_string()).or_insert_with(|| {
            debug!(session_id, "Opening relay session");
            Arc::new(Mutex::new(SessionHistory::new()))
        });
        Self::refresh(session);
        Arc::clone(session)
    }

    /// A locked session is in use and never evicted, so only idle ones need it.
    fn refresh(session: &Arc<Mutex<SessionHistory>>) {
        if let Ok(mut history) = session.try_lock() {
            history.touch();
        }
    }

    /// Snapshot of a session's turns (empty if the session does not exist).
    pub async fn turns(&self, session_id: &str) -> Vec<Turn> {
        let session = self.sessions.read().await.get(session_id).cloned();
        match session {
            Some(s) => s.lock().await.turns().to_vec(),
            None => Vec::new(),
        }
    }

    /// Get the number of sessions currently held
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Remove sessions idle longer than the timeout. Sessions locked by an
    /// in-flight request are never evicted.
    pub async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let timeout = self.idle_timeout;
        sessions.retain(|_, s| match s.try_lock() {
            Ok(history) => history.idle_for() <= timeout,
            Err(_) => true,
        });
        before - sessions.len()
    }

    /// Start a background task that evicts idle sessions
    pub fn start_cleanup_task(self: &Arc<Self>) {
        let store = Arc::clone(self);
        let interval = store.idle_timeout / 2; // Check at half the timeout interval

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
            loop {
                ticker.tick().await;
                let evicted = store.evict_idle().await;
                if evicted > 0 {
                    info!("Evicted {} idle relay session(s)", evicted);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_created_once() {
        let store = HistoryStore::new(Duration::from_secs(60));
        let a = store.session("a").await;
        a.lock().await.push(Turn::user("hi"));

        let again = store.session("a").await;
        assert_eq!(again.lock().await.len(), 1);
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = HistoryStore::new(Duration::from_secs(60));
        store.session("a").await.lock().await.push(Turn::user("for a"));
        store.session("b").await.lock().await.push(Turn::user("for b"));

        assert_eq!(store.turns("a").await, vec![Turn::user("for a")]);
        assert_eq!(store.turns("b").await, vec![Turn::user("for b")]);
        assert!(store.turns("missing").await.is_empty());
    }

    #[tokio::test]
    async fn test_evict_idle() {
        let store = HistoryStore::new(Duration::from_millis(20));
        store.session("old").await.lock().await.push(Turn::user("x"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        store.session("fresh").await.lock().await.push(Turn::user("y"));

        assert_eq!(store.evict_idle().await, 1);
        assert_eq!(store.session_count().await, 1);
        assert!(store.turns("old").await.is_empty());
        assert_eq!(store.turns("fresh").await.len(), 1);
    }

    #[tokio::test]
    async fn test_fetched_session_survives_eviction_before_lock() {
        let store = HistoryStore::new(Duration::from_millis(20));
        store.session("s").await.lock().await.push(Turn::user("q0"));
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Eviction runs between fetching the session and locking it
        let session = store.session("s").await;
        assert_eq!(store.evict_idle().await, 0);

        session.lock().await.push(Turn::model("a0"));
        assert_eq!(store.turns("s").await.len(), 2);
    }

    #[tokio::test]
    async fn test_locked_session_survives_eviction() {
        let store = HistoryStore::new(Duration::from_millis(10));
        let busy = store.session("busy").await;
        let guard = busy.lock().await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(store.evict_idle().await, 0);
        drop(guard);
        assert_eq!(store.evict_idle().await, 1);
    }

    #[test]
    fn test_truncate_front_keeps_pairs() {
        let mut history = SessionHistory::new();
        for i in 0..3 {
            history.push(Turn::user(format!("q{}", i)));
            history.push(Turn::model(format!("a{}", i)));
        }

        history.truncate_front(4);
        assert_eq!(history.len(), 4);
        assert_eq!(history.turns()[0], Turn::user("q1"));

        // Odd cap rounds the drop up to a whole exchange
        history.truncate_front(3);
        assert_eq!(history.turns(), &[Turn::user("q2"), Turn::model("a2")]);

        history.truncate_front(10);
        assert_eq!(history.len(), 2);
    }
}
