//! Relay configuration

use std::time::Duration;

/// Instruction text prefixed to every user message sent to the model.
pub const DEFAULT_PERSONA: &str = "You are a focused speed-reading coach. \
Help the user read faster while keeping comprehension: explain techniques such as \
reducing subvocalization, chunking, previewing, and guided pacing, and suggest short \
drills with concrete target speeds in words per minute. \
Keep answers concise and practical, adapting detail to the user's level. \
If the user asks about anything unrelated to reading speed or comprehension, reply: \
\"I'm sorry, I can only help with speed reading and comprehension. \
Would you like a reading drill?\"";

/// Configuration for the relay service
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Persona prefixed to every user message
    pub persona: String,
    /// Sessions idle longer than this are evicted
    pub session_timeout: Duration,
    /// Maximum turns kept per session history (oldest exchanges dropped first)
    pub max_history_turns: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            persona: DEFAULT_PERSONA.into(),
            session_timeout: Duration::from_secs(1800),
            max_history_turns: 100,
        }
    }
}
