//! Test helper factories and mock state builders
//!
//! Provides convenience functions for creating test objects with sensible defaults,
//! and helpers for building mock AppState / router / conversation instances.
#![allow(dead_code)]

use crate::conversation::store::DEFAULT_WPM;
use crate::conversation::{ClientConfig, ConversationStore, MemoryStore};
use crate::model::gemini::ModelSettings;
use crate::model::MockModel;
use crate::relay::RelayConfig;
use crate::{AppState, Config};
use std::sync::Arc;

// ============================================================================
// Mock state builders
// ============================================================================

/// Config with defaults and no API key
pub fn test_config() -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        model: ModelSettings::default(),
        relay: RelayConfig {
            persona: "You are a test coach.".to_string(),
            ..RelayConfig::default()
        },
        client: ClientConfig::default(),
    }
}

/// Create a mock AppState whose model echoes the last user turn
pub fn mock_app_state() -> AppState {
    mock_app_state_with(Arc::new(MockModel::new()))
}

/// Create a mock AppState around a pre-scripted model
pub fn mock_app_state_with(model: Arc<MockModel>) -> AppState {
    AppState::with_model(test_config(), model)
}

// ============================================================================
// Conversation
// ============================================================================

/// A conversation over fresh in-memory storage, without narration
pub fn test_conversation() -> (Arc<MemoryStore>, ConversationStore) {
    let storage = Arc::new(MemoryStore::new());
    let store = ConversationStore::initialize(storage.clone(), None, DEFAULT_WPM);
    (storage, store)
}
