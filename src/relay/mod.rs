//! Relay service: bridges one user message to a per-session conversation
//! with the external generative model.
//!
//! Architecture:
//! - `HistoryStore` keeps one history per session id, each behind its own lock
//! - `RelayService` prefixes the persona, calls the model, and swallows every
//!   downstream failure into a fixed fallback reply
//! - A cleanup task periodically evicts idle sessions

pub mod config;
pub mod history;
pub mod service;
pub mod types;

pub use config::RelayConfig;
pub use history::{HistoryStore, SessionHistory};
pub use service::{RelayService, FALLBACK_REPLY};
pub use types::{RelayRequest, RelayResponse, DEFAULT_SESSION_ID};
