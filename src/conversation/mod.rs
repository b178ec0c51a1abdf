//! Client-side conversation state
//!
//! Architecture:
//! - `ConversationStore` owns the message log, derived statistics, the
//!   single-slot request token, and narration state
//! - Every mutation persists the whole log through a `KeyValueStore`
//!   (best-effort: write failures are logged, never fatal)
//! - `ChatController` runs the async send workflow against a `RelayApi`
//! - Capabilities are traits with real + mock implementations:
//!   `KeyValueStore` (`FileStore`, `MemoryStore`), `Narrator`
//!   (`CommandNarrator`, `MockNarrator`), `RelayApi` (`HttpRelayClient`,
//!   `MockRelay`)

pub mod client;
pub mod config;
pub mod markup;
pub mod mock;
pub mod narration;
pub mod storage;
pub mod store;
pub mod types;

pub use client::{ChatController, HttpRelayClient, RelayApi, RelayReply};
pub use config::ClientConfig;
pub use narration::{CommandNarrator, NarrationError, NarrationHandle, Narrator, Utterance};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use store::ConversationStore;
pub use types::{
    Message, NarrationState, PendingRequest, RequestToken, Sender, Statistics, SubmitOutcome,
};
