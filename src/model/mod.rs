//! Generative model access
//!
//! The relay talks to the external completion API through one seam
//! (trait + impl + mock):
//! - `GenerativeModel` trait: async interface taking the role-tagged history
//! - `GeminiClient`: real implementation over the `generateContent` REST API
//! - `MockModel`: scripted replies and failures for tests

pub mod gemini;
pub mod mock;
pub mod traits;

pub use gemini::GeminiClient;
pub use mock::MockModel;
pub use traits::{GenerativeModel, ModelError, Role, Turn};
