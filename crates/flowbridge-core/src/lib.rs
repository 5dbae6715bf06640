#![deny(missing_docs)]
//! Flowbridge core library.
//!
//! Shared data model, markup styling and the Voiceflow client used by the
//! runtime and the chat transports.

/// Configuration management.
pub mod config;
/// Error taxonomy.
pub mod error;
/// Markdown styling for cards.
pub mod markup;
/// Trace and request data model.
pub mod trace;
/// Voiceflow runtime client.
pub mod voiceflow;

pub use error::RelayError;
pub use trace::{Button, Card, InteractionRequest, Trace};
pub use voiceflow::{InteractionBackend, VoiceflowClient};
