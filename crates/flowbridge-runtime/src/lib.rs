#![deny(missing_docs)]
//! Flowbridge runtime.
//!
//! Transport-agnostic turn orchestration: trace rendering, callback
//! registry and the interaction dispatcher.

/// Interaction dispatcher (one turn per event).
pub mod dispatcher;
/// Pending button registry.
pub mod registry;
/// Trace renderer.
pub mod renderer;
/// Chat transport seam.
pub mod transport;
/// Fixed user-facing texts.
pub mod views;

#[cfg(test)]
mod testing;

pub use dispatcher::{ButtonOutcome, InteractionDispatcher};
pub use registry::{CallbackRegistry, MenuRetirement, PendingButton};
pub use renderer::{RenderReport, TraceRenderer};
pub use transport::{ChatTransport, InlineMenu, MenuButton, TypingIndicator};
