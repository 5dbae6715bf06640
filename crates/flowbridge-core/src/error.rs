//! Error taxonomy for one relay turn.

use thiserror::Error;

/// Errors that can occur while relaying a turn
///
/// None of these abort the process: a backend failure aborts the current
/// turn, the other two only skip the affected trace or call.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The backend call failed, timed out or returned an unusable body
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),
    /// A known trace kind is missing a required field
    #[error("Malformed {kind} trace: {reason}")]
    MalformedTrace {
        /// Trace kind as received (`cardV2`, `choice`, ...)
        kind: String,
        /// Decoder message
        reason: String,
    },
    /// The chat platform rejected a send or edit call
    #[error("Transport error: {0}")]
    Transport(String),
}

impl RelayError {
    /// Wrap a transport failure.
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}
