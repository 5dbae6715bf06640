//! Fixed user-facing texts.

/// Texts produced by the relay itself rather than the backend
pub trait RelayView {
    /// Prompt shown above a `choice` menu
    fn choice_prompt() -> &'static str;

    /// Replacement text of a `choice` prompt once a button was pressed
    fn choice_made(label: &str) -> String;

    /// Text sent for `end` and `no-reply` traces
    fn conversation_over() -> &'static str;

    /// Apology sent when the backend call fails
    fn backend_unavailable() -> &'static str;

    /// Callback answer for a button whose menu is gone
    fn menu_expired() -> &'static str;
}

/// Default English texts
pub struct DefaultRelayView;

impl RelayView for DefaultRelayView {
    fn choice_prompt() -> &'static str {
        "Make Choice:"
    }

    fn choice_made(label: &str) -> String {
        format!("Your choice: *{label}*")
    }

    fn conversation_over() -> &'static str {
        "Conversation is over"
    }

    fn backend_unavailable() -> &'static str {
        "Sorry, I can't reach the assistant right now. Please try again in a moment."
    }

    fn menu_expired() -> &'static str {
        "This menu is no longer active."
    }
}
