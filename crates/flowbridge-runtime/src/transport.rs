use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::{CancellationToken, DropGuard};

/// One inline button: label shown to the user and opaque callback data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuButton {
    /// Display label
    pub label: String,
    /// Callback key sent back when pressed
    pub callback_data: String,
}

/// Inline keyboard with one button per row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineMenu {
    /// Buttons, rendered top to bottom
    pub buttons: Vec<MenuButton>,
}

impl InlineMenu {
    /// Whether the menu has no buttons
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
    }
}

/// Scoped "typing" presence indicator.
///
/// The transport keeps the indicator visible until the token is cancelled,
/// which happens when this guard is dropped.
#[must_use = "the indicator is hidden as soon as the guard is dropped"]
pub struct TypingIndicator {
    _guard: DropGuard,
}

impl TypingIndicator {
    /// Bind the indicator lifetime to `token`.
    pub fn new(token: CancellationToken) -> Self {
        Self {
            _guard: token.drop_guard(),
        }
    }
}

/// Chat platform adapter used by the renderer and the dispatcher.
///
/// Message ids are the platform's per-chat ids.
#[async_trait]
pub trait ChatTransport: Send + Sync + 'static {
    /// Show the typing indicator until the returned guard is dropped.
    fn begin_typing(&self, chat_id: i64) -> TypingIndicator;

    /// Send a Markdown text message, optionally with an inline menu.
    async fn send_text(&self, chat_id: i64, text: &str, menu: Option<&InlineMenu>)
        -> Result<i32>;

    /// Send a photo by URL with an optional Markdown caption and menu.
    async fn send_photo(
        &self,
        chat_id: i64,
        image_url: &str,
        caption: Option<&str>,
        menu: Option<&InlineMenu>,
    ) -> Result<i32>;

    /// Replace the text of a sent message.
    async fn edit_text(&self, chat_id: i64, message_id: i32, text: &str) -> Result<()>;

    /// Remove the inline menu of a sent message.
    async fn clear_menu(&self, chat_id: i64, message_id: i32) -> Result<()>;

    /// Acknowledge a button press, optionally with a short notice.
    async fn answer_press(&self, press_id: &str, notice: Option<&str>) -> Result<()>;
}
