//! Telegram chat transport.
//!
//! Messages go out as legacy Markdown. When Telegram cannot parse the
//! entities (backend text is not escaped), the same call is repeated once
//! as plain text.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use flowbridge_runtime::{ChatTransport, InlineMenu, TypingIndicator};
use reqwest::Url;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, ChatAction, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId,
    ParseMode,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Telegram hides a chat action after about five seconds
const TYPING_REFRESH: Duration = Duration::from_secs(4);

#[allow(deprecated)]
const LEGACY_MARKDOWN: ParseMode = ParseMode::Markdown;

/// Returns true if Telegram rejected the message markup
fn is_markup_error(err: &str) -> bool {
    err.to_lowercase().contains("can't parse entities")
}

/// Returns true if an edit changed nothing
fn is_not_modified(err: &str) -> bool {
    err.contains("message is not modified")
}

/// Build an inline keyboard with one button per row
#[must_use]
pub fn inline_keyboard(menu: &InlineMenu) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(menu.buttons.iter().map(|button| {
        vec![InlineKeyboardButton::callback(
            button.label.clone(),
            button.callback_data.clone(),
        )]
    }))
}

/// [`ChatTransport`] over the Telegram Bot API
#[derive(Clone)]
pub struct TelegramChatTransport {
    bot: Bot,
}

impl TelegramChatTransport {
    /// Wrap a teloxide bot
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatTransport for TelegramChatTransport {
    fn begin_typing(&self, chat_id: i64) -> TypingIndicator {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let bot = self.bot.clone();

        tokio::spawn(async move {
            loop {
                if let Err(e) = bot
                    .send_chat_action(ChatId(chat_id), ChatAction::Typing)
                    .await
                {
                    debug!(chat_id, error = %e, "Failed to send typing action");
                }
                tokio::select! {
                    () = cancelled.cancelled() => break,
                    () = tokio::time::sleep(TYPING_REFRESH) => {}
                }
            }
        });

        TypingIndicator::new(token)
    }

    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        menu: Option<&InlineMenu>,
    ) -> Result<i32> {
        let chat = ChatId(chat_id);
        let markup = menu.map(inline_keyboard);

        let mut req = self.bot.send_message(chat, text).parse_mode(LEGACY_MARKDOWN);
        if let Some(markup) = markup.clone() {
            req = req.reply_markup(markup);
        }

        match req.await {
            Ok(msg) => Ok(msg.id.0),
            Err(e) if is_markup_error(&e.to_string()) => {
                warn!(chat_id, error = %e, "Markdown rejected, resending as plain text");
                let mut req = self.bot.send_message(chat, text);
                if let Some(markup) = markup {
                    req = req.reply_markup(markup);
                }
                let msg = req
                    .await
                    .map_err(|e| anyhow!("Telegram send error: {e}"))?;
                Ok(msg.id.0)
            }
            Err(e) => Err(anyhow!("Telegram send error: {e}")),
        }
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        image_url: &str,
        caption: Option<&str>,
        menu: Option<&InlineMenu>,
    ) -> Result<i32> {
        let chat = ChatId(chat_id);
        let url = Url::parse(image_url).map_err(|e| anyhow!("Invalid image URL {image_url}: {e}"))?;
        let photo = InputFile::url(url);
        let markup = menu.map(inline_keyboard);

        let mut req = self.bot.send_photo(chat, photo.clone());
        if let Some(caption) = caption {
            req = req.caption(caption).parse_mode(LEGACY_MARKDOWN);
        }
        if let Some(markup) = markup.clone() {
            req = req.reply_markup(markup);
        }

        match req.await {
            Ok(msg) => Ok(msg.id.0),
            Err(e) if caption.is_some() && is_markup_error(&e.to_string()) => {
                warn!(chat_id, error = %e, "Caption markdown rejected, resending as plain text");
                let mut req = self.bot.send_photo(chat, photo);
                if let Some(caption) = caption {
                    req = req.caption(caption);
                }
                if let Some(markup) = markup {
                    req = req.reply_markup(markup);
                }
                let msg = req
                    .await
                    .map_err(|e| anyhow!("Telegram photo error: {e}"))?;
                Ok(msg.id.0)
            }
            Err(e) => Err(anyhow!("Telegram photo error: {e}")),
        }
    }

    async fn edit_text(&self, chat_id: i64, message_id: i32, text: &str) -> Result<()> {
        let chat = ChatId(chat_id);
        let id = MessageId(message_id);

        let result = self
            .bot
            .edit_message_text(chat, id, text)
            .parse_mode(LEGACY_MARKDOWN)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_not_modified(&e.to_string()) => {
                debug!(chat_id, message_id, "Edit skipped: message is not modified");
                Ok(())
            }
            Err(e) if is_markup_error(&e.to_string()) => {
                warn!(chat_id, message_id, error = %e, "Markdown rejected, editing as plain text");
                self.bot
                    .edit_message_text(chat, id, text)
                    .await
                    .map(drop)
                    .map_err(|e| anyhow!("Telegram edit error: {e}"))
            }
            Err(e) => Err(anyhow!("Telegram edit error: {e}")),
        }
    }

    async fn clear_menu(&self, chat_id: i64, message_id: i32) -> Result<()> {
        // Omitting reply_markup removes the inline keyboard
        match self
            .bot
            .edit_message_reply_markup(ChatId(chat_id), MessageId(message_id))
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_modified(&e.to_string()) => Ok(()),
            Err(e) => Err(anyhow!("Telegram markup edit error: {e}")),
        }
    }

    async fn answer_press(&self, press_id: &str, notice: Option<&str>) -> Result<()> {
        let mut req = self
            .bot
            .answer_callback_query(CallbackQueryId(press_id.to_string()));
        if let Some(notice) = notice {
            req = req.text(notice);
        }
        req.await
            .map(drop)
            .map_err(|e| anyhow!("Telegram callback answer error: {e}"))
    }
}
