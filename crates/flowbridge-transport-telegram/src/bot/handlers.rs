use crate::bot::TelegramDispatcher;
use anyhow::Result;
use std::sync::Arc;
use teloxide::{prelude::*, types::CallbackQuery, utils::command::BotCommands};
use tracing::{debug, info};

// Helper function to get user name from Message
fn get_user_name(msg: &Message) -> String {
    if let Some(ref user) = msg.from {
        if let Some(ref username) = user.username {
            return username.clone();
        }
        if !user.first_name.is_empty() {
            return user.first_name.clone();
        }
    }
    "Unknown".to_string()
}

/// Supported commands for the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Start (or restart) the conversation
    #[command(description = "Start the conversation.")]
    Start,
}

/// Handle `/start`: launch the conversation.
///
/// # Errors
///
/// Returns an error if the backend is unavailable.
pub async fn start(msg: Message, dispatcher: Arc<TelegramDispatcher>) -> Result<()> {
    let chat_id = msg.chat.id.0;
    info!(chat_id, user = %get_user_name(&msg), "Start command received");
    dispatcher.start(chat_id).await?;
    Ok(())
}

/// Forward a free-text message to the backend.
///
/// Unknown commands are not forwarded.
///
/// # Errors
///
/// Returns an error if the backend is unavailable.
pub async fn handle_text(msg: Message, dispatcher: Arc<TelegramDispatcher>) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id.0;

    if text.starts_with('/') {
        debug!(chat_id, command = text, "Ignoring unknown command");
        return Ok(());
    }

    debug!(chat_id, user = %get_user_name(&msg), len = text.len(), "Text message received");
    dispatcher.handle_text(chat_id, text).await?;
    Ok(())
}

/// Handle an inline button press.
///
/// # Errors
///
/// Returns an error if the backend is unavailable.
pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    dispatcher: Arc<TelegramDispatcher>,
) -> Result<()> {
    let Some(data) = q.data.as_deref() else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    dispatcher.handle_button(&q.id.0, data).await?;
    Ok(())
}
