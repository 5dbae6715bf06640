//! Testing helpers.
//!
//! Provides a recording [`ChatTransport`] for renderer and dispatcher tests.

use crate::transport::{ChatTransport, InlineMenu, TypingIndicator};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// One call observed by the fake transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    /// `send_text`
    Text {
        chat_id: i64,
        text: String,
        menu: Option<InlineMenu>,
    },
    /// `send_photo`
    Photo {
        chat_id: i64,
        image_url: String,
        caption: Option<String>,
        menu: Option<InlineMenu>,
    },
    /// `edit_text`
    Edit {
        chat_id: i64,
        message_id: i32,
        text: String,
    },
    /// `clear_menu`
    ClearMenu { chat_id: i64, message_id: i32 },
    /// `answer_press`
    Answer {
        press_id: String,
        notice: Option<String>,
    },
}

impl Sent {
    pub fn text(chat_id: i64, text: &str, menu: Option<InlineMenu>) -> Self {
        Self::Text {
            chat_id,
            text: text.to_string(),
            menu,
        }
    }

    pub fn photo(
        chat_id: i64,
        image_url: &str,
        caption: Option<&str>,
        menu: Option<InlineMenu>,
    ) -> Self {
        Self::Photo {
            chat_id,
            image_url: image_url.to_string(),
            caption: caption.map(ToString::to_string),
            menu,
        }
    }
}

/// Records every call; message ids start at 100 and increase by one.
pub struct FakeTransport {
    sent: Mutex<Vec<Sent>>,
    next_id: AtomicI32,
    typing: Mutex<Vec<CancellationToken>>,
    failing_photo: Option<String>,
    failing_answers: bool,
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            next_id: AtomicI32::new(100),
            typing: Mutex::new(Vec::new()),
            failing_photo: None,
            failing_answers: false,
        }
    }
}

impl FakeTransport {
    /// Reject `send_photo` calls for `url`
    #[must_use]
    pub fn failing_photo(mut self, url: &str) -> Self {
        self.failing_photo = Some(url.to_string());
        self
    }

    /// Reject every `answer_press` call, as for an expired query
    #[must_use]
    pub fn failing_answers(mut self) -> Self {
        self.failing_answers = true;
        self
    }

    /// Snapshot of recorded calls
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Tokens of every typing indicator handed out
    pub fn typing_tokens(&self) -> Vec<CancellationToken> {
        self.typing.lock().map(|t| t.clone()).unwrap_or_default()
    }

    fn record(&self, call: Sent) -> i32 {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(call);
        }
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    fn begin_typing(&self, _chat_id: i64) -> TypingIndicator {
        let token = CancellationToken::new();
        if let Ok(mut typing) = self.typing.lock() {
            typing.push(token.clone());
        }
        TypingIndicator::new(token)
    }

    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        menu: Option<&InlineMenu>,
    ) -> Result<i32> {
        Ok(self.record(Sent::text(chat_id, text, menu.cloned())))
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        image_url: &str,
        caption: Option<&str>,
        menu: Option<&InlineMenu>,
    ) -> Result<i32> {
        if self.failing_photo.as_deref() == Some(image_url) {
            return Err(anyhow!("Bad Request: wrong file identifier/HTTP URL specified"));
        }
        Ok(self.record(Sent::photo(chat_id, image_url, caption, menu.cloned())))
    }

    async fn edit_text(&self, chat_id: i64, message_id: i32, text: &str) -> Result<()> {
        self.record(Sent::Edit {
            chat_id,
            message_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn clear_menu(&self, chat_id: i64, message_id: i32) -> Result<()> {
        self.record(Sent::ClearMenu {
            chat_id,
            message_id,
        });
        Ok(())
    }

    async fn answer_press(&self, press_id: &str, notice: Option<&str>) -> Result<()> {
        if self.failing_answers {
            return Err(anyhow!("Bad Request: query is too old and response timeout expired"));
        }
        self.record(Sent::Answer {
            press_id: press_id.to_string(),
            notice: notice.map(ToString::to_string),
        });
        Ok(())
    }
}
