//! Trace renderer
//!
//! Turns the ordered trace list of one turn into chat actions. Every action
//! is awaited before the next one starts: later traces may depend on ids of
//! messages sent earlier (carousel menus).

use crate::registry::{group_callback_keys, CallbackRegistry, MenuRetirement};
use crate::transport::{ChatTransport, InlineMenu, MenuButton};
use crate::views::{DefaultRelayView, RelayView};
use flowbridge_core::markup::card_caption;
use flowbridge_core::{Button, Card, RelayError, Trace};
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of rendering one trace batch
#[derive(Debug, Default)]
pub struct RenderReport {
    /// Traces rendered without error
    pub rendered: usize,
    /// Traces ignored because the relay does not render their kind
    pub ignored: usize,
    /// Recovered failures, in the order they happened
    pub failures: Vec<RelayError>,
}

/// Renders backend traces through a [`ChatTransport`]
pub struct TraceRenderer<T: ChatTransport> {
    transport: Arc<T>,
    registry: Arc<CallbackRegistry>,
    last_stamp: AtomicI64,
}

impl<T: ChatTransport> TraceRenderer<T> {
    /// Create a renderer sending through `transport` and registering buttons in `registry`
    pub fn new(transport: Arc<T>, registry: Arc<CallbackRegistry>) -> Self {
        Self {
            transport,
            registry,
            last_stamp: AtomicI64::new(0),
        }
    }

    /// Render `traces` for `chat_id` in order.
    ///
    /// Malformed traces and rejected transport calls are logged, recorded in
    /// the report and skipped; rendering continues with the next trace.
    pub async fn render(&self, chat_id: i64, traces: &[Value]) -> RenderReport {
        let mut report = RenderReport::default();

        for raw in traces {
            let trace = match Trace::decode(raw) {
                Ok(Some(trace)) => trace,
                Ok(None) => {
                    debug!(chat_id, kind = ?raw.get("type"), "Ignoring unsupported trace");
                    report.ignored += 1;
                    continue;
                }
                Err(e) => {
                    warn!(chat_id, error = %e, "Skipping malformed trace");
                    report.failures.push(e);
                    continue;
                }
            };

            let failures_before = report.failures.len();
            self.render_trace(chat_id, &trace, &mut report).await;
            if report.failures.len() == failures_before {
                report.rendered += 1;
            }
        }

        report
    }

    async fn render_trace(&self, chat_id: i64, trace: &Trace, report: &mut RenderReport) {
        let result = match trace {
            Trace::Text { message } => {
                if message.trim().is_empty() {
                    debug!(chat_id, "Skipping empty text trace");
                    return;
                }
                self.transport.send_text(chat_id, message, None).await.map(drop)
            }
            Trace::Visual { image_url } => self
                .transport
                .send_photo(chat_id, image_url, None, None)
                .await
                .map(drop),
            Trace::Card(card) => {
                self.render_cards(chat_id, std::slice::from_ref(card), report)
                    .await;
                return;
            }
            Trace::Carousel(cards) => {
                self.render_cards(chat_id, cards, report).await;
                return;
            }
            Trace::Choice(buttons) => self.render_choice(chat_id, buttons).await,
            Trace::End => self
                .transport
                .send_text(chat_id, DefaultRelayView::conversation_over(), None)
                .await
                .map(drop),
        };

        if let Err(e) = result {
            warn!(chat_id, trace = trace.kind(), error = %e, "Transport rejected trace");
            report.failures.push(RelayError::transport(e));
        }
    }

    /// Render cards sharing one stamp; a press on any of them clears the
    /// menus of all of them.
    async fn render_cards(&self, chat_id: i64, cards: &[Card], report: &mut RenderReport) {
        let stamp = self.next_stamp();
        let mut menu_messages = Vec::new();
        let mut pending = Vec::new();

        // Keys are unique across every card of the group
        let all_buttons: Vec<&Button> = cards.iter().flat_map(|card| &card.buttons).collect();
        let mut keys = group_keys(chat_id, Some(stamp), &all_buttons).into_iter();

        for card in cards {
            let keyed: Vec<(String, Button)> = card
                .buttons
                .iter()
                .zip(keys.by_ref())
                .map(|(button, key)| (key, button.clone()))
                .collect();
            let menu = menu_for(&keyed);
            let caption = card_caption(card);

            let sent = self
                .transport
                .send_photo(
                    chat_id,
                    &card.image_url,
                    caption.as_deref(),
                    (!menu.is_empty()).then_some(&menu),
                )
                .await;

            match sent {
                Ok(message_id) if !keyed.is_empty() => {
                    menu_messages.push(message_id);
                    pending.extend(keyed);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(chat_id, image = %card.image_url, error = %e, "Failed to send card");
                    report.failures.push(RelayError::transport(e));
                }
            }
        }

        self.registry
            .register(chat_id, MenuRetirement::ClearMenus(menu_messages), pending)
            .await;
    }

    async fn render_choice(&self, chat_id: i64, buttons: &[Button]) -> anyhow::Result<()> {
        if buttons.is_empty() {
            debug!(chat_id, "Skipping choice trace without buttons");
            return Ok(());
        }

        let keys = group_keys(chat_id, None, &buttons.iter().collect::<Vec<_>>());
        let keyed: Vec<(String, Button)> = keys.into_iter().zip(buttons.iter().cloned()).collect();
        let menu = menu_for(&keyed);
        let prompt_id = self
            .transport
            .send_text(chat_id, DefaultRelayView::choice_prompt(), Some(&menu))
            .await?;

        self.registry
            .register(chat_id, MenuRetirement::AnnounceChoice { prompt_id }, keyed)
            .await;
        Ok(())
    }

    /// Millisecond timestamp, strictly increasing across render passes
    fn next_stamp(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let mut last = self.last_stamp.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self
                .last_stamp
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }
}

fn group_keys(chat_id: i64, stamp: Option<i64>, buttons: &[&Button]) -> Vec<String> {
    let kinds: Vec<&str> = buttons.iter().map(|b| b.request.kind.as_str()).collect();
    group_callback_keys(chat_id, stamp, &kinds)
}

fn menu_for(keyed: &[(String, Button)]) -> InlineMenu {
    InlineMenu {
        buttons: keyed
            .iter()
            .map(|(key, button)| MenuButton {
                label: button.name.clone(),
                callback_data: key.clone(),
            })
            .collect(),
    }
}
