//! Interaction dispatcher
//!
//! Runs one turn per inbound event: conversation start, free text, or a
//! button press routed back through the callback registry.

use crate::registry::{CallbackRegistry, MenuRetirement, PendingButton};
use crate::renderer::{RenderReport, TraceRenderer};
use crate::transport::ChatTransport;
use crate::views::{DefaultRelayView, RelayView};
use flowbridge_core::{InteractionBackend, InteractionRequest, RelayError};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of a button press
#[derive(Debug)]
pub enum ButtonOutcome {
    /// The key is unknown, expired or its menu was already used
    Expired,
    /// The menu was retired and the follow-up turn ran
    Handled {
        /// Label of the pressed button
        label: String,
        /// Rendering of the follow-up turn
        report: RenderReport,
    },
}

/// Orchestrates backend calls and trace rendering for one chat transport
pub struct InteractionDispatcher<T: ChatTransport, B: InteractionBackend> {
    transport: Arc<T>,
    backend: Arc<B>,
    registry: Arc<CallbackRegistry>,
    renderer: TraceRenderer<T>,
}

impl<T: ChatTransport, B: InteractionBackend> InteractionDispatcher<T, B> {
    /// Create a dispatcher; the renderer shares `transport` and `registry`
    pub fn new(transport: Arc<T>, backend: Arc<B>, registry: Arc<CallbackRegistry>) -> Self {
        let renderer = TraceRenderer::new(Arc::clone(&transport), Arc::clone(&registry));
        Self {
            transport,
            backend,
            registry,
            renderer,
        }
    }

    /// Registry holding the pending buttons of this dispatcher
    #[must_use]
    pub const fn registry(&self) -> &Arc<CallbackRegistry> {
        &self.registry
    }

    /// Start (or restart) the conversation with a `launch` request.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::BackendUnavailable` if the backend call fails.
    pub async fn start(&self, chat_id: i64) -> Result<RenderReport, RelayError> {
        info!(chat_id, "Launching conversation");
        self.interact(chat_id, &InteractionRequest::launch()).await
    }

    /// Forward a free-text message as a `text` request.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::BackendUnavailable` if the backend call fails.
    pub async fn handle_text(&self, chat_id: i64, text: &str) -> Result<RenderReport, RelayError> {
        self.interact(chat_id, &InteractionRequest::text(text)).await
    }

    /// Handle a button press identified by its callback data.
    ///
    /// The press is acknowledged right after the claim so the client stops
    /// waiting; presses on inactive menus get the expired notice instead.
    /// A failed acknowledgement is logged and the press still proceeds,
    /// since its menu group is already claimed.
    ///
    /// The menu group is retired before the follow-up request is issued:
    /// card and carousel menus are cleared on every message of the group,
    /// a choice prompt is rewritten to show the chosen label.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::BackendUnavailable` if the follow-up call fails.
    pub async fn handle_button(
        &self,
        press_id: &str,
        callback_data: &str,
    ) -> Result<ButtonOutcome, RelayError> {
        let Some(pending) = self.registry.claim(callback_data).await else {
            debug!(callback_data, "Press on an inactive menu");
            self.acknowledge(press_id, Some(DefaultRelayView::menu_expired()))
                .await;
            return Ok(ButtonOutcome::Expired);
        };

        info!(
            chat_id = pending.chat_id,
            button = %pending.label,
            request_type = %pending.request.kind,
            "Button pressed"
        );
        self.acknowledge(press_id, None).await;

        self.retire_menu(&pending).await;
        let report = self.interact(pending.chat_id, &pending.follow_up()).await?;

        Ok(ButtonOutcome::Handled {
            label: pending.label.clone(),
            report,
        })
    }

    /// Run one turn: call the backend while "typing" is shown, then render.
    ///
    /// On backend failure the user gets an apology and nothing is rendered.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::BackendUnavailable` if the backend call fails.
    pub async fn interact(
        &self,
        chat_id: i64,
        request: &InteractionRequest,
    ) -> Result<RenderReport, RelayError> {
        let traces = {
            let _typing = self.transport.begin_typing(chat_id);
            self.backend.interact(chat_id, request).await
        };

        let traces = match traces {
            Ok(traces) => traces,
            Err(e) => {
                error!(chat_id, request_type = %request.kind, error = %e, "Backend call failed");
                if let Err(send_err) = self
                    .transport
                    .send_text(chat_id, DefaultRelayView::backend_unavailable(), None)
                    .await
                {
                    warn!(chat_id, error = %send_err, "Failed to send apology");
                }
                return Err(e);
            }
        };

        let report = self.renderer.render(chat_id, &traces).await;
        debug!(
            chat_id,
            rendered = report.rendered,
            ignored = report.ignored,
            failures = report.failures.len(),
            "Turn rendered"
        );
        Ok(report)
    }

    async fn acknowledge(&self, press_id: &str, notice: Option<&str>) {
        if let Err(e) = self.transport.answer_press(press_id, notice).await {
            warn!(press_id, error = %e, "Failed to answer button press");
        }
    }

    async fn retire_menu(&self, pending: &PendingButton) {
        let chat_id = pending.chat_id;
        match &pending.retirement {
            MenuRetirement::ClearMenus(message_ids) => {
                for &message_id in message_ids {
                    if let Err(e) = self.transport.clear_menu(chat_id, message_id).await {
                        warn!(chat_id, message_id, error = %e, "Failed to clear menu");
                    }
                }
            }
            MenuRetirement::AnnounceChoice { prompt_id } => {
                let text = DefaultRelayView::choice_made(&pending.label);
                if let Err(e) = self.transport.edit_text(chat_id, *prompt_id, &text).await {
                    warn!(chat_id, message_id = prompt_id, error = %e, "Failed to edit choice prompt");
                }
            }
        }
    }
}
