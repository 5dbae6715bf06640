//! Voiceflow runtime client
//!
//! One `POST /state/user/{userID}/interact` call per turn. The conversation
//! state lives server-side, keyed by the chat id.

use crate::config::RelaySettings;
use crate::error::RelayError;
use crate::trace::InteractionRequest;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use tracing::{debug, instrument};

/// Maximum length of an upstream error body kept in the error message
const ERROR_BODY_LIMIT: usize = 500;

/// Conversational backend that turns a request into an ordered trace list
#[async_trait]
pub trait InteractionBackend: Send + Sync {
    /// Run one interaction for the given chat and return the raw traces.
    async fn interact(
        &self,
        chat_id: i64,
        request: &InteractionRequest,
    ) -> Result<Vec<Value>, RelayError>;
}

/// Creates an HTTP client with the configured backend timeout.
#[must_use]
pub fn create_http_client(settings: &RelaySettings) -> HttpClient {
    HttpClient::builder()
        .timeout(settings.voiceflow_timeout())
        .build()
        .unwrap_or_else(|_| HttpClient::new())
}

/// HTTP client for the Voiceflow Dialog Manager API
#[derive(Clone)]
pub struct VoiceflowClient {
    http: HttpClient,
    base_url: String,
    api_key: String,
    version_id: Option<String>,
}

impl VoiceflowClient {
    /// Create a client from relay settings
    #[must_use]
    pub fn new(settings: &RelaySettings) -> Self {
        Self {
            http: create_http_client(settings),
            base_url: settings.voiceflow_base_url.trim_end_matches('/').to_string(),
            api_key: settings.voiceflow_api_key.clone(),
            version_id: settings.voiceflow_version_id.clone(),
        }
    }

    /// Interact endpoint for one chat
    #[must_use]
    pub fn interact_url(&self, chat_id: i64) -> String {
        format!("{}/state/user/{chat_id}/interact", self.base_url)
    }
}

#[async_trait]
impl InteractionBackend for VoiceflowClient {
    #[instrument(skip(self, request), fields(request_type = %request.kind))]
    async fn interact(
        &self,
        chat_id: i64,
        request: &InteractionRequest,
    ) -> Result<Vec<Value>, RelayError> {
        let body = json!({ "request": request });
        let mut call = self
            .http
            .post(self.interact_url(chat_id))
            .header("Authorization", &self.api_key)
            .json(&body);
        if let Some(version) = &self.version_id {
            call = call.header("versionID", version);
        }

        let response = call
            .send()
            .await
            .map_err(|e| RelayError::BackendUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(RelayError::BackendUnavailable(describe_failure(
                status,
                &error_text,
            )));
        }

        let traces: Value = response
            .json()
            .await
            .map_err(|e| RelayError::BackendUnavailable(format!("Invalid JSON: {e}")))?;

        match traces {
            Value::Array(items) => {
                debug!(chat_id, traces = items.len(), "Backend returned traces");
                Ok(items)
            }
            other => Err(RelayError::BackendUnavailable(format!(
                "Expected a trace array, got: {}",
                truncate(&other.to_string())
            ))),
        }
    }
}

fn describe_failure(status: reqwest::StatusCode, error_text: &str) -> String {
    let trimmed = error_text.trim_start();
    // Proxies answer with HTML error pages
    let is_html = trimmed.starts_with("<!DOCTYPE")
        || trimmed.starts_with("<html")
        || trimmed.starts_with("<HTML");

    if is_html {
        format!("API error: {status} (Server returned HTML error page)")
    } else {
        format!("API error: {status} - {}", truncate(error_text))
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() > ERROR_BODY_LIMIT {
        let head: String = text.chars().take(ERROR_BODY_LIMIT).collect();
        format!("{head}... (truncated)")
    } else {
        text.to_string()
    }
}
