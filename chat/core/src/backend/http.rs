//! HTTP Transport Implementation
//!
//! Talks to the chat server's REST + streaming API.
//!
//! # Endpoints
//!
//! - `POST /api/chat` - streaming chat exchange (line-delimited events)
//! - `DELETE /api/chat/history?session_id=` - clear server-side history
//! - `GET|PUT /api/settings` - system prompt and temperature
//! - `GET /api/config` - display strings and example prompts
//!
//! No overall request timeout is set: a stalled stream waits indefinitely.
//! Only connection establishment can be bounded.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use super::traits::{ByteStream, ChatRequest, ChatTransport, TransportError};
use crate::identity::SessionIdentity;
use crate::settings::{Settings, SettingsUpdate, UiConfig};

/// Default server address
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

/// HTTP chat backend client
#[derive(Clone, Debug)]
pub struct HttpTransport {
    /// Base URL without trailing slash
    base_url: String,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport for a server base URL
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Client` if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    fn history_url(&self) -> String {
        format!("{}/api/chat/history", self.base_url)
    }

    fn settings_url(&self) -> String {
        format!("{}/api/settings", self.base_url)
    }

    fn config_url(&self) -> String {
        format!("{}/api/config", self.base_url)
    }

    /// Fail on a non-success status, keeping the body for the message
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Status { status, body })
    }
}

fn connect_error(e: &reqwest::Error) -> TransportError {
    TransportError::Connect(e.to_string())
}

#[async_trait]
impl ChatTransport for HttpTransport {
    fn name(&self) -> &'static str {
        "HTTP"
    }

    async fn open_chat(&self, request: &ChatRequest) -> Result<ByteStream, TransportError> {
        let response = self
            .http_client
            .post(self.chat_url())
            .json(request)
            .send()
            .await
            .map_err(|e| connect_error(&e))?;

        let response = Self::check_status(response).await?;
        tracing::debug!(status = %response.status(), "Chat stream opened");

        let stream = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| TransportError::Stream(e.to_string()))
        });

        Ok(stream.boxed())
    }

    async fn delete_history(&self, identity: &SessionIdentity) -> Result<(), TransportError> {
        let response = self
            .http_client
            .delete(self.history_url())
            .query(&[("session_id", identity.as_str())])
            .send()
            .await
            .map_err(|e| connect_error(&e))?;

        Self::check_status(response).await?;
        Ok(())
    }

    async fn get_settings(&self, identity: &SessionIdentity) -> Result<Settings, TransportError> {
        let response = self
            .http_client
            .get(self.settings_url())
            .query(&[("session_id", identity.as_str())])
            .send()
            .await
            .map_err(|e| connect_error(&e))?;

        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn put_settings(&self, update: &SettingsUpdate) -> Result<Settings, TransportError> {
        let response = self
            .http_client
            .put(self.settings_url())
            .json(update)
            .send()
            .await
            .map_err(|e| connect_error(&e))?;

        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn get_ui_config(&self) -> Result<UiConfig, TransportError> {
        let response = self
            .http_client
            .get(self.config_url())
            .send()
            .await
            .map_err(|e| connect_error(&e))?;

        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}
