//! Chat Transport Traits
//!
//! Trait definitions for talking to the chat backend. The session controller
//! and coordinator only see this seam, so tests can script streams without a
//! server and other transports can be dropped in without touching core logic.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::SessionIdentity;
use crate::settings::{Settings, SettingsUpdate, UiConfig};

/// Raw response body chunks, in arrival order
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

/// Transport-level failures
///
/// These are the only failures that end a session besides a protocol error
/// event.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection could not be established
    #[error("{0}")]
    Connect(String),

    /// The server answered with a non-success status
    #[error("server returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (may be empty)
        body: String,
    },

    /// The body stream failed after the connection was established
    #[error("stream interrupted: {0}")]
    Stream(String),

    /// A non-streaming response body could not be decoded
    #[error("invalid response body: {0}")]
    Decode(String),

    /// The client itself could not be built
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Body of a chat request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message
    pub message: String,
    /// Identity correlating history and settings on the server
    pub session_id: String,
}

impl ChatRequest {
    /// Create a request for this identity
    pub fn new(message: impl Into<String>, identity: &SessionIdentity) -> Self {
        Self {
            message: message.into(),
            session_id: identity.as_str().to_string(),
        }
    }
}

/// Chat backend transport
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Transport name for logs
    fn name(&self) -> &str;

    /// Open a streaming chat exchange
    ///
    /// Resolves once the server has accepted the request; the returned stream
    /// yields body chunks until end-of-stream or failure.
    async fn open_chat(&self, request: &ChatRequest) -> Result<ByteStream, TransportError>;

    /// Delete server-side history for an identity
    async fn delete_history(&self, identity: &SessionIdentity) -> Result<(), TransportError>;

    /// Fetch stored settings for an identity
    async fn get_settings(&self, identity: &SessionIdentity) -> Result<Settings, TransportError>;

    /// Store settings; returns the values the server kept
    async fn put_settings(&self, update: &SettingsUpdate) -> Result<Settings, TransportError>;

    /// Fetch display strings and example prompts
    async fn get_ui_config(&self) -> Result<UiConfig, TransportError>;
}
