//! Chat Backend Integration
//!
//! Abstracted access to the chat server through a common trait interface.
//!
//! # Usage
//!
//! ```ignore
//! use chat_core::backend::{ChatRequest, ChatTransport, HttpTransport};
//!
//! let transport = HttpTransport::new("http://127.0.0.1:8000", None)?;
//! let stream = transport.open_chat(&ChatRequest::new("Hello!", &identity)).await?;
//! ```

mod http;
mod traits;

pub use http::{HttpTransport, DEFAULT_SERVER_URL};
pub use traits::{ByteStream, ChatRequest, ChatTransport, TransportError};
