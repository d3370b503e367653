//! Chat Core - Headless Streaming Chat Client
//!
//! This crate holds the client side of a streaming chat exchange, completely
//! independent of any UI framework: it sends a message, decodes the
//! server-sent event stream, assembles the reply, renders it safely, and keeps
//! the conversation view consistent while a request is in flight.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        UI Surface                            │
//! │            (chat-term REPL, tests, anything else)            │
//! │                            │                                 │
//! │        set_input / submit / clear (down)                     │
//! │        SurfaceMessage (up)                                   │
//! └────────────────────────────┼─────────────────────────────────┘
//!                              │
//! ┌────────────────────────────┼─────────────────────────────────┐
//! │                       CHAT CORE                              │
//! │  ┌─────────────────────────┴──────────────────────────────┐  │
//! │  │                   ChatCoordinator                      │  │
//! │  │  ┌─────────────┐  ┌──────────────┐  ┌───────────────┐  │  │
//! │  │  │StreamSession│  │RendererBridge│  │ SettingsPanel │  │  │
//! │  │  │ decoder →   │  │ markdown +   │  │               │  │  │
//! │  │  │ events →    │  │ sanitizer    │  │               │  │  │
//! │  │  │ accumulator │  │              │  │               │  │  │
//! │  │  └──────┬──────┘  └──────────────┘  └───────┬───────┘  │  │
//! │  └─────────┼───────────────────────────────────┼──────────┘  │
//! │            └──────────── ChatTransport ────────┘             │
//! └──────────────────────────────┼───────────────────────────────┘
//!                                │ HTTP
//!                           chat server
//! ```
//!
//! # Key Types
//!
//! - [`ChatCoordinator`]: Owns the conversation view and the flight flag
//! - [`StreamSession`]: One request/response exchange and its state machine
//! - [`FrameDecoder`]: Byte chunks to complete event lines
//! - [`RendererBridge`]: Final text to safe markup
//! - [`SurfaceMessage`]: Messages sent from the core to the UI surface
//! - [`HttpTransport`]: The `reqwest` client for the chat server
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use chat_core::{
//!     ChatCoordinator, CoordinatorConfig, HttpTransport, MemoryStore,
//!     RendererBridge, SessionIdentity,
//! };
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (tx, mut rx) = mpsc::channel(256);
//!     let mut store = MemoryStore::new();
//!     let identity = SessionIdentity::load_or_create(&mut store).await?;
//!     let transport = Arc::new(HttpTransport::new("http://127.0.0.1:8000", None)?);
//!
//!     let mut coordinator = ChatCoordinator::new(
//!         transport,
//!         identity,
//!         RendererBridge::default(),
//!         tx,
//!         CoordinatorConfig::default(),
//!     );
//!
//!     coordinator.set_input("Hello!").await;
//!     coordinator.submit().await;
//!     coordinator.drive().await;
//!
//!     while let Ok(msg) = rx.try_recv() {
//!         // Render message to UI
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: Transport trait and HTTP implementation
//! - [`config`]: TOML/env/CLI client configuration
//! - [`coordinator`]: Conversation view state and send gating
//! - [`decoder`]: Line framing over raw body chunks
//! - [`events`]: Frame payload interpretation
//! - [`identity`]: Session identity and client-local storage
//! - [`messages`]: Message model and surface messages
//! - [`render`]: Markdown interpretation and sanitizing
//! - [`session`]: Stream session state machine
//! - [`settings`]: Settings panel and UI config
//! - [`ticker`]: Elapsed-time ticker for the thinking placeholder
//!
//! # No TUI Dependencies
//!
//! This crate has **zero** dependencies on terminal libraries or CLI parsers.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod coordinator;
pub mod decoder;
pub mod events;
pub mod identity;
pub mod messages;
pub mod render;
pub mod session;
pub mod settings;
pub mod ticker;

// Re-exports for convenience
pub use backend::{ByteStream, ChatRequest, ChatTransport, HttpTransport, TransportError};
pub use config::{ClientConfig, ConfigError, ConfigOverrides, ConfigSource};
pub use coordinator::{ChatCoordinator, CoordinatorConfig, SendOutcome};
pub use decoder::{DecoderStats, FrameDecoder, EVENT_MARKER};
pub use events::{interpret, StreamEvent, Usage};
pub use identity::{FileStore, KeyValueStore, MemoryStore, SessionIdentity, StoreError};
pub use messages::{
    Bubble, ChatMessage, MessageId, MessageRole, NotifyLevel, SaveStatus, SurfaceMessage,
    UsageSummary,
};
pub use render::{
    HtmlBackend, MarkupBackend, RenderError, RenderFormat, RendererBridge, TerminalBackend,
};
pub use session::{ResponseAccumulator, SessionOutcome, SessionPhase, StreamSession};
pub use settings::{Settings, SettingsPanel, SettingsUpdate, UiConfig};
pub use ticker::ElapsedTicker;
