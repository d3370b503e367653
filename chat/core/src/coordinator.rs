//! Chat Coordinator
//!
//! The central orchestrator between the UI surface and the chat server.
//!
//! # Responsibilities
//!
//! - Owns the message list, input text, welcome visibility and flight flag
//! - Enforces at most one in-flight request
//! - Starts a [`StreamSession`] per send and drives it to its outcome
//! - Replaces the thinking placeholder with the rendered result
//! - Clears the conversation locally and on the server
//!
//! # Polling
//!
//! The coordinator does not spawn the stream reader. The surface's event loop
//! awaits [`ChatCoordinator::next_outcome`] while [`is_in_flight`] is true,
//! typically as one branch of a `tokio::select!`, and hands the outcome to
//! [`ChatCoordinator::complete`] in the branch body:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         line = lines.next_line() => handle_input(&mut coordinator, line).await,
//!         outcome = coordinator.next_outcome(), if coordinator.is_in_flight() => {
//!             if let Some(outcome) = outcome {
//!                 coordinator.complete(outcome).await;
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! `next_outcome` is cancel-safe: dropping it loses no chunk. `complete`
//! sends to the surface and must not be raced.
//!
//! [`is_in_flight`]: ChatCoordinator::is_in_flight

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::backend::{ChatRequest, ChatTransport, TransportError};
use crate::identity::SessionIdentity;
use crate::messages::{Bubble, ChatMessage, MessageId, SurfaceMessage, UsageSummary};
use crate::render::RendererBridge;
use crate::session::{SessionOutcome, StreamSession};
use crate::settings::UiConfig;
use crate::ticker::DEFAULT_TICK_INTERVAL;

/// Coordinator tuning
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    /// Period of the thinking elapsed-time ticker
    pub tick_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

/// Result of a send attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// The request was accepted and is streaming
    Started,
    /// The request could not be opened; the error is already displayed
    Failed {
        /// Failure description
        reason: String,
    },
    /// Empty input or a request already in flight; nothing happened
    Rejected,
}

/// Orchestrates one conversation view
pub struct ChatCoordinator<T: ChatTransport> {
    transport: Arc<T>,
    identity: SessionIdentity,
    renderer: RendererBridge,
    tx: mpsc::Sender<SurfaceMessage>,
    config: CoordinatorConfig,

    messages: Vec<ChatMessage>,
    input: String,
    in_flight: bool,
    welcome_visible: bool,
    session: Option<StreamSession>,

    ui_config: UiConfig,
    examples: Vec<String>,
}

impl<T: ChatTransport> ChatCoordinator<T> {
    /// Create a coordinator with an empty conversation
    pub fn new(
        transport: Arc<T>,
        identity: SessionIdentity,
        renderer: RendererBridge,
        tx: mpsc::Sender<SurfaceMessage>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            transport,
            identity,
            renderer,
            tx,
            config,
            messages: Vec::new(),
            input: String::new(),
            in_flight: false,
            welcome_visible: true,
            session: None,
            ui_config: UiConfig::default(),
            examples: Vec::new(),
        }
    }

    // ============================================
    // Accessors
    // ============================================

    /// Messages in display order
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Whether a request is in flight
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Current input text
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Identity attached to every request
    #[must_use]
    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Whether the welcome panel is shown
    #[must_use]
    pub fn is_welcome_visible(&self) -> bool {
        self.welcome_visible
    }

    /// Display strings last loaded from the server
    #[must_use]
    pub fn ui_config(&self) -> &UiConfig {
        &self.ui_config
    }

    /// Example queries currently offered
    #[must_use]
    pub fn examples(&self) -> &[String] {
        &self.examples
    }

    // ============================================
    // Input
    // ============================================

    /// Replace the input text and re-evaluate the send affordance
    pub async fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
        self.emit(SurfaceMessage::SendAffordance {
            enabled: self.can_send(),
        })
        .await;
    }

    /// Non-empty input and nothing in flight
    #[must_use]
    pub fn can_send(&self) -> bool {
        !self.input.trim().is_empty() && !self.in_flight
    }

    /// Send the current input
    ///
    /// Rejected sends have no effects at all. Otherwise the user message and
    /// a thinking placeholder are inserted before the request is opened.
    pub async fn submit(&mut self) -> SendOutcome {
        if !self.can_send() {
            tracing::debug!(in_flight = self.in_flight, "Send rejected");
            return SendOutcome::Rejected;
        }

        self.in_flight = true;
        let text = std::mem::take(&mut self.input).trim().to_string();
        self.emit(SurfaceMessage::InputCleared).await;
        self.emit(SurfaceMessage::SendAffordance { enabled: false })
            .await;

        if self.welcome_visible {
            self.welcome_visible = false;
            self.emit(SurfaceMessage::WelcomeVisibility { visible: false })
                .await;
        }

        let user = ChatMessage::user(self.renderer.render_user(&text));
        self.append(user).await;

        let placeholder = ChatMessage::thinking();
        let placeholder_id = placeholder.id.clone();
        self.append(placeholder).await;

        tracing::debug!(
            placeholder = %placeholder_id,
            chars = text.chars().count(),
            "Sending chat message"
        );

        let mut session =
            StreamSession::begin(placeholder_id, self.config.tick_interval, self.tx.clone());
        let request = ChatRequest::new(text, &self.identity);

        match session.open(self.transport.as_ref(), &request).await {
            None => {
                self.session = Some(session);
                SendOutcome::Started
            }
            Some(outcome) => {
                let reason = match &outcome {
                    SessionOutcome::TransportFailed { reason } => reason.clone(),
                    SessionOutcome::ProtocolError { message } => message.clone(),
                    SessionOutcome::Completed { .. } => String::new(),
                };
                self.finish(session, &outcome).await;
                SendOutcome::Failed { reason }
            }
        }
    }

    // ============================================
    // Streaming
    // ============================================

    /// Read the next chunk of the active exchange
    ///
    /// Returns the terminal outcome once the exchange ends, `None` otherwise.
    /// The outcome is not applied yet: pass it to [`Self::complete`].
    ///
    /// # Cancel safety
    ///
    /// Only the chunk read is awaited, so dropping this future (for example
    /// when another `select!` branch wins) leaves the exchange untouched.
    pub async fn next_outcome(&mut self) -> Option<SessionOutcome> {
        self.session.as_mut()?.advance().await
    }

    /// Display a terminal outcome and release the flight flag
    ///
    /// Does nothing when no exchange is active.
    pub async fn complete(&mut self, outcome: SessionOutcome) {
        if let Some(session) = self.session.take() {
            self.finish(session, &outcome).await;
        }
    }

    /// Process the next chunk and apply the outcome if the exchange ended
    ///
    /// Not cancel-safe; inside `select!` use [`Self::next_outcome`] instead.
    pub async fn poll_streaming(&mut self) -> Option<SessionOutcome> {
        let outcome = self.next_outcome().await?;
        self.complete(outcome.clone()).await;
        Some(outcome)
    }

    /// Poll until no exchange is active
    pub async fn drive(&mut self) -> Option<SessionOutcome> {
        let mut last = None;
        while self.session.is_some() {
            if let Some(outcome) = self.poll_streaming().await {
                last = Some(outcome);
            }
        }
        last
    }

    /// Display a terminal outcome and release the flight flag
    async fn finish(&mut self, mut session: StreamSession, outcome: &SessionOutcome) {
        let (bubble, usage_summary) = match outcome {
            SessionOutcome::Completed {
                text,
                usage,
                elapsed,
            } => (
                Bubble::Markup(self.renderer.render_assistant(text)),
                usage.map(|u| UsageSummary::new(u, *elapsed).to_string()),
            ),
            SessionOutcome::ProtocolError { message } => (Bubble::Error(message.clone()), None),
            SessionOutcome::TransportFailed { reason } => {
                (Bubble::Error(format!("Connection error: {reason}")), None)
            }
        };

        let placeholder = session.placeholder().clone();
        let updated = self.replace_placeholder(&placeholder, bubble, usage_summary);
        session.mark_idle();
        self.in_flight = false;

        if let Some(updated) = updated {
            self.emit(SurfaceMessage::MessageUpdated(updated)).await;
        }
        self.emit(SurfaceMessage::SendAffordance {
            enabled: self.can_send(),
        })
        .await;
    }

    fn replace_placeholder(
        &mut self,
        id: &MessageId,
        bubble: Bubble,
        usage_summary: Option<String>,
    ) -> Option<ChatMessage> {
        let Some(message) = self.messages.iter_mut().find(|m| &m.id == id) else {
            tracing::debug!(placeholder = %id, "Placeholder gone, discarding result");
            return None;
        };
        message.bubble = bubble;
        message.usage_summary = usage_summary;
        Some(message.clone())
    }

    // ============================================
    // Conversation
    // ============================================

    /// Clear the conversation locally and on the server
    ///
    /// The local list is cleared right away. The server deletion runs in a
    /// background task; a failure there is only logged. An in-flight exchange
    /// keeps running and its result is discarded.
    pub async fn clear_conversation(&mut self)
    where
        T: 'static,
    {
        self.messages.clear();
        self.emit(SurfaceMessage::ConversationCleared).await;

        self.welcome_visible = true;
        self.emit(SurfaceMessage::WelcomeVisibility { visible: true })
            .await;

        let transport = Arc::clone(&self.transport);
        let identity = self.identity.clone();
        tokio::spawn(async move {
            if let Err(e) = transport.delete_history(&identity).await {
                tracing::warn!(error = %e, "Failed to clear server-side history");
            }
        });

        // Failure already logged; the previous config stays in use
        let _ = self.load_ui_config().await;
    }

    /// Fetch display strings and pick a fresh set of example queries
    pub async fn load_ui_config(&mut self) -> Result<(), TransportError> {
        let config = match self.transport.get_ui_config().await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load UI config");
                return Err(e);
            }
        };

        self.examples = config.pick_examples();
        self.ui_config = config;
        self.emit(SurfaceMessage::UiConfigLoaded {
            config: self.ui_config.clone(),
            examples: self.examples.clone(),
        })
        .await;
        Ok(())
    }

    /// Put an offered example into the input and send it
    pub async fn choose_example(&mut self, index: usize) -> SendOutcome {
        let Some(example) = self.examples.get(index).cloned() else {
            tracing::debug!(index, offered = self.examples.len(), "No such example");
            return SendOutcome::Rejected;
        };

        self.emit(SurfaceMessage::InputReplaced {
            text: example.clone(),
        })
        .await;
        self.set_input(example).await;
        self.submit().await
    }

    // ============================================
    // Internals
    // ============================================

    async fn append(&mut self, message: ChatMessage) {
        self.messages.push(message.clone());
        self.emit(SurfaceMessage::MessageAppended(message)).await;
    }

    async fn emit(&self, msg: SurfaceMessage) {
        if let Err(e) = self.tx.send(msg).await {
            tracing::warn!("Failed to send message to surface: {}", e);
        }
    }
}
