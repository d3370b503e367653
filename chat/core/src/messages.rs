//! Surface Messages
//!
//! Messages sent from the chat core to the UI surface, plus the message model
//! the coordinator keeps for the conversation view.
//!
//! # Design Philosophy
//!
//! The surface is a pure renderer. It never decides whether a send is allowed
//! or what a bubble should contain; it paints what the core tells it to. All
//! state lives in [`ChatCoordinator`](crate::coordinator::ChatCoordinator) and
//! flows out through [`SurfaceMessage`].

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::Usage;
use crate::settings::{Settings, UiConfig};

/// Message identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        Self(format!("msg_{id}"))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who authored a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    /// Typed by the user
    User,
    /// Produced by the assistant
    Assistant,
}

/// What a message bubble currently shows
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bubble {
    /// Placeholder while the response is being produced
    Thinking,
    /// Sanitized, ready-to-insert markup
    Markup(String),
    /// A failure shown in place of the response (not markup; surfaces escape it)
    Error(String),
}

impl Bubble {
    /// Whether the bubble is still the thinking placeholder
    #[must_use]
    pub fn is_thinking(&self) -> bool {
        matches!(self, Self::Thinking)
    }
}

/// A message in the conversation view
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message ID
    pub id: MessageId,
    /// Who authored this message
    pub role: MessageRole,
    /// Current bubble content
    pub bubble: Bubble,
    /// Token usage line shown under a finished assistant reply
    pub usage_summary: Option<String>,
    /// When the message was inserted
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// A finished user message with already-escaped markup
    pub fn user(markup: String) -> Self {
        Self::with_bubble(MessageRole::User, Bubble::Markup(markup))
    }

    /// The assistant placeholder inserted when a request starts
    pub fn thinking() -> Self {
        Self::with_bubble(MessageRole::Assistant, Bubble::Thinking)
    }

    fn with_bubble(role: MessageRole, bubble: Bubble) -> Self {
        Self {
            id: MessageId::new(),
            role,
            bubble,
            usage_summary: None,
            created_at: Utc::now(),
        }
    }
}

/// Token usage line displayed under a completed reply
///
/// Renders as `1,234 tokens (1,000 in · 234 out) · 2.5s`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UsageSummary {
    /// Token counts reported by the server
    pub usage: Usage,
    /// Wall-clock time from request start to stream end
    pub elapsed: Duration,
}

impl UsageSummary {
    /// Create a summary
    #[must_use]
    pub fn new(usage: Usage, elapsed: Duration) -> Self {
        Self { usage, elapsed }
    }
}

impl fmt::Display for UsageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tokens ({} in · {} out) · {:.1}s",
            group_thousands(self.usage.total()),
            group_thousands(self.usage.input_tokens),
            group_thousands(self.usage.output_tokens),
            self.elapsed.as_secs_f64()
        )
    }
}

/// Format an integer with comma thousands separators
#[must_use]
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Notification level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyLevel {
    /// Informational
    Info,
    /// Something went wrong but the app continues
    Warning,
}

/// Outcome of a settings save/reset, shown next to the settings form
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveStatus {
    /// Saved on the server
    Saved,
    /// Local values reset, not yet saved
    ResetPending,
    /// Server rejected the update
    Failed,
    /// Server unreachable
    ConnectionError,
}

impl SaveStatus {
    /// Status text as displayed
    #[must_use]
    pub fn text(&self) -> &'static str {
        match self {
            Self::Saved => "✓ Saved successfully",
            Self::ResetPending => "Reset to default — click Save to apply",
            Self::Failed => "Failed to save",
            Self::ConnectionError => "Connection error",
        }
    }

    /// Whether the status reports a failure
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed | Self::ConnectionError)
    }
}

/// Messages from the chat core to the UI surface
#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceMessage {
    // ============================================
    // Conversation
    // ============================================
    /// A new message was inserted at the end of the list
    MessageAppended(ChatMessage),

    /// An existing message changed (placeholder replaced, usage attached)
    MessageUpdated(ChatMessage),

    /// Cosmetic elapsed-time label for a thinking placeholder
    ThinkingElapsed {
        /// Placeholder message
        id: MessageId,
        /// Whole seconds since the request started
        secs: u64,
    },

    /// The local message list was emptied
    ConversationCleared,

    // ============================================
    // Input affordances
    // ============================================
    /// The input field was cleared by the core
    InputCleared,

    /// Input field text was replaced by the core (example query picked)
    InputReplaced {
        /// New input text
        text: String,
    },

    /// Whether the send affordance is enabled
    SendAffordance {
        /// `true` when input is non-empty and nothing is in flight
        enabled: bool,
    },

    /// Show or hide the welcome panel
    WelcomeVisibility {
        /// Whether it is visible
        visible: bool,
    },

    // ============================================
    // Supporting panels
    // ============================================
    /// Display strings and a fresh selection of example queries
    UiConfigLoaded {
        /// Loaded config
        config: UiConfig,
        /// Up to four examples to offer
        examples: Vec<String>,
    },

    /// Settings loaded or changed locally
    SettingsLoaded(Settings),

    /// Feedback for a settings save or reset
    SaveStatus(SaveStatus),

    /// Free-form notification
    Notify {
        /// Notification level
        level: NotifyLevel,
        /// Message content
        message: String,
    },
}
