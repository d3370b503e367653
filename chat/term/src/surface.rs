//! Terminal Surface
//!
//! Turns [`SurfaceMessage`]s into lines on stdout.
//!
//! # Design Philosophy
//!
//! The surface is a "thin client": it prints what the core tells it to and
//! keeps only the state needed to draw, namely which placeholders are still
//! thinking and whether a status line is on screen. Formatting is pure
//! ([`TerminalSurface::apply_message`] returns text) so it can be tested
//! without a terminal; [`run_printer`] does the writing.

use std::collections::HashSet;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use chat_core::{
    Bubble, ChatMessage, MarkupBackend, MessageId, MessageRole, NotifyLevel, Settings,
    SurfaceMessage, TerminalBackend, UiConfig,
};

/// Return to column 0 and erase the line
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Display state for the terminal
#[derive(Debug)]
pub struct TerminalSurface {
    /// Placeholders still showing the thinking indicator
    thinking: HashSet<MessageId>,
    /// A status line without trailing newline is on screen
    status_line: bool,
    /// Mirrors the core's welcome visibility
    welcome_visible: bool,
}

impl Default for TerminalSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalSurface {
    /// Create an empty surface (welcome panel visible)
    #[must_use]
    pub fn new() -> Self {
        Self {
            thinking: HashSet::new(),
            status_line: false,
            welcome_visible: true,
        }
    }

    /// Whether a placeholder is still thinking
    #[must_use]
    pub fn is_thinking(&self, id: &MessageId) -> bool {
        self.thinking.contains(id)
    }

    /// Apply a message, returning the text to write (if any)
    pub fn apply_message(&mut self, msg: &SurfaceMessage) -> Option<String> {
        match msg {
            SurfaceMessage::MessageAppended(message) => {
                if message.bubble.is_thinking() {
                    self.thinking.insert(message.id.clone());
                    Some(self.status(&thinking_label(0)))
                } else {
                    Some(self.line(&format_message(message)))
                }
            }
            SurfaceMessage::MessageUpdated(message) => {
                self.thinking.remove(&message.id);
                Some(self.line(&format_message(message)))
            }
            SurfaceMessage::ThinkingElapsed { id, secs } => {
                // Ticks can arrive after the reply replaced the placeholder
                if self.is_thinking(id) {
                    Some(self.status(&thinking_label(*secs)))
                } else {
                    None
                }
            }
            SurfaceMessage::ConversationCleared => {
                self.thinking.clear();
                Some(self.line("── conversation cleared ──\n"))
            }
            SurfaceMessage::WelcomeVisibility { visible } => {
                self.welcome_visible = *visible;
                None
            }
            SurfaceMessage::UiConfigLoaded { config, examples } => {
                if self.welcome_visible {
                    Some(self.line(&format_welcome(config, examples)))
                } else {
                    None
                }
            }
            SurfaceMessage::SettingsLoaded(settings) => {
                Some(self.line(&format_settings(settings)))
            }
            SurfaceMessage::SaveStatus(status) => {
                Some(self.line(&format!("settings: {}\n", status.text())))
            }
            SurfaceMessage::Notify { level, message } => {
                let text = match level {
                    NotifyLevel::Info => format!("{message}\n"),
                    NotifyLevel::Warning => format!("warning: {message}\n"),
                };
                Some(self.line(&text))
            }
            SurfaceMessage::InputCleared
            | SurfaceMessage::InputReplaced { .. }
            | SurfaceMessage::SendAffordance { .. } => None,
        }
    }

    /// Text that ends with a newline, erasing any status line first
    fn line(&mut self, text: &str) -> String {
        let prefix = if self.status_line { CLEAR_LINE } else { "" };
        self.status_line = false;
        format!("{prefix}{text}")
    }

    /// A status line that stays on screen until overwritten
    fn status(&mut self, text: &str) -> String {
        self.status_line = true;
        format!("{CLEAR_LINE}{text}")
    }
}

fn thinking_label(secs: u64) -> String {
    if secs == 0 {
        "assistant › thinking…".to_string()
    } else {
        format!("assistant › thinking… {secs}s")
    }
}

fn role_label(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "you",
        MessageRole::Assistant => "assistant",
    }
}

/// Format a finished bubble and its usage line
#[must_use]
pub fn format_message(message: &ChatMessage) -> String {
    let label = role_label(message.role);
    let mut out = match &message.bubble {
        Bubble::Thinking => format!("{label} › thinking…\n"),
        Bubble::Markup(markup) => {
            let body = markup.trim_end();
            if body.contains('\n') {
                format!("{label} ›\n{body}\n")
            } else {
                format!("{label} › {body}\n")
            }
        }
        Bubble::Error(text) => {
            format!("{label} › error: {}\n", TerminalBackend.escape(text))
        }
    };
    if let Some(summary) = &message.usage_summary {
        out.push_str(&format!("  ({summary})\n"));
    }
    out
}

/// Format the welcome panel
#[must_use]
pub fn format_welcome(config: &UiConfig, examples: &[String]) -> String {
    let mut out = format!("{}\n{}\n\n{}\n", config.title, config.subtitle, config.welcome_message);
    if !examples.is_empty() {
        out.push_str("\nTry one of these (/ex <n>):\n");
        for (i, example) in examples.iter().enumerate() {
            out.push_str(&format!("  [{}] {example}\n", i + 1));
        }
    }
    out
}

/// Format the settings form
#[must_use]
pub fn format_settings(settings: &Settings) -> String {
    let prompt = if settings.system_prompt.is_empty() {
        "(server default)"
    } else {
        settings.system_prompt.as_str()
    };
    let temperature = settings
        .temperature
        .map_or_else(|| "(server default)".to_string(), |t| format!("{t:.2}"));
    format!("system prompt: {prompt}\ntemperature:   {temperature}\n")
}

/// Print surface messages until every sender is gone
///
/// # Errors
///
/// Returns the first write error.
pub async fn run_printer<W>(
    mut rx: mpsc::Receiver<SurfaceMessage>,
    mut out: W,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut surface = TerminalSurface::new();
    while let Some(msg) = rx.recv().await {
        if let Some(text) = surface.apply_message(&msg) {
            out.write_all(text.as_bytes()).await?;
            out.flush().await?;
        }
    }
    if surface.status_line {
        out.write_all(b"\n").await?;
    }
    out.flush().await?;
    tracing::debug!("Surface channel closed, printer exiting");
    Ok(())
}
