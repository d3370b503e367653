//! Response Renderer Bridge
//!
//! Converts finished plain text into markup that is safe to insert.
//!
//! User text is escaped literally. Assistant text goes through two stages,
//! interpretation (markdown to markup) and sanitizing (strip executable
//! content). If either stage fails the bridge falls back to literal escaping,
//! so a bubble is never left empty by a rendering fault.
//!
//! The stages live behind [`MarkupBackend`] so the output format can change
//! without touching the session controller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::messages::MessageRole;

/// Default ceiling on assistant text handed to the markdown interpreter
pub const DEFAULT_MAX_MARKDOWN_BYTES: usize = 1024 * 1024;

/// Rendering failures (always absorbed by [`RendererBridge`])
#[derive(Debug, Error)]
pub enum RenderError {
    /// Text exceeds the interpreter's size ceiling
    #[error("input too large to interpret: {len} bytes (max: {max})")]
    InputTooLarge {
        /// Input length in bytes
        len: usize,
        /// Configured ceiling
        max: usize,
    },

    /// Backend-specific failure
    #[error("render backend failed: {0}")]
    Backend(String),
}

/// Output format selector
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    /// Sanitized HTML
    Html,
    /// Markdown source with terminal control sequences removed
    Terminal,
}

impl std::str::FromStr for RenderFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "terminal" | "text" => Ok(Self::Terminal),
            other => Err(format!("unknown render format: {other}")),
        }
    }
}

/// A markup interpreter + sanitizer pair
pub trait MarkupBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Literal rendering with no structural interpretation
    fn escape(&self, text: &str) -> String;

    /// Interpret lightweight structured text into markup
    fn interpret(&self, text: &str) -> Result<String, RenderError>;

    /// Remove executable content from interpreted markup
    fn sanitize(&self, markup: &str) -> Result<String, RenderError>;
}

/// Escape the five HTML-significant characters
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Writing into a String cannot fail
    let _ = pulldown_cmark_escape::escape_html(&mut out, text);
    out
}

/// Markdown to sanitized HTML (`pulldown-cmark` + `ammonia`)
#[derive(Clone, Debug)]
pub struct HtmlBackend {
    max_input_bytes: usize,
}

impl Default for HtmlBackend {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MARKDOWN_BYTES)
    }
}

impl HtmlBackend {
    /// Create a backend with an input size ceiling
    #[must_use]
    pub fn new(max_input_bytes: usize) -> Self {
        Self { max_input_bytes }
    }
}

impl MarkupBackend for HtmlBackend {
    fn name(&self) -> &'static str {
        "html"
    }

    fn escape(&self, text: &str) -> String {
        escape_html(text)
    }

    fn interpret(&self, text: &str) -> Result<String, RenderError> {
        use pulldown_cmark::{html, Event, Options, Parser};

        if text.len() > self.max_input_bytes {
            return Err(RenderError::InputTooLarge {
                len: text.len(),
                max: self.max_input_bytes,
            });
        }

        let options = Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS;

        // Single newlines are line breaks in chat replies
        let parser = Parser::new_ext(text, options).map(|event| match event {
            Event::SoftBreak => Event::HardBreak,
            other => other,
        });

        let mut markup = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut markup, parser);
        Ok(markup)
    }

    fn sanitize(&self, markup: &str) -> Result<String, RenderError> {
        Ok(ammonia::clean(markup))
    }
}

/// Markdown source for terminals, with control sequences stripped
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalBackend;

impl TerminalBackend {
    fn strip_controls(text: &str) -> String {
        text.chars()
            .filter(|&c| c == '\n' || c == '\t' || !c.is_control())
            .collect()
    }
}

impl MarkupBackend for TerminalBackend {
    fn name(&self) -> &'static str {
        "terminal"
    }

    fn escape(&self, text: &str) -> String {
        Self::strip_controls(text)
    }

    fn interpret(&self, text: &str) -> Result<String, RenderError> {
        Ok(text.to_string())
    }

    fn sanitize(&self, markup: &str) -> Result<String, RenderError> {
        Ok(Self::strip_controls(markup))
    }
}

/// Renders finished text for display through a swappable backend
pub struct RendererBridge {
    backend: Box<dyn MarkupBackend>,
}

impl Default for RendererBridge {
    fn default() -> Self {
        Self::new(Box::new(HtmlBackend::default()))
    }
}

impl RendererBridge {
    /// Create a bridge over a backend
    #[must_use]
    pub fn new(backend: Box<dyn MarkupBackend>) -> Self {
        Self { backend }
    }

    /// Create a bridge for a configured format
    #[must_use]
    pub fn for_format(format: RenderFormat, max_markdown_bytes: usize) -> Self {
        match format {
            RenderFormat::Html => Self::new(Box::new(HtmlBackend::new(max_markdown_bytes))),
            RenderFormat::Terminal => Self::new(Box::new(TerminalBackend)),
        }
    }

    /// Render text authored by `role`
    #[must_use]
    pub fn render(&self, role: MessageRole, text: &str) -> String {
        match role {
            MessageRole::User => self.render_user(text),
            MessageRole::Assistant => self.render_assistant(text),
        }
    }

    /// Literal escaping only
    #[must_use]
    pub fn render_user(&self, text: &str) -> String {
        self.backend.escape(text)
    }

    /// Interpret then sanitize, falling back to literal escaping
    #[must_use]
    pub fn render_assistant(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let rendered = self
            .backend
            .interpret(text)
            .and_then(|markup| self.backend.sanitize(&markup));

        match rendered {
            Ok(markup) => markup,
            Err(e) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    error = %e,
                    "Rendering failed, falling back to escaped text"
                );
                self.backend.escape(text)
            }
        }
    }
}
