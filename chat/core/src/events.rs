//! Stream Events
//!
//! Maps a decoded frame line onto one of the three events the session
//! controller acts on.
//!
//! Payloads that fail to decode are dropped without surfacing an error:
//! garbled partial lines are expected noise on some transports, not protocol
//! violations.

use serde::{Deserialize, Serialize};

use crate::decoder::EVENT_MARKER;

/// Token counts for one completed exchange
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt-side tokens
    #[serde(default)]
    pub input_tokens: u64,
    /// Completion-side tokens
    #[serde(default)]
    pub output_tokens: u64,
}

impl Usage {
    /// Input plus output
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// An event produced by the interpreter
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// One fragment of generated text
    Token(String),
    /// Token counts for the exchange
    Usage(Usage),
    /// Server-signaled failure, shown verbatim
    Error(String),
}

/// Wire shape of a frame payload
#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
enum WirePayload {
    Token(String),
    Usage(Usage),
    Error(String),
    Done,
}

/// Interpret one raw frame line
///
/// Returns `None` for lines without the event marker, undecodable payloads,
/// unknown event types, and the server's `done` marker.
#[must_use]
pub fn interpret(raw_frame: &str) -> Option<StreamEvent> {
    let payload = raw_frame.strip_prefix(EVENT_MARKER)?;

    match serde_json::from_str::<WirePayload>(payload) {
        Ok(WirePayload::Token(text)) => Some(StreamEvent::Token(text)),
        Ok(WirePayload::Usage(usage)) => Some(StreamEvent::Usage(usage)),
        Ok(WirePayload::Error(message)) => Some(StreamEvent::Error(message)),
        Ok(WirePayload::Done) => None,
        Err(e) => {
            tracing::trace!(error = %e, "Dropping undecodable frame");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_token_event() {
        assert_eq!(
            interpret(r#"data: {"type":"token","data":"Hel"}"#),
            Some(StreamEvent::Token("Hel".to_string()))
        );
    }

    #[test]
    fn test_usage_event() {
        assert_eq!(
            interpret(r#"data: {"type":"usage","data":{"input_tokens":5,"output_tokens":3}}"#),
            Some(StreamEvent::Usage(Usage {
                input_tokens: 5,
                output_tokens: 3
            }))
        );
    }

    #[test]
    fn test_usage_missing_counts_default_to_zero() {
        assert_eq!(
            interpret(r#"data: {"type":"usage","data":{"output_tokens":7}}"#),
            Some(StreamEvent::Usage(Usage {
                input_tokens: 0,
                output_tokens: 7
            }))
        );
    }

    #[test]
    fn test_error_event() {
        assert_eq!(
            interpret(r#"data: {"type":"error","data":"LLM error: boom"}"#),
            Some(StreamEvent::Error("LLM error: boom".to_string()))
        );
    }

    #[test]
    fn test_lines_without_marker_never_produce_events() {
        for line in [
            r#"{"type":"token","data":"x"}"#,
            r#"event: {"type":"token","data":"x"}"#,
            r#"data:{"type":"token","data":"x"}"#,
            r#" data: {"type":"token","data":"x"}"#,
            "",
        ] {
            assert_eq!(interpret(line), None, "line {line:?}");
        }
    }

    #[test]
    fn test_malformed_and_unknown_payloads_are_dropped() {
        assert_eq!(interpret("data: {not json"), None);
        assert_eq!(interpret(r#"data: {"type":"token"}"#), None);
        assert_eq!(interpret(r#"data: {"type":"token","data":42}"#), None);
        assert_eq!(interpret(r#"data: {"type":"heartbeat","data":"x"}"#), None);
        assert_eq!(interpret(r#"data: {"type":"done"}"#), None);
    }
}
