//! Stream Session Controller
//!
//! One request/response exchange, from opening the transport to the terminal
//! outcome.
//!
//! # State Machine
//!
//! ```text
//! Idle -> Opening -> Streaming -> Finalizing -> Idle
//!            \            \
//!             +-> Error <--+-> (displayed) -> Idle
//! ```
//!
//! The session reports exactly one terminal [`SessionOutcome`]. Displaying it
//! and releasing the flight flag belong to the
//! [`ChatCoordinator`](crate::coordinator::ChatCoordinator).
//!
//! Each chunk is decoded and interpreted as one batch after the await that
//! produced it. Nothing else observes the accumulator mid-batch.

use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::sync::mpsc;

use crate::backend::{ByteStream, ChatRequest, ChatTransport};
use crate::decoder::FrameDecoder;
use crate::events::{interpret, StreamEvent, Usage};
use crate::messages::{MessageId, SurfaceMessage};
use crate::ticker::ElapsedTicker;

/// Session lifecycle phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// No exchange running
    Idle,
    /// Waiting for the server to accept the request
    Opening,
    /// Reading the response stream
    Streaming,
    /// Stream ended cleanly; final text is being rendered
    Finalizing,
    /// A protocol error or transport failure ended the exchange
    Error,
}

/// Terminal result of one exchange
#[derive(Clone, Debug, PartialEq)]
pub enum SessionOutcome {
    /// Stream ended without an error event
    Completed {
        /// Concatenated token text
        text: String,
        /// Last usage record received, if any
        usage: Option<Usage>,
        /// Time from request start to end of stream
        elapsed: Duration,
    },
    /// Server sent an error event
    ProtocolError {
        /// Message to show verbatim
        message: String,
    },
    /// Connection refused, bad status, or stream interrupted
    TransportFailed {
        /// Failure description
        reason: String,
    },
}

impl SessionOutcome {
    /// Whether the exchange ended in a failure
    #[must_use]
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Completed { .. })
    }
}

/// Text and usage collected for one response
#[derive(Debug)]
pub struct ResponseAccumulator {
    text: String,
    usage: Option<Usage>,
    tokens: usize,
    started: Instant,
}

impl Default for ResponseAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseAccumulator {
    /// Start accumulating now
    #[must_use]
    pub fn new() -> Self {
        Self {
            text: String::new(),
            usage: None,
            tokens: 0,
            started: Instant::now(),
        }
    }

    /// Append a token fragment
    pub fn push_token(&mut self, fragment: &str) {
        self.text.push_str(fragment);
        self.tokens += 1;
    }

    /// Replace the usage record (last write wins)
    pub fn set_usage(&mut self, usage: Usage) {
        self.usage = Some(usage);
    }

    /// Text so far
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Usage so far
    #[must_use]
    pub fn usage(&self) -> Option<Usage> {
        self.usage
    }

    /// Token events received
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.tokens
    }

    /// Time since the accumulator was created
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn take_text(&mut self) -> String {
        std::mem::take(&mut self.text)
    }
}

/// One request/response exchange
pub struct StreamSession {
    placeholder: MessageId,
    phase: SessionPhase,
    accumulator: ResponseAccumulator,
    decoder: FrameDecoder,
    stream: Option<ByteStream>,
    ticker: Option<ElapsedTicker>,
}

impl StreamSession {
    /// Start an exchange for `placeholder`, ticking elapsed time to the surface
    ///
    /// Must be called from within a tokio runtime.
    pub fn begin(
        placeholder: MessageId,
        tick_interval: Duration,
        tx: mpsc::Sender<SurfaceMessage>,
    ) -> Self {
        let ticker = ElapsedTicker::start(placeholder.clone(), tick_interval, tx);
        Self {
            placeholder,
            phase: SessionPhase::Opening,
            accumulator: ResponseAccumulator::new(),
            decoder: FrameDecoder::new(),
            stream: None,
            ticker: Some(ticker),
        }
    }

    /// Placeholder message this exchange will replace
    #[must_use]
    pub fn placeholder(&self) -> &MessageId {
        &self.placeholder
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Time since the exchange began
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.accumulator.elapsed()
    }

    /// Accumulated response so far
    #[must_use]
    pub fn accumulator(&self) -> &ResponseAccumulator {
        &self.accumulator
    }

    /// Whether the elapsed ticker is still running
    #[must_use]
    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().is_some_and(ElapsedTicker::is_running)
    }

    /// Send the request and wait for the server to accept it
    ///
    /// Returns `None` once streaming, or the terminal outcome if the request
    /// could not be opened.
    pub async fn open<T: ChatTransport + ?Sized>(
        &mut self,
        transport: &T,
        request: &ChatRequest,
    ) -> Option<SessionOutcome> {
        if self.phase != SessionPhase::Opening {
            tracing::warn!(phase = ?self.phase, "open() called outside Opening phase");
            return None;
        }

        match transport.open_chat(request).await {
            Ok(stream) => {
                tracing::debug!(
                    transport = transport.name(),
                    placeholder = %self.placeholder,
                    "Response stream opened"
                );
                self.stream = Some(stream);
                self.decoder = FrameDecoder::new();
                self.phase = SessionPhase::Streaming;
                None
            }
            Err(e) => Some(self.fail_transport(e.to_string())),
        }
    }

    /// Wait for the next chunk and process it as one batch
    ///
    /// Returns the terminal outcome when the exchange ends, `None` while it is
    /// still streaming (or if the session is not streaming at all). Safe to
    /// cancel: a dropped call loses no data.
    pub async fn advance(&mut self) -> Option<SessionOutcome> {
        let stream = self.stream.as_mut()?;

        match stream.next().await {
            Some(Ok(chunk)) => self.process_chunk(&chunk),
            Some(Err(e)) => Some(self.fail_transport(e.to_string())),
            None => Some(self.finalize()),
        }
    }

    /// Return to `Idle` after the outcome has been displayed
    pub fn mark_idle(&mut self) {
        self.stop_ticker();
        self.stream = None;
        self.phase = SessionPhase::Idle;
    }

    fn process_chunk(&mut self, chunk: &[u8]) -> Option<SessionOutcome> {
        for frame in self.decoder.feed(chunk) {
            match interpret(&frame) {
                Some(StreamEvent::Token(fragment)) => self.accumulator.push_token(&fragment),
                Some(StreamEvent::Usage(usage)) => self.accumulator.set_usage(usage),
                Some(StreamEvent::Error(message)) => {
                    // Remaining frames in this batch and stream are ignored
                    tracing::warn!(error = %message, "Server reported an error");
                    self.enter_error();
                    return Some(SessionOutcome::ProtocolError { message });
                }
                None => {}
            }
        }
        None
    }

    fn finalize(&mut self) -> SessionOutcome {
        self.phase = SessionPhase::Finalizing;
        self.stop_ticker();
        self.stream = None;

        let stats = self.decoder.finish();
        let elapsed = self.accumulator.elapsed();
        tracing::info!(
            frames = stats.frames,
            dropped_lines = stats.dropped_lines,
            tokens = self.accumulator.token_count(),
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "Response stream complete"
        );

        SessionOutcome::Completed {
            text: self.accumulator.take_text(),
            usage: self.accumulator.usage(),
            elapsed,
        }
    }

    fn fail_transport(&mut self, reason: String) -> SessionOutcome {
        tracing::warn!(phase = ?self.phase, error = %reason, "Chat transport failed");
        self.enter_error();
        SessionOutcome::TransportFailed { reason }
    }

    fn enter_error(&mut self) {
        self.phase = SessionPhase::Error;
        self.stop_ticker();
        self.stream = None;
    }

    fn stop_ticker(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream;
    use pretty_assertions::assert_eq;

    use crate::backend::TransportError;
    use crate::identity::SessionIdentity;
    use crate::settings::{Settings, SettingsUpdate, UiConfig};

    /// Transport that replays one scripted response
    struct Replay {
        chunks: Vec<Result<Vec<u8>, TransportError>>,
        refuse: bool,
    }

    impl Replay {
        fn chunks(chunks: &[&str]) -> Self {
            Self {
                chunks: chunks.iter().map(|c| Ok(c.as_bytes().to_vec())).collect(),
                refuse: false,
            }
        }
    }

    #[async_trait]
    impl ChatTransport for Replay {
        fn name(&self) -> &str {
            "Replay"
        }

        async fn open_chat(&self, _request: &ChatRequest) -> Result<ByteStream, TransportError> {
            if self.refuse {
                return Err(TransportError::Connect("connection refused".to_string()));
            }
            let chunks: Vec<_> = self
                .chunks
                .iter()
                .map(|c| match c {
                    Ok(bytes) => Ok(bytes.clone()),
                    Err(e) => Err(TransportError::Stream(e.to_string())),
                })
                .collect();
            Ok(stream::iter(chunks).boxed())
        }

        async fn delete_history(&self, _identity: &SessionIdentity) -> Result<(), TransportError> {
            Ok(())
        }

        async fn get_settings(&self, _identity: &SessionIdentity) -> Result<Settings, TransportError> {
            Ok(Settings::default())
        }

        async fn put_settings(&self, _update: &SettingsUpdate) -> Result<Settings, TransportError> {
            Ok(Settings::default())
        }

        async fn get_ui_config(&self) -> Result<UiConfig, TransportError> {
            Ok(UiConfig::default())
        }
    }

    async fn run(transport: &Replay) -> (StreamSession, SessionOutcome) {
        let (tx, _rx) = mpsc::channel(64);
        let mut session = StreamSession::begin(MessageId::new(), Duration::from_secs(1), tx);
        assert_eq!(session.phase(), SessionPhase::Opening);

        let request = ChatRequest::new("hi", &SessionIdentity::from_string("s"));
        if let Some(outcome) = session.open(transport, &request).await {
            return (session, outcome);
        }
        assert_eq!(session.phase(), SessionPhase::Streaming);

        loop {
            if let Some(outcome) = session.advance().await {
                return (session, outcome);
            }
        }
    }

    #[tokio::test]
    async fn test_tokens_and_usage_complete() {
        let transport = Replay::chunks(&[
            "data: {\"type\":\"token\",\"data\":\"Hel\"}\n",
            "data: {\"type\":\"token\",\"data\":\"lo\"}\n",
            "data: {\"type\":\"usage\",\"data\":{\"input_tokens\":10,\"output_tokens\":2}}\n",
            "data: {\"type\":\"done\",\"data\":null}\n",
        ]);
        let (session, outcome) = run(&transport).await;

        assert_eq!(session.phase(), SessionPhase::Finalizing);
        assert!(!session.is_ticking());
        match outcome {
            SessionOutcome::Completed { text, usage, .. } => {
                assert_eq!(text, "Hello");
                assert_eq!(
                    usage,
                    Some(Usage {
                        input_tokens: 10,
                        output_tokens: 2
                    })
                );
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_last_usage_wins() {
        let transport = Replay::chunks(&[
            "data: {\"type\":\"usage\",\"data\":{\"input_tokens\":1,\"output_tokens\":1}}\n\
             data: {\"type\":\"usage\",\"data\":{\"input_tokens\":5,\"output_tokens\":7}}\n",
        ]);
        let (_, outcome) = run(&transport).await;
        match outcome {
            SessionOutcome::Completed { usage, .. } => assert_eq!(usage.map(|u| u.total()), Some(12)),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_error_event_ignores_rest_of_stream() {
        let transport = Replay::chunks(&[
            "data: {\"type\":\"token\",\"data\":\"partial\"}\n\
             data: {\"type\":\"error\",\"data\":\"Rate limited\"}\n\
             data: {\"type\":\"token\",\"data\":\"ignored\"}\n",
            "data: {\"type\":\"token\",\"data\":\"also ignored\"}\n",
        ]);
        let (session, outcome) = run(&transport).await;

        assert_eq!(session.phase(), SessionPhase::Error);
        assert!(!session.is_ticking());
        assert_eq!(
            outcome,
            SessionOutcome::ProtocolError {
                message: "Rate limited".to_string()
            }
        );
        assert_eq!(session.accumulator().text(), "partial");
    }

    #[tokio::test]
    async fn test_connect_failure_is_transport_failure() {
        let transport = Replay {
            chunks: Vec::new(),
            refuse: true,
        };
        let (session, outcome) = run(&transport).await;

        assert_eq!(session.phase(), SessionPhase::Error);
        assert!(!session.is_ticking());
        assert_eq!(
            outcome,
            SessionOutcome::TransportFailed {
                reason: "connection refused".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_interrupted_stream_is_transport_failure() {
        let transport = Replay {
            chunks: vec![
                Ok(b"data: {\"type\":\"token\",\"data\":\"Hi\"}\n".to_vec()),
                Err(TransportError::Stream("connection reset".to_string())),
            ],
            refuse: false,
        };
        let (_, outcome) = run(&transport).await;
        assert!(matches!(outcome, SessionOutcome::TransportFailed { .. }));
        assert!(outcome.is_failure());
    }

    #[tokio::test]
    async fn test_empty_stream_completes_with_empty_text() {
        let transport = Replay::chunks(&[]);
        let (_, outcome) = run(&transport).await;
        match outcome {
            SessionOutcome::Completed { text, usage, .. } => {
                assert_eq!(text, "");
                assert_eq!(usage, None);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mark_idle_and_advance_after_end() {
        let transport = Replay::chunks(&["data: {\"type\":\"token\",\"data\":\"x\"}\n"]);
        let (mut session, _) = run(&transport).await;
        session.mark_idle();
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.advance().await, None);
    }
}
