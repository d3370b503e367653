//! Elapsed Ticker
//!
//! Cosmetic "thinking… Ns" updates for a placeholder bubble. The ticker is a
//! spawned task owned by a guard; dropping the guard aborts the task, so the
//! ticker never outlives the session that started it.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, MissedTickBehavior};

use crate::messages::{MessageId, SurfaceMessage};

/// Default tick period
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Guard for a running elapsed-time ticker
#[derive(Debug)]
pub struct ElapsedTicker {
    started: Instant,
    handle: Option<JoinHandle<()>>,
}

impl ElapsedTicker {
    /// Start ticking for `message_id`, first tick after one `period`
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(message_id: MessageId, period: Duration, tx: mpsc::Sender<SurfaceMessage>) -> Self {
        let started = Instant::now();
        let period = period.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut interval = interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let msg = SurfaceMessage::ThinkingElapsed {
                    id: message_id.clone(),
                    secs: started.elapsed().as_secs(),
                };
                match tx.try_send(msg) {
                    Ok(()) => {}
                    // A busy surface just misses a cosmetic update
                    Err(mpsc::error::TrySendError::Full(_)) => {}
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                }
            }
        });

        Self {
            started,
            handle: Some(handle),
        }
    }

    /// Time since the ticker started
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Whether the ticker task is still running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop ticking (idempotent)
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::trace!("Elapsed ticker cancelled");
        }
    }
}

impl Drop for ElapsedTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}
