//! Context implementation for request-scoped cancellation and deadlines
//!
//! Every handler receives a Context. Each network call, poll sleep and retry
//! interval is a suspension point and must observe it on wake-up.

use std::time::{Duration, Instant};
use tokio::time;
use tokio_util::sync::CancellationToken;

/// Why a context stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("context canceled")]
    Canceled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Context carries the cancellation signal and deadline of one handler invocation
/// CRITICAL: Pass this as first parameter to ALL async trait methods
#[derive(Clone, Debug)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Derive a child context whose deadline is `timeout` from now, never later
    /// than the parent's. Cancelling the parent cancels the child, not the
    /// other way round.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) if parent < candidate => parent,
            _ => candidate,
        };

        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.err().is_some()
    }

    /// Returns the reason this context is done, or None while it is live
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Resolves once the context is cancelled or its deadline passes
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => ContextError::Canceled,
                    _ = time::sleep_until(time::Instant::from_std(deadline)) => {
                        ContextError::DeadlineExceeded
                    }
                }
            }
            None => {
                self.token.cancelled().await;
                ContextError::Canceled
            }
        }
    }

    /// Sleep for `duration` unless the context finishes first
    pub async fn sleep(&self, duration: Duration) -> Result<(), ContextError> {
        if let Some(err) = self.err() {
            return Err(err);
        }

        tokio::select! {
            biased;
            err = self.done() => Err(err),
            _ = time::sleep(duration) => Ok(()),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
