//! Cancellation and deadline scopes
//!
//! A [`Context`] governs a unit of work such as one crawl run or one IIIF
//! resolve. Cancelling it (explicitly, through a deadline, or through a
//! fail-fast crawl) makes every future wrapped with [`Context::run`] return
//! promptly. Contexts form a tree: cancelling a parent cancels all of its
//! children, never the other way round.

use futures::future::{self, BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

/// Why a context stopped accepting work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context cancelled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// A cloneable cancellation scope with an optional deadline
///
/// Clones share the same scope: cancelling any clone cancels them all.
#[derive(Debug, Clone)]
pub struct Context {
    /// Own signal first, then every ancestor's signal
    signals: Vec<Arc<watch::Sender<bool>>>,
    deadline: Option<Instant>,
}

impl Context {
    /// Creates a root context that is never cancelled unless asked to
    pub fn background() -> Self {
        Self {
            signals: vec![Arc::new(watch::channel(false).0)],
            deadline: None,
        }
    }

    /// Creates a child scope that can be cancelled on its own
    pub fn child(&self) -> Self {
        let mut signals = Vec::with_capacity(self.signals.len() + 1);
        signals.push(Arc::new(watch::channel(false).0));
        signals.extend(self.signals.iter().cloned());

        Self {
            signals,
            deadline: self.deadline,
        }
    }

    /// Creates a child scope that expires after `timeout`
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Creates a child scope that expires at `deadline`
    ///
    /// The child never outlives the parent's own deadline.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let mut child = self.child();
        child.deadline = Some(match self.deadline {
            Some(parent) => parent.min(deadline),
            None => deadline,
        });
        child
    }

    /// Cancels this scope and every scope derived from it
    pub fn cancel(&self) {
        self.signals[0].send_replace(true);
    }

    /// The deadline governing this scope, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the reason this scope is finished, or `None` while it is live
    pub fn err(&self) -> Option<ContextError> {
        if self.signals.iter().any(|s| *s.borrow()) {
            return Some(ContextError::Cancelled);
        }

        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Completes once this scope is cancelled or its deadline passes
    pub async fn done(&self) -> ContextError {
        let waiters: Vec<BoxFuture<'static, ()>> = self
            .signals
            .iter()
            .map(|signal| {
                let mut rx = signal.subscribe();
                async move {
                    // A closed channel means the scope was dropped; treat it as cancelled.
                    let _ = rx.wait_for(|cancelled| *cancelled).await;
                }
                .boxed()
            })
            .collect();

        let cancelled = future::select_all(waiters);

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = cancelled => ContextError::Cancelled,
                    _ = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
                }
            }
            None => {
                cancelled.await;
                ContextError::Cancelled
            }
        }
    }

    /// Drives `fut` to completion unless this scope finishes first
    ///
    /// An already-finished scope never polls `fut`.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }

        tokio::select! {
            biased;
            err = self.done() => Err(err),
            out = fut => Ok(out),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
