//! Cascading cancellation contexts
//!
//! An [`ExecutionContext`] carries a deadline and a cancellation flag. Child
//! contexts are derived with [`ExecutionContext::child`], which caps the child
//! deadline at the parent's so a case can never outlive the suite budget.
//! Cancelling a context cancels every context derived from it.
//!
//! Contexts are handed out wrapped in a [`ContextGuard`]. Dropping the guard
//! cancels the context, which wakes every waiter and drops their timers on
//! whichever path the scope is left by.

use crate::errors::{CaseError, CaseResult};
use futures::future::{self, BoxFuture, FutureExt};
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Deadline used when `now + timeout` overflows the clock
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Cancellation-aware execution context passed to every case
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    started_at: Instant,
    deadline: Instant,
    cancel_tx: watch::Sender<bool>,
    parent: Option<Arc<ContextInner>>,
}

impl ContextInner {
    fn new(deadline: Instant, parent: Option<Arc<ContextInner>>) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            started_at: Instant::now(),
            deadline,
            cancel_tx,
            parent,
        }
    }

    /// This node followed by all of its ancestors
    fn lineage(self: &Arc<Self>) -> Vec<Arc<ContextInner>> {
        let mut chain = vec![self.clone()];
        let mut current = self.parent.clone();
        while let Some(node) = current {
            current = node.parent.clone();
            chain.push(node);
        }
        chain
    }
}

impl ExecutionContext {
    /// Create a root context that expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> ContextGuard {
        let deadline = deadline_after(Instant::now(), timeout);
        ContextGuard {
            ctx: ExecutionContext {
                inner: Arc::new(ContextInner::new(deadline, None)),
            },
        }
    }

    /// Derive a child scope expiring at `min(self.deadline, now + timeout)`
    pub fn child(&self, timeout: Duration) -> ContextGuard {
        let requested = deadline_after(Instant::now(), timeout);
        let deadline = requested.min(self.inner.deadline);
        ContextGuard {
            ctx: ExecutionContext {
                inner: Arc::new(ContextInner::new(deadline, Some(self.inner.clone()))),
            },
        }
    }

    /// Effective deadline of this context
    pub fn deadline(&self) -> Instant {
        self.inner.deadline
    }

    /// Time left before the deadline, zero once it has passed
    pub fn remaining(&self) -> Duration {
        self.inner.deadline.saturating_duration_since(Instant::now())
    }

    /// Time since the context was created
    pub fn elapsed(&self) -> Duration {
        self.inner.started_at.elapsed()
    }

    /// Cancel this context and everything derived from it
    pub fn cancel(&self) {
        self.inner.cancel_tx.send_replace(true);
    }

    /// Whether the deadline has passed or this context or an ancestor was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.err().is_some()
    }

    /// The reason this context is done, if it is
    pub fn err(&self) -> Option<CaseError> {
        if Instant::now() >= self.inner.deadline {
            return Some(CaseError::DeadlineExceeded {
                elapsed: self.elapsed(),
            });
        }
        let cancelled = self
            .inner
            .lineage()
            .iter()
            .any(|node| *node.cancel_tx.borrow());
        cancelled.then_some(CaseError::Cancelled)
    }

    /// Resolves once the deadline fires or this context or an ancestor is cancelled
    pub async fn cancelled(&self) {
        let mut waiters: Vec<BoxFuture<'static, ()>> = self
            .inner
            .lineage()
            .iter()
            .map(|node| {
                let mut rx = node.cancel_tx.subscribe();
                async move {
                    // A dropped sender means the scope is gone; treat as cancelled.
                    let _ = rx.wait_for(|cancelled| *cancelled).await;
                }
                .boxed()
            })
            .collect();
        waiters.push(tokio::time::sleep_until(self.inner.deadline).boxed());

        future::select_all(waiters).await;
    }

    /// Drive `fut` to completion unless the context is done first
    pub async fn run<F, T>(&self, fut: F) -> CaseResult<T>
    where
        F: Future<Output = T>,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }

        tokio::select! {
            biased;
            out = fut => Ok(out),
            _ = self.cancelled() => Err(self.err().unwrap_or(CaseError::Cancelled)),
        }
    }

    /// Sleep for `duration`, returning early with an error if the context is done
    pub async fn sleep(&self, duration: Duration) -> CaseResult<()> {
        self.run(tokio::time::sleep(duration)).await
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("remaining", &self.remaining())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Owns a context scope; dropping it cancels the context
pub struct ContextGuard {
    ctx: ExecutionContext,
}

impl ContextGuard {
    /// A clone of the guarded context that can be moved into a case
    pub fn context(&self) -> ExecutionContext {
        self.ctx.clone()
    }
}

impl Deref for ContextGuard {
    type Target = ExecutionContext;

    fn deref(&self) -> &Self::Target {
        &self.ctx
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.ctx.cancel();
    }
}

fn deadline_after(now: Instant, timeout: Duration) -> Instant {
    now.checked_add(timeout)
        .unwrap_or_else(|| now + FAR_FUTURE)
}
