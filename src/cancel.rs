//! A minimal cancellation token shared by the client execution loop and, in
//! principle, any long-lived collaborator built on top of this crate (an
//! SSE/WebSocket loop per the spec's design notes).
//!
//! This is the same shutdown-signal shape [`crate::server::Server`] already
//! uses — `tokio::select!` racing real work against a notification future —
//! just reusable per-request instead of process-wide.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

#[derive(Clone)]
pub struct CancelToken(Arc<Inner>);

struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(Inner {
            cancelled: AtomicBool::new(false),
            notify: Notify::new(),
        }))
    }

    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once cancelled. Returns immediately if already cancelled at
    /// call time.
    ///
    /// The `Notified` future is created *before* the flag check, not after:
    /// `Notify` snapshots its notification counter the moment `notified()`
    /// is called, so a `cancel()` landing anywhere after that snapshot —
    /// including between this check and the `.await` below — still wakes
    /// it. Checking the flag first and creating the future second would
    /// leave exactly that window open to a lost wakeup.
    pub async fn cancelled(&self) {
        let notified = self.0.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancelled_resolves_immediately_if_already_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        tokio::time::timeout(std::time::Duration::from_millis(50), token.cancelled())
            .await
            .expect("should not time out");
    }

    #[tokio::test]
    async fn cancel_wakes_a_pending_waiter() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });
        tokio::task::yield_now().await;
        token.cancel();
        handle.await.unwrap();
    }
}
