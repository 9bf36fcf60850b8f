//! Cancellation support for in-flight logical calls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

/// Cancels every logical call that holds one of its watchers.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(tx),
        }
    }

    /// Cancels pending delays and sends.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Creates a watcher observing this token.
    pub fn watcher(&self) -> CancellationWatcher {
        CancellationWatcher {
            cancelled: self.cancelled.clone(),
            notify: self.notify.subscribe(),
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of a [`CancellationToken`].
#[derive(Clone, Debug)]
pub struct CancellationWatcher {
    cancelled: Arc<AtomicBool>,
    notify: watch::Receiver<bool>,
}

impl CancellationWatcher {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&mut self) {
        while !*self.notify.borrow_and_update() {
            if self.notify.changed().await.is_err() {
                // Token dropped without cancelling.
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::CancellationToken;

    #[tokio::test]
    async fn watcher_observes_cancel() {
        let token = CancellationToken::new();
        let mut watcher = token.watcher();
        assert!(!watcher.is_cancelled());

        let handle = tokio::spawn(async move {
            watcher.cancelled().await;
            true
        });

        tokio::time::sleep(Duration::from_millis(5)).await;
        token.cancel();

        assert!(handle.await.expect("task must finish"));
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn watcher_created_after_cancel_resolves_immediately() {
        let token = CancellationToken::new();
        token.cancel();
        let mut watcher = token.watcher();
        assert!(watcher.is_cancelled());
        tokio::time::timeout(Duration::from_millis(50), watcher.cancelled())
            .await
            .expect("must resolve without waiting");
    }

    #[tokio::test]
    async fn dropped_token_never_resolves() {
        let token = CancellationToken::new();
        let mut watcher = token.watcher();
        drop(token);
        let waited = tokio::time::timeout(Duration::from_millis(20), watcher.cancelled()).await;
        assert!(waited.is_err());
    }
}
