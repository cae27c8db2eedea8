//! Cooperative cancellation for runs.
//!
//! A [`CancellationToken`] is owned by whoever may cancel; the running side
//! holds a [`CancellationReceiver`] and either checks it between steps or
//! races it against a wait or network call with `tokio::select!`.

use tokio::sync::watch;

/// Triggers cancellation of one run.
#[derive(Debug)]
pub struct CancellationToken {
    tx: watch::Sender<bool>,
}

impl CancellationToken {
    /// Creates an untriggered token.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Triggers cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Returns true once cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Returns a receiver observing this token.
    #[must_use]
    pub fn receiver(&self) -> CancellationReceiver {
        CancellationReceiver {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Observes a [`CancellationToken`].
#[derive(Debug, Clone)]
pub struct CancellationReceiver {
    rx: watch::Receiver<bool>,
}

impl CancellationReceiver {
    /// A receiver whose token can never fire.
    #[must_use]
    pub fn never() -> Self {
        CancellationToken::new().receiver()
    }

    /// Returns true once the token was triggered.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when the token is triggered.
    ///
    /// If the token is dropped without firing this never resolves.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_wakes_waiting_receiver() {
        let token = CancellationToken::new();
        let mut receiver = token.receiver();
        assert!(!receiver.is_cancelled());

        let waiter = async {
            receiver.cancelled().await;
            true
        };
        let trigger = async {
            tokio::task::yield_now().await;
            token.cancel();
        };
        let (woke, ()) = tokio::join!(waiter, trigger);
        assert!(woke);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn receiver_created_after_cancel_sees_it() {
        let token = CancellationToken::new();
        token.cancel();
        let mut receiver = token.receiver();
        assert!(receiver.is_cancelled());
        receiver.cancelled().await;
    }

    #[tokio::test]
    async fn never_receiver_does_not_fire() {
        let mut receiver = CancellationReceiver::never();
        let fired = tokio::time::timeout(Duration::from_millis(20), receiver.cancelled()).await;
        assert!(fired.is_err());
    }
}
