use tokio::sync::watch;

/// Counts down from `n`; waiters are released once the count reaches zero.
#[derive(Debug, Clone)]
pub struct CountdownLatch {
    remaining: watch::Sender<usize>,
}

impl CountdownLatch {
    #[must_use]
    pub fn new(count: usize) -> Self {
        let (remaining, _) = watch::channel(count);
        Self { remaining }
    }

    pub fn count_down(&self) {
        self.remaining
            .send_modify(|remaining| *remaining = remaining.saturating_sub(1));
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        *self.remaining.borrow()
    }

    /// Resolves once the count is zero.
    pub async fn wait(&self) {
        let mut receiver = self.remaining.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting.
        drop(receiver.wait_for(|remaining| *remaining == 0).await);
    }
}
