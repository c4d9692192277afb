use std::time::Duration;

use kanal::AsyncSender;
use tokio::task::JoinHandle;

/// Single-shot delayed send with cancel-and-reschedule semantics.
///
/// Each schedule gets a fresh generation. An aborted timer may already have
/// queued its message, so receivers must check it with [`Debouncer::take`].
pub struct Debouncer {
    delay: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancel whatever is pending and send `message(generation)` after the delay
    pub fn schedule<T, F>(&mut self, tx: &AsyncSender<T>, message: F) -> u64
    where
        T: Send + 'static,
        F: FnOnce(u64) -> T,
    {
        self.cancel();

        let generation = self.generation;
        let message = message(generation);
        let tx = tx.clone();
        let delay = self.delay;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(message).await.is_err() {
                tracing::debug!("debounce receiver dropped");
            }
        }));

        generation
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.generation = self.generation.wrapping_add(1);
    }

    /// True exactly once, for the generation that is still pending
    pub fn take(&mut self, generation: u64) -> bool {
        if self.pending.is_some() && generation == self.generation {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn reschedule_coalesces_to_last() {
        let (tx, rx) = kanal::unbounded_async();
        let mut debouncer = Debouncer::new(Duration::from_millis(700));

        debouncer.schedule(&tx, |g| ("a", g));
        tokio::time::sleep(Duration::from_millis(300)).await;
        debouncer.schedule(&tx, |g| ("b", g));
        tokio::time::sleep(Duration::from_millis(300)).await;
        let last = debouncer.schedule(&tx, |g| ("c", g));

        tokio::time::sleep(Duration::from_millis(701)).await;

        let (text, generation) = rx.recv().await.unwrap();
        assert_eq!(text, "c");
        assert_eq!(generation, last);
        assert!(debouncer.take(generation));
        assert!(!debouncer.take(generation));
        assert!(matches!(rx.try_recv(), Ok(None)));
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_fires_before_delay() {
        let (tx, rx) = kanal::unbounded_async::<u64>();
        let mut debouncer = Debouncer::new(Duration::from_millis(700));

        debouncer.schedule(&tx, |g| g);
        tokio::time::sleep(Duration::from_millis(699)).await;

        assert!(matches!(rx.try_recv(), Ok(None)));
        assert!(debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn queued_message_is_stale_after_cancel() {
        let (tx, rx) = kanal::unbounded_async::<u64>();
        let mut debouncer = Debouncer::new(Duration::from_millis(10));

        debouncer.schedule(&tx, |g| g);
        tokio::time::sleep(Duration::from_millis(20)).await;
        // Timer already fired, message sits in the channel
        debouncer.cancel();

        let generation = rx.recv().await.unwrap();
        assert!(!debouncer.take(generation));
    }
}
