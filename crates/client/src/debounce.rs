//! Trailing-edge debounce for column-filter edits.
//!
//! Each new value restarts the quiet period; only the last value pushed
//! is released once the period elapses without further edits.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a new value and restart the quiet period.
    pub fn push(&mut self, value: T) {
        self.pending = Some((value, Instant::now() + self.window));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// The pending value, if its quiet period has elapsed.
    pub fn take_ready(&mut self) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if Instant::now() >= *deadline => {
                self.pending.take().map(|(value, _)| value)
            }
            _ => None,
        }
    }

    /// Wait out the quiet period and release the pending value.
    pub async fn settled(&mut self) -> Option<T> {
        let deadline = self.deadline()?;
        tokio::time::sleep_until(deadline).await;
        self.pending.take().map(|(value, _)| value)
    }

    /// Drop the pending value without releasing it.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(500);

    #[tokio::test(start_paused = true)]
    async fn test_value_held_until_quiet_period_elapses() {
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.push("m");

        tokio::time::advance(Duration::from_millis(499)).await;
        assert_eq!(debouncer.take_ready(), None);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(debouncer.take_ready(), Some("m"));
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_value_restarts_window() {
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.push("m");
        tokio::time::advance(Duration::from_millis(300)).await;
        debouncer.push("ma");
        tokio::time::advance(Duration::from_millis(300)).await;
        assert_eq!(debouncer.take_ready(), None);

        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(debouncer.take_ready(), Some("ma"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_waits_for_deadline() {
        let mut debouncer = Debouncer::new(WINDOW);
        assert_eq!(debouncer.settled().await, None::<&str>);

        let start = Instant::now();
        debouncer.push("math");
        assert_eq!(debouncer.settled().await, Some("math"));
        assert!(Instant::now() - start >= WINDOW);
    }

    #[tokio::test]
    async fn test_cancel_discards() {
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.push(1);
        assert_eq!(debouncer.cancel(), Some(1));
        assert!(debouncer.deadline().is_none());
    }
}
