//! Delay coalescing for rapidly changing inputs.
//!
//! A value settles only after it has been left alone for the full delay.
//! Every new value restarts the quiet period and replaces the pending one.
//! There is no maximum-wait ceiling.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
struct Pending<T> {
    value: T,
    deadline: Instant,
}

#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<Pending<T>>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn push(&mut self, value: T) {
        self.push_at(value, Instant::now());
    }

    /// Replace the pending value and restart the quiet period from `now`.
    pub fn push_at(&mut self, value: T, now: Instant) {
        if self.pending.is_some() {
            tracing::trace!("debounce timer restarted");
        }
        self.pending = Some(Pending {
            value,
            deadline: now + self.delay,
        });
    }

    pub fn poll(&mut self) -> Option<T> {
        self.poll_at(Instant::now())
    }

    /// Take the pending value if its quiet period has elapsed by `now`.
    pub fn poll_at(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some(pending) if now >= pending.deadline => self.pending.take().map(|p| p.value),
            _ => None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop the pending value so it never fires.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.value)
    }

    /// Wait until the pending value settles. Returns `None` when nothing is pending.
    pub async fn settled(&mut self) -> Option<T> {
        let deadline = self.deadline()?;
        tokio::time::sleep_until(deadline).await;
        self.poll_at(deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settles_only_after_quiet_period() {
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        let start = Instant::now();

        debouncer.push_at("a", start);
        assert_eq!(debouncer.poll_at(start + Duration::from_millis(499)), None);
        assert_eq!(debouncer.poll_at(start + Duration::from_millis(500)), Some("a"));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_new_value_restarts_timer() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        let start = Instant::now();

        debouncer.push_at("r", start);
        debouncer.push_at("re", start + Duration::from_millis(200));
        debouncer.push_at("rep", start + Duration::from_millis(400));

        assert_eq!(debouncer.poll_at(start + Duration::from_millis(650)), None);
        assert_eq!(debouncer.poll_at(start + Duration::from_millis(700)), Some("rep"));
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        let start = Instant::now();
        debouncer.push_at(1, start);
        assert_eq!(debouncer.cancel(), Some(1));
        assert_eq!(debouncer.poll_at(start + Duration::from_secs(1)), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_waits_for_deadline() {
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        let start = Instant::now();
        debouncer.push("invoice".to_string());

        let value = debouncer.settled().await;
        assert_eq!(value.as_deref(), Some("invoice"));
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert_eq!(debouncer.settled().await, None);
    }
}
