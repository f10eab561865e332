use std::time::{Duration, Instant};

/// Trailing debounce: only the latest pushed value is kept, and it is
/// released once `window` has passed without another push.
///
/// Time is passed in by the caller so the event loop can drive it from its
/// own poll timeout.
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

    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Time left before the pending value is released, if any is pending.
    pub fn time_remaining(&self, now: Instant) -> Option<Duration> {
        self.pending
            .as_ref()
            .map(|(_, at)| self.window.saturating_sub(now.saturating_duration_since(*at)))
    }

    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.time_remaining(now) {
            Some(left) if left.is_zero() => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }

    /// Release the pending value immediately.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(300);

    #[test]
    fn test_nothing_pending() {
        let mut d: Debouncer<u32> = Debouncer::new(WINDOW);
        let now = Instant::now();
        assert!(d.poll(now).is_none());
        assert!(d.time_remaining(now).is_none());
    }

    #[test]
    fn test_releases_after_window() {
        let mut d = Debouncer::new(WINDOW);
        let t0 = Instant::now();
        d.push(1, t0);
        assert!(d.poll(t0 + Duration::from_millis(299)).is_none());
        assert_eq!(d.poll(t0 + WINDOW), Some(1));
        assert!(!d.is_pending());
    }

    #[test]
    fn test_rapid_pushes_coalesce_to_latest() {
        let mut d = Debouncer::new(WINDOW);
        let t0 = Instant::now();
        d.push(1, t0);
        d.push(2, t0 + Duration::from_millis(200));
        d.push(3, t0 + Duration::from_millis(400));
        // window restarts on each push
        assert!(d.poll(t0 + Duration::from_millis(600)).is_none());
        assert_eq!(
            d.time_remaining(t0 + Duration::from_millis(600)),
            Some(Duration::from_millis(100))
        );
        assert_eq!(d.poll(t0 + Duration::from_millis(700)), Some(3));
        assert!(d.poll(t0 + Duration::from_millis(2000)).is_none());
    }

    #[test]
    fn test_flush() {
        let mut d = Debouncer::new(WINDOW);
        d.push("a", Instant::now());
        assert_eq!(d.flush(), Some("a"));
        assert_eq!(d.flush(), None);
    }
}
