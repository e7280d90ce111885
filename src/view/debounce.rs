//! Redraw debouncing
//!
//! Coalesces bursts of "content changed" signals into at most one redraw per
//! interval. The first signal arms the timer; signals arriving while armed are
//! absorbed; the redraw fires once the interval has elapsed since arming.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Debouncer {
    interval: Duration,
    /// When the pending redraw becomes due
    due: Option<Instant>,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self { interval, due: None }
    }

    /// Record a change. Returns true if this signal armed a new redraw.
    pub fn signal(&mut self, now: Instant) -> bool {
        if self.due.is_some() {
            return false;
        }
        self.due = Some(now + self.interval);
        true
    }

    /// Returns true exactly once per armed redraw, when it is due
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }

    /// Time left until the pending redraw, if one is scheduled
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.due.map(|due| due.saturating_duration_since(now))
    }

    /// Drop any pending redraw, returning whether one was pending
    pub fn take_pending(&mut self) -> bool {
        self.due.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(300);

    #[test]
    fn test_burst_coalesces_into_one_redraw() {
        let start = Instant::now();
        let mut d = Debouncer::new(INTERVAL);

        assert!(d.signal(start));
        for ms in [10, 50, 120, 299] {
            assert!(!d.signal(start + Duration::from_millis(ms)));
        }
        assert_eq!(d.time_until_due(start), Some(INTERVAL));
        assert!(!d.poll(start + Duration::from_millis(299)));
        assert!(d.poll(start + INTERVAL));
        assert!(!d.poll(start + Duration::from_millis(900)));
        assert_eq!(d.time_until_due(start), None);
    }

    #[test]
    fn test_signal_after_fire_rearms() {
        let start = Instant::now();
        let mut d = Debouncer::new(INTERVAL);

        d.signal(start);
        assert!(d.poll(start + INTERVAL));
        assert!(d.signal(start + Duration::from_millis(400)));
        assert_eq!(
            d.time_until_due(start + Duration::from_millis(500)),
            Some(Duration::from_millis(200))
        );
    }

    #[test]
    fn test_idle_never_fires() {
        let mut d = Debouncer::new(INTERVAL);
        assert!(!d.poll(Instant::now() + Duration::from_secs(5)));
        assert_eq!(d.time_until_due(Instant::now()), None);
    }

    #[test]
    fn test_take_pending() {
        let mut d = Debouncer::new(INTERVAL);
        assert!(!d.take_pending());
        d.signal(Instant::now());
        assert!(d.take_pending());
        assert!(!d.take_pending());
    }
}
