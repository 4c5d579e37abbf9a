//! Autosave timer
//!
//! Frame-driven countdown owned by the coordinator. The owner thread feeds it
//! frame deltas; it reports when a save is due and never touches storage.

use std::time::Duration;

use crate::config::autosave_period;

/// Periodic autosave countdown
#[derive(Debug, Clone)]
pub struct AutosaveTimer {
    /// Requested interval in seconds, before clamping
    requested_secs: f32,
    /// Effective period, `None` when disabled
    period: Option<Duration>,
    /// Time since the last expiry or restart
    since_last: Duration,
    /// Set once the coordinator is torn down
    stopped: bool,
}

impl AutosaveTimer {
    /// Create a timer. Intervals at or below zero disable it.
    pub fn new(interval_secs: f32) -> Self {
        let requested_secs = interval_secs.max(0.0);
        Self {
            requested_secs,
            period: autosave_period(requested_secs),
            since_last: Duration::ZERO,
            stopped: false,
        }
    }

    /// Advance by one frame; true when a save should be requested
    pub fn update(&mut self, delta: Duration) -> bool {
        let Some(period) = self.period else {
            return false;
        };
        if self.stopped {
            return false;
        }

        self.since_last += delta;
        if self.since_last >= period {
            // One save per expiry even after a long stall
            self.since_last = Duration::ZERO;
            true
        } else {
            false
        }
    }

    /// Change the interval and restart the countdown
    pub fn set_interval(&mut self, interval_secs: f32) {
        self.requested_secs = interval_secs.max(0.0);
        self.period = autosave_period(self.requested_secs);
        self.restart();
    }

    pub fn restart(&mut self) {
        self.since_last = Duration::ZERO;
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Interval as requested, after clamping negatives to zero
    pub fn interval_secs(&self) -> f32 {
        self.requested_secs
    }

    /// Effective period after the minimum floor
    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.period.is_some() && !self.stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_after_period() {
        let mut timer = AutosaveTimer::new(10.0);
        assert!(!timer.update(Duration::from_secs(6)));
        assert!(timer.update(Duration::from_secs(4)));
        assert!(!timer.update(Duration::from_secs(1)));
    }

    #[test]
    fn test_minimum_floor() {
        let mut timer = AutosaveTimer::new(1.0);
        assert_eq!(timer.period(), Some(Duration::from_secs(5)));
        assert!(!timer.update(Duration::from_secs(2)));
        assert!(timer.update(Duration::from_secs(3)));
    }

    #[test]
    fn test_disabled() {
        let mut timer = AutosaveTimer::new(-4.0);
        assert_eq!(timer.interval_secs(), 0.0);
        assert!(!timer.is_running());
        assert!(!timer.update(Duration::from_secs(3600)));
    }

    #[test]
    fn test_interval_change_restarts() {
        let mut timer = AutosaveTimer::new(10.0);
        assert!(!timer.update(Duration::from_secs(9)));
        timer.set_interval(20.0);
        assert!(!timer.update(Duration::from_secs(19)));
        assert!(timer.update(Duration::from_secs(1)));
    }

    #[test]
    fn test_stop() {
        let mut timer = AutosaveTimer::new(5.0);
        timer.stop();
        assert!(!timer.is_running());
        assert!(!timer.update(Duration::from_secs(10)));
    }
}
