use std::time::Duration;

/// Cadence and bound of a poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub fast_interval: Duration,
    /// Polls that use `fast_interval` before switching to `slow_interval`.
    pub fast_polls: u32,
    pub slow_interval: Duration,
    /// Polls after which the loop gives up. The job itself keeps running.
    pub max_attempts: u32,
}

impl Default for PollSchedule {
    fn default() -> Self {
        PollSchedule {
            fast_interval: Duration::from_secs(1),
            fast_polls: 30,
            slow_interval: Duration::from_secs(2),
            max_attempts: 3000,
        }
    }
}

impl PollSchedule {
    /// Wait after the `attempt`-th poll (1-based) before the next one.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        if attempt <= self.fast_polls {
            self.fast_interval
        } else {
            self.slow_interval
        }
    }
}
