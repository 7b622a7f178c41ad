use crate::clock::{Clock, TimerHandle};
use crate::queue::TimerQueue;
use std::time::Duration;

/// Deterministic clock driven by explicit [`ManualClock::advance`] calls.
/// Time only moves when told to, so state-machine tests step through every
/// stage without wall-clock waiting.
pub struct ManualClock {
    queue: TimerQueue<Duration>,
    now: Duration,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            queue: TimerQueue::new(),
            now: Duration::ZERO,
        }
    }

    /// Move virtual time forward. Fired timers are reported by the next
    /// [`Clock::due`] call.
    pub fn advance(&mut self, d: Duration) {
        self.now += d;
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of timers currently scheduled. The controller invariant is
    /// that this never exceeds one.
    pub fn outstanding(&self) -> usize {
        self.queue.outstanding()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn after(&mut self, delay: Duration) -> TimerHandle {
        self.queue.schedule(self.now, delay, None)
    }

    fn every(&mut self, period: Duration) -> TimerHandle {
        self.queue.schedule(self.now, period, Some(period))
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.queue.cancel(handle);
    }

    fn due(&mut self) -> Vec<TimerHandle> {
        self.queue.due(self.now)
    }
}
