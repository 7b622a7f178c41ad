use crate::clock::{Clock, TimerHandle};
use crate::queue::TimerQueue;
use std::time::{Duration, Instant};

/// Monotonic clock for the real host. The frame loop pumps [`Clock::due`]
/// once per redraw; nothing here sleeps or spawns threads.
pub struct FrameClock {
    queue: TimerQueue<Instant>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            queue: TimerQueue::new(),
        }
    }

    /// Number of timers currently scheduled.
    pub fn outstanding(&self) -> usize {
        self.queue.outstanding()
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FrameClock {
    fn after(&mut self, delay: Duration) -> TimerHandle {
        self.queue.schedule(Instant::now(), delay, None)
    }

    fn every(&mut self, period: Duration) -> TimerHandle {
        self.queue.schedule(Instant::now(), period, Some(period))
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.queue.cancel(handle);
    }

    fn due(&mut self) -> Vec<TimerHandle> {
        self.queue.due(Instant::now())
    }
}
