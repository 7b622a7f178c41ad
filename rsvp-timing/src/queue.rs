use crate::clock::TimerHandle;
use std::ops::Add;
use std::time::Duration;

struct Entry<T> {
    handle: TimerHandle,
    deadline: T,
    period: Option<Duration>,
}

/// Deadline bookkeeping shared by the real and the manual clock. `T` is the
/// instant type; the caller supplies "now" on every operation.
pub(crate) struct TimerQueue<T> {
    entries: Vec<Entry<T>>,
    next_id: u64,
}

impl<T> TimerQueue<T>
where
    T: Copy + Ord + Add<Duration, Output = T>,
{
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    pub(crate) fn schedule(&mut self, now: T, delay: Duration, period: Option<Duration>) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            handle,
            deadline: now + delay,
            period,
        });
        handle
    }

    pub(crate) fn cancel(&mut self, handle: TimerHandle) {
        self.entries.retain(|e| e.handle != handle);
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.entries.len()
    }

    /// Fire everything due at `now`, each entry at most once, in deadline
    /// order. Repeating entries re-arm one period out from their old
    /// deadline; if the host pumped late, the next deadline is pushed past
    /// `now` instead of replaying the missed ticks.
    pub(crate) fn due(&mut self, now: T) -> Vec<TimerHandle> {
        let mut fired: Vec<(T, TimerHandle)> = Vec::new();
        self.entries.retain_mut(|e| {
            if e.deadline > now {
                return true;
            }
            fired.push((e.deadline, e.handle));
            match e.period {
                Some(period) => {
                    let next = e.deadline + period;
                    e.deadline = if next > now { next } else { now + period };
                    true
                }
                None => false,
            }
        });
        fired.sort_by_key(|(deadline, _)| *deadline);
        fired.into_iter().map(|(_, h)| h).collect()
    }
}
