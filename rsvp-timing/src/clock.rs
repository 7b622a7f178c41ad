use std::time::Duration;

/// Opaque identity of a scheduled timer. Unique per schedule within one
/// clock; a handle returned by `after`/`every` is the only way to cancel or
/// recognize that timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub(crate) u64);

/// The only time source the trial controller sees.
///
/// Timers do not carry callbacks; ownership of the [`TimerHandle`] is the
/// contract. The host pumps [`Clock::due`] once per frame and feeds each
/// fired handle back into the controller, which keeps cancellation
/// unambiguous and the whole machine testable without wall-clock waiting.
pub trait Clock {
    /// Schedule a one-shot timer.
    fn after(&mut self, delay: Duration) -> TimerHandle;

    /// Schedule a repeating timer. The handle stays the same across firings.
    fn every(&mut self, period: Duration) -> TimerHandle;

    /// Cancel a timer immediately; a cancelled handle never fires again.
    /// Unknown handles are ignored.
    fn cancel(&mut self, handle: TimerHandle);

    /// Drain every timer whose deadline has passed, in deadline order.
    /// One-shot timers are consumed; repeating timers fire at most once per
    /// call and re-arm without catching up on lost time.
    fn due(&mut self) -> Vec<TimerHandle>;
}
