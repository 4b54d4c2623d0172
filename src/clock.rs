
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Time source for settle intervals and the acquisition poll ceiling.
/// Injectable so tests can advance time without real delays.
pub trait Clock {
    /// Elapsed time since the clock's epoch.
    fn now(&self) -> Duration;

    /// Block for `d` of this clock's time.
    fn sleep(&self, d: Duration);
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Duration { (**self).now() }
    fn sleep(&self, d: Duration) { (**self).sleep(d) }
}

/// Real wall-clock time over an `Instant` epoch.
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self { Self::new() }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration { self.epoch.elapsed() }
    fn sleep(&self, d: Duration) { thread::sleep(d); }
}

/// Manually-advanced time. `sleep` advances the clock instantly, so a test
/// can measure how long a polling loop would have waited.
pub struct ManualClock {
    now_us: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { now_us: AtomicU64::new(0) }
    }

    pub fn advance(&self, d: Duration) {
        self.now_us.fetch_add(d.as_micros() as u64, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self { Self::new() }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration { Duration::from_micros(self.now_us.load(Ordering::SeqCst)) }
    fn sleep(&self, d: Duration) { self.advance(d); }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn manual_clock_advances_on_sleep() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), Duration::from_secs(0));

        clock.sleep(Duration::from_secs(2));
        clock.advance(Duration::from_millis(500));
        assert_eq!(clock.now(), Duration::from_millis(2500));
    }

    #[test]
    fn shared_manual_clock_is_one_clock() {
        let clock = Arc::new(ManualClock::new());
        let handle = clock.clone();

        handle.sleep(Duration::from_secs(3));
        assert_eq!(clock.now(), Duration::from_secs(3));
    }

}
