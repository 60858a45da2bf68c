//! Monotonic time source for deadlines and retry gaps.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub trait Clock: Send {
    /// Time since an arbitrary fixed origin.
    fn now(&self) -> Duration;

    fn sleep(&self, d: Duration);
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }
}

/// Deterministic clock: every `now()` advances by `tick`, `sleep` jumps ahead.
///
/// With a 1 ms tick a busy-poll loop against a 100 ms deadline runs a bounded
/// number of iterations, which keeps timeout tests instant.
#[derive(Debug, Clone)]
pub struct StepClock {
    micros: Arc<AtomicU64>,
    tick: Duration,
}

impl StepClock {
    pub fn new(tick: Duration) -> Self {
        Self {
            micros: Arc::new(AtomicU64::new(0)),
            tick,
        }
    }

    /// Current reading without advancing.
    pub fn peek(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::SeqCst))
    }

    pub fn advance(&self, d: Duration) {
        self.micros
            .fetch_add(d.as_micros() as u64, Ordering::SeqCst);
    }
}

impl Default for StepClock {
    fn default() -> Self {
        Self::new(Duration::from_millis(1))
    }
}

impl Clock for StepClock {
    fn now(&self) -> Duration {
        let before = self
            .micros
            .fetch_add(self.tick.as_micros() as u64, Ordering::SeqCst);
        Duration::from_micros(before)
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_clock_ticks_on_read() {
        let c = StepClock::new(Duration::from_millis(2));
        assert_eq!(c.now(), Duration::ZERO);
        assert_eq!(c.now(), Duration::from_millis(2));
        c.sleep(Duration::from_millis(10));
        assert_eq!(c.peek(), Duration::from_millis(14));
    }

    #[test]
    fn clones_share_time() {
        let a = StepClock::default();
        let b = a.clone();
        a.advance(Duration::from_millis(5));
        assert_eq!(b.peek(), Duration::from_millis(5));
    }
}
