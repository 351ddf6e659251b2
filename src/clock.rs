//! Clock: Monotonic nanosecond timestamps.
//!
//! Every component that reasons about time (the timer registry, the event
//! loop) reads it through the [`Clock`] trait so the timer scenarios can be
//! driven by a simulated clock in tests.
//!
//! Timestamps are never `0`: the timer registry uses `0` as its
//! "never fired" sentinel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A source of monotonic nanosecond timestamps.
pub trait Clock: Send + Sync {
    /// Current timestamp in nanoseconds. Never `0`.
    fn now_ns(&self) -> u64;
}

/// Wall-clock backed monotonic clock.
///
/// Each call returns a value strictly greater than the previous one, even
/// when two calls land within the resolution of [`Instant`].
#[derive(Debug)]
pub struct MonotonicClock {
    /// Reference point for all timestamps.
    origin: Instant,
    /// Last value handed out.
    last: AtomicU64,
}

impl MonotonicClock {
    /// Create a clock whose timestamps start just above zero.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last: AtomicU64::new(0),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ns(&self) -> u64 {
        let elapsed = u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX);
        let candidate = elapsed.saturating_add(1);
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let next = candidate.max(last.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time source, so a test can keep one handle and
/// give another to the event loop.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Default starting point (1 ms), keeping clear of the `0` sentinel.
    pub const START_NS: u64 = 1_000_000;

    /// Create a manual clock at [`Self::START_NS`].
    pub fn new() -> Self {
        Self::starting_at(Self::START_NS)
    }

    /// Create a manual clock at an explicit timestamp.
    ///
    /// # Panics
    ///
    /// Panics if `start_ns` is `0`.
    pub fn starting_at(start_ns: u64) -> Self {
        assert!(start_ns > 0, "clock timestamps must be non-zero");
        Self {
            now: Arc::new(AtomicU64::new(start_ns)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.now.fetch_add(by, Ordering::AcqRel);
    }

    /// Current reading without going through the trait.
    pub fn get(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now_ns(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_monotonic_strictly_increasing() {
        let clock = MonotonicClock::new();
        let mut prev = clock.now_ns();
        assert!(prev > 0);
        for _ in 0..10_000 {
            let next = clock.now_ns();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn test_monotonic_across_threads() {
        let clock = Arc::new(MonotonicClock::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let clock = clock.clone();
                thread::spawn(move || (0..1000).map(|_| clock.now_ns()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();
        // Every reading is unique.
        assert_eq!(all.len(), total);
    }

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::new();
        let other = clock.clone();
        assert_eq!(clock.now_ns(), ManualClock::START_NS);

        other.advance(Duration::from_millis(10));
        assert_eq!(clock.now_ns(), ManualClock::START_NS + 10_000_000);
        assert_eq!(clock.get(), other.get());
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn test_manual_clock_rejects_zero() {
        let _ = ManualClock::starting_at(0);
    }
}
