//! Monotonic Time
//!
//! All timestamps in the driver are nanoseconds on a monotonic clock that
//! keeps counting through suspend (`CLOCK_BOOTTIME`).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nix::time::{clock_gettime, ClockId};

/// Source of monotonic nanosecond timestamps
pub trait MonotonicClock: Send + Sync {
    /// Current time in nanoseconds
    fn now_ns(&self) -> u64;
}

/// `CLOCK_BOOTTIME`, falling back to `CLOCK_MONOTONIC`
#[derive(Debug, Clone, Copy, Default)]
pub struct BootClock;

impl MonotonicClock for BootClock {
    fn now_ns(&self) -> u64 {
        let ts = clock_gettime(ClockId::CLOCK_BOOTTIME)
            .or_else(|_| clock_gettime(ClockId::CLOCK_MONOTONIC))
            .map(Duration::from)
            .unwrap_or_default();
        ts.as_nanos().min(u64::MAX as u128) as u64
    }
}

/// Hand-driven clock for tests and replay
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Start at `start_ns`
    pub fn new(start_ns: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ns)),
        }
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        let by = by.as_nanos().min(u64::MAX as u128) as u64;
        self.now.fetch_add(by, Ordering::SeqCst);
    }

    /// Jump to an absolute time
    pub fn set(&self, now_ns: u64) {
        self.now.store(now_ns, Ordering::SeqCst);
    }
}

impl MonotonicClock for ManualClock {
    fn now_ns(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Timestamp written by the dispatch cycle and read from anywhere
///
/// Only the cycle stores; readers get a snapshot.
#[derive(Debug, Clone, Default)]
pub struct SharedTimestamp {
    ns: Arc<AtomicU64>,
}

impl SharedTimestamp {
    /// Create holding `ns`
    pub fn new(ns: u64) -> Self {
        Self {
            ns: Arc::new(AtomicU64::new(ns)),
        }
    }

    /// Snapshot of the stored value
    pub fn load(&self) -> u64 {
        self.ns.load(Ordering::Acquire)
    }

    /// Overwrite the stored value
    pub fn store(&self, ns: u64) {
        self.ns.store(ns, Ordering::Release);
    }

    /// Milliseconds elapsed between the stored value and `now_ns`
    ///
    /// `None` when the stored value is not in the past.
    pub fn elapsed_ms(&self, now_ns: u64) -> Option<u64> {
        let stamp = self.load();
        (stamp < now_ns).then(|| (now_ns - stamp) / 1_000_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boot_clock_is_monotonic() {
        let clock = BootClock;
        let a = clock.now_ns();
        let b = clock.now_ns();
        assert!(a > 0);
        assert!(b >= a);
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(5);
        let other = clock.clone();
        other.advance(Duration::from_nanos(10));
        assert_eq!(clock.now_ns(), 15);
        clock.set(100);
        assert_eq!(other.now_ns(), 100);
    }

    #[test]
    fn test_elapsed_ms() {
        let stamp = SharedTimestamp::new(1_000_000);
        assert_eq!(stamp.elapsed_ms(251_000_000), Some(250));
        assert_eq!(stamp.elapsed_ms(1_000_000), None);
        assert_eq!(stamp.elapsed_ms(0), None);
    }
}
