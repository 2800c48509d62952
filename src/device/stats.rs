//! Device Statistics

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::device::context::BatchSummary;

/// Counters updated by the poll cycle
#[derive(Debug, Default)]
pub struct DeviceStats {
    cycles: AtomicU64,
    entries: AtomicU64,
    keys: AtomicU64,
    mouse_events: AtomicU64,
    unmapped: AtomicU64,
    bus_errors: AtomicU64,
}

/// Point-in-time copy of [`DeviceStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Completed poll cycles
    pub cycles: u64,
    /// FIFO entries decoded
    pub entries: u64,
    /// Key events emitted
    pub keys: u64,
    /// Entries handled by mouse mode
    pub mouse_events: u64,
    /// Scancodes with no mapping
    pub unmapped: u64,
    /// Cycles aborted by a bus failure
    pub bus_errors: u64,
}

impl DeviceStats {
    /// Account for one completed cycle
    pub fn record_cycle(&self, summary: &BatchSummary) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.entries.fetch_add(summary.entries as u64, Ordering::Relaxed);
        self.keys.fetch_add(summary.keys as u64, Ordering::Relaxed);
        self.mouse_events.fetch_add(summary.mouse as u64, Ordering::Relaxed);
        self.unmapped.fetch_add(summary.unmapped as u64, Ordering::Relaxed);
    }

    /// Account for one aborted cycle
    pub fn record_bus_error(&self) {
        self.bus_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            entries: self.entries.load(Ordering::Relaxed),
            keys: self.keys.load(Ordering::Relaxed),
            mouse_events: self.mouse_events.load(Ordering::Relaxed),
            unmapped: self.unmapped.load(Ordering::Relaxed),
            bus_errors: self.bus_errors.load(Ordering::Relaxed),
        }
    }
}
