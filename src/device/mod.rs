//! Keyboard Device
//!
//! Binds the register bus, the input sink and the per-device context into
//! the drain-and-dispatch cycle, and manages its attach/detach lifecycle.
//!
//! # Cycle
//!
//! ```text
//! PollScheduler tick
//!       ↓
//! drain_fifo (bus locked)  ── bus error ──> cycle aborted, logged
//!       ↓
//! KeyEventDispatcher, per entry, FIFO order
//!       ↓
//! mouse motion tick
//!       ↓
//! queue cleared, Sync
//! ```

pub mod attributes;
pub mod bus;
pub mod clock;
pub mod context;
pub mod i2c;
pub mod scheduler;
pub mod stats;
pub mod uinput;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

pub use attributes::{Attribute, DeviceAttributes};
pub use bus::{RegisterBus, SharedBus};
pub use clock::{BootClock, ManualClock, MonotonicClock, SharedTimestamp};
pub use context::{BatchSummary, DeviceContext};
pub use scheduler::{PollCycle, PollScheduler, PollTrigger, DEFAULT_POLL_PERIOD};
pub use stats::{DeviceStats, StatsSnapshot};

use crate::input::error::{recovery_action, RecoveryAction, Result};
use crate::input::fifo::drain_fifo;
use crate::input::sink::InputSink;

/// One keyboard: bus, sink, clock and context
pub struct KeyboardDevice {
    bus: SharedBus,
    sink: Box<dyn InputSink>,
    clock: Arc<dyn MonotonicClock>,
    context: DeviceContext,
    stats: Arc<DeviceStats>,
    attached: Arc<AtomicBool>,
}

impl std::fmt::Debug for KeyboardDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyboardDevice")
            .field("context", &self.context)
            .field("attached", &self.attached.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl KeyboardDevice {
    /// Create a detached device
    pub fn new(
        bus: SharedBus,
        sink: Box<dyn InputSink>,
        clock: Arc<dyn MonotonicClock>,
        context: DeviceContext,
    ) -> Self {
        Self {
            bus,
            sink,
            clock,
            context,
            stats: Arc::new(DeviceStats::default()),
            attached: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Per-device state
    pub fn context(&self) -> &DeviceContext {
        &self.context
    }

    /// Per-device state, mutable
    pub fn context_mut(&mut self) -> &mut DeviceContext {
        &mut self.context
    }

    /// Counter handle
    pub fn stats(&self) -> Arc<DeviceStats> {
        Arc::clone(&self.stats)
    }

    /// Whether the device is attached
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    /// Attribute handle sharing this device's bus and state
    pub fn attributes(&self) -> DeviceAttributes {
        DeviceAttributes::new(
            Arc::clone(&self.bus),
            self.context.last_keypress().clone(),
            Arc::clone(&self.clock),
            Arc::clone(&self.attached),
            Arc::clone(&self.stats),
        )
    }

    /// Drain the FIFO and dispatch the batch
    ///
    /// A bus failure aborts the cycle before anything is dispatched; the
    /// queue is left empty and the next cycle starts fresh.
    pub fn poll_cycle(&mut self) -> Result<BatchSummary> {
        let drained = {
            let mut bus = self.bus.lock();
            drain_fifo(&mut *bus, self.context.queue_mut())
        };

        if let Err(e) = drained {
            self.stats.record_bus_error();
            return Err(e);
        }

        let mut summary = self.context.dispatch_queued(&*self.clock, &mut self.sink);
        summary.motion = self.context.finish_cycle(self.clock.now_ns(), &mut self.sink);
        self.stats.record_cycle(&summary);

        if summary.entries > 0 {
            debug!(
                "Cycle: {} entries, {} keys, {} mouse, {} unmapped",
                summary.entries, summary.keys, summary.mouse, summary.unmapped
            );
        }

        Ok(summary)
    }

    fn mark_attached(&mut self) {
        self.context.last_keypress().store(self.clock.now_ns());
        self.attached.store(true, Ordering::Release);
    }

    /// Stamp the activity clock and start polling
    ///
    /// Must be called from within a tokio runtime. Fails on a zero period,
    /// leaving nothing attached.
    pub fn attach(mut self, period: Duration) -> Result<AttachedDevice> {
        self.mark_attached();
        let attributes = self.attributes();

        let scheduler = match PollScheduler::arm(self, period) {
            Ok(scheduler) => scheduler,
            Err(e) => {
                attributes.mark_detached();
                return Err(e);
            }
        };
        info!("Keyboard attached, polling every {:?}", period);

        Ok(AttachedDevice {
            scheduler,
            attributes,
        })
    }
}

impl PollCycle for KeyboardDevice {
    fn run_cycle(&mut self) {
        if let Err(e) = self.poll_cycle() {
            match recovery_action(&e) {
                RecoveryAction::SkipCycle => error!("Poll cycle skipped: {}", e),
                RecoveryAction::DropEvent | RecoveryAction::Reject => warn!("Poll cycle: {}", e),
                RecoveryAction::Fail => error!("Poll cycle failed: {}", e),
            }
        }
    }
}

/// A keyboard being polled
#[derive(Debug)]
pub struct AttachedDevice {
    scheduler: PollScheduler<KeyboardDevice>,
    attributes: DeviceAttributes,
}

impl AttachedDevice {
    /// Attribute handle
    pub fn attributes(&self) -> &DeviceAttributes {
        &self.attributes
    }

    /// Handle for requesting immediate cycles
    pub fn trigger(&self) -> PollTrigger {
        self.scheduler.trigger()
    }

    /// Stop polling and hand the device back
    ///
    /// Returns after the in-flight cycle, if any, has finished. Attribute
    /// handles report the device as detached from here on.
    pub async fn detach(self) -> Option<KeyboardDevice> {
        let device = self.scheduler.disarm().await;
        self.attributes.mark_detached();
        info!("Keyboard detached");
        device
    }
}
