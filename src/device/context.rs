//! Device Context
//!
//! Per-device state owned by the poll cycle: the drained FIFO batch, mouse
//! mode state and the last-activity timestamp.

use serde::Serialize;

use crate::device::clock::{MonotonicClock, SharedTimestamp};
use crate::input::dispatcher::{DispatchOutcome, KeyEventDispatcher};
use crate::input::fifo::EventQueue;
use crate::input::mouse::{Acceleration, MouseOverlayState};
use crate::input::sink::{emit_or_log, InputEvent, InputSink};

/// Counts from dispatching one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Entries processed
    pub entries: usize,
    /// Key events emitted
    pub keys: usize,
    /// Entries consumed by mouse mode
    pub mouse: usize,
    /// Scancodes with no mapping
    pub unmapped: usize,
    /// Relative motion events emitted by the end-of-cycle tick
    pub motion: usize,
}

/// State for one attached keyboard
#[derive(Debug)]
pub struct DeviceContext {
    queue: EventQueue,
    mouse: MouseOverlayState,
    last_keypress: SharedTimestamp,
    dispatcher: KeyEventDispatcher,
    acceleration: Acceleration,
}

impl DeviceContext {
    /// Create with an empty queue and mouse mode off
    pub fn new(dispatcher: KeyEventDispatcher, acceleration: Acceleration) -> Self {
        Self {
            queue: EventQueue::new(),
            mouse: MouseOverlayState::new(),
            last_keypress: SharedTimestamp::default(),
            dispatcher,
            acceleration,
        }
    }

    /// Pending batch
    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Pending batch, for the FIFO drain
    pub fn queue_mut(&mut self) -> &mut EventQueue {
        &mut self.queue
    }

    /// Mouse mode state
    pub fn mouse(&self) -> &MouseOverlayState {
        &self.mouse
    }

    /// Mouse mode state, mutable
    pub fn mouse_mut(&mut self) -> &mut MouseOverlayState {
        &mut self.mouse
    }

    /// Last keypress timestamp; clones share the value
    pub fn last_keypress(&self) -> &SharedTimestamp {
        &self.last_keypress
    }

    /// Dispatcher in use
    pub fn dispatcher(&self) -> &KeyEventDispatcher {
        &self.dispatcher
    }

    /// Acceleration curve in use
    pub fn acceleration(&self) -> &Acceleration {
        &self.acceleration
    }

    /// Run every queued entry through the dispatcher, in FIFO order
    pub fn dispatch_queued(&mut self, clock: &dyn MonotonicClock, sink: &mut dyn InputSink) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for entry in self.queue.iter() {
            summary.entries += 1;
            match self.dispatcher.dispatch(
                *entry,
                &mut self.mouse,
                &self.last_keypress,
                clock,
                sink,
            ) {
                DispatchOutcome::Key(..) => summary.keys += 1,
                DispatchOutcome::Unmapped(_) => summary.unmapped += 1,
                DispatchOutcome::MouseModeToggled(_)
                | DispatchOutcome::DirectionPressed(_)
                | DispatchOutcome::DirectionReleased(_)
                | DispatchOutcome::Button(..) => summary.mouse += 1,
                _ => {}
            }
        }

        summary
    }

    /// Emit pointer motion, clear the batch and close it with a sync
    pub fn finish_cycle(&mut self, now_ns: u64, sink: &mut dyn InputSink) -> usize {
        let motion = self.mouse.tick(&self.acceleration, now_ns, sink);
        self.queue.clear();
        emit_or_log(sink, InputEvent::Sync);
        motion
    }
}

impl Default for DeviceContext {
    fn default() -> Self {
        Self::new(KeyEventDispatcher::default(), Acceleration::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::clock::ManualClock;
    use crate::input::fifo::{KeyTransition, RawFifoEntry};
    use crate::input::mapper::scancodes::{SC_RIGHT, SC_RIGHTSHIFT};
    use crate::input::sink::{RecordingSink, RelAxis};

    #[test]
    fn test_batch_in_order_then_sync() {
        let mut ctx = DeviceContext::default();
        let clock = ManualClock::new(1);
        let mut sink = RecordingSink::new();

        ctx.queue_mut().push(RawFifoEntry::new(KeyTransition::Pressed, b'h')).unwrap();
        ctx.queue_mut().push(RawFifoEntry::new(KeyTransition::Pressed, b'i')).unwrap();

        let summary = ctx.dispatch_queued(&clock, &mut sink);
        ctx.finish_cycle(clock.now_ns(), &mut sink);

        assert_eq!(summary.entries, 2);
        assert_eq!(summary.keys, 2);
        assert!(ctx.queue().is_empty());
        assert_eq!(sink.events().last(), Some(&InputEvent::Sync));
        assert_eq!(sink.key_events().len(), 2);
    }

    #[test]
    fn test_motion_after_batch() {
        let mut ctx = DeviceContext::default();
        let clock = ManualClock::new(0);
        let mut sink = RecordingSink::new();

        ctx.queue_mut().push(RawFifoEntry::new(KeyTransition::Pressed, SC_RIGHTSHIFT)).unwrap();
        ctx.queue_mut().push(RawFifoEntry::new(KeyTransition::Pressed, SC_RIGHT)).unwrap();

        let summary = ctx.dispatch_queued(&clock, &mut sink);
        let motion = ctx.finish_cycle(100_000_000, &mut sink);

        assert_eq!(summary.mouse, 2);
        assert_eq!(motion, 1);
        assert_eq!(
            sink.events(),
            vec![
                InputEvent::Relative { axis: RelAxis::X, delta: 1 },
                InputEvent::Sync,
            ]
        );
    }
}
