//! Input Event Delivery
//!
//! The dispatch cycle hands its output to an [`InputSink`]. The sink decides
//! what delivery means: a uinput device, a log, or a test buffer.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{error, info, trace};

use crate::input::error::Result;
use crate::input::mouse::MouseButton;

/// Relative pointer axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelAxis {
    /// Horizontal, positive to the right
    X,
    /// Vertical, positive downwards
    Y,
}

impl RelAxis {
    /// Linux `REL_*` code
    pub fn to_linux_code(self) -> u16 {
        match self {
            RelAxis::X => 0x00,
            RelAxis::Y => 0x01,
        }
    }
}

/// Event produced by the dispatch cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputEvent {
    /// Keyboard key transition
    Key {
        /// Linux evdev keycode
        keycode: u16,
        /// Key pressed (true) or released (false)
        down: bool,
    },

    /// Relative pointer motion
    Relative {
        /// Axis of motion
        axis: RelAxis,
        /// Signed delta
        delta: i32,
    },

    /// Pointer button transition
    Button {
        /// Button
        button: MouseButton,
        /// Button pressed (true) or released (false)
        down: bool,
    },

    /// Raw controller scancode, diagnostic channel
    RawScan(u8),

    /// End of one cycle's batch
    Sync,
}

/// Consumer of dispatched input events
pub trait InputSink: Send {
    /// Deliver one event
    fn emit(&mut self, event: InputEvent) -> Result<()>;
}

impl<S: InputSink + ?Sized> InputSink for Box<S> {
    fn emit(&mut self, event: InputEvent) -> Result<()> {
        (**self).emit(event)
    }
}

impl<S: InputSink + ?Sized> InputSink for &mut S {
    fn emit(&mut self, event: InputEvent) -> Result<()> {
        (**self).emit(event)
    }
}

/// Deliver `event`, logging instead of propagating a delivery failure
///
/// A sink hiccup must not abort the rest of the batch.
pub fn emit_or_log(sink: &mut dyn InputSink, event: InputEvent) {
    if let Err(e) = sink.emit(event) {
        error!("Failed to deliver {:?}: {}", event, e);
    }
}

/// Sink that keeps every event, shareable between clones
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<InputEvent>>>,
}

impl RecordingSink {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events
    pub fn events(&self) -> Vec<InputEvent> {
        self.events.lock().clone()
    }

    /// Take and clear recorded events
    pub fn take(&self) -> Vec<InputEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Recorded key events only
    pub fn key_events(&self) -> Vec<(u16, bool)> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                InputEvent::Key { keycode, down } => Some((*keycode, *down)),
                _ => None,
            })
            .collect()
    }
}

impl InputSink for RecordingSink {
    fn emit(&mut self, event: InputEvent) -> Result<()> {
        self.events.lock().push(event);
        Ok(())
    }
}

/// Sink that only logs, for dry runs without uinput
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl InputSink for TracingSink {
    fn emit(&mut self, event: InputEvent) -> Result<()> {
        match event {
            InputEvent::Sync | InputEvent::RawScan(_) => trace!("{:?}", event),
            _ => info!("Input event: {:?}", event),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_shared_between_clones() {
        let recorder = RecordingSink::new();
        let mut writer = recorder.clone();

        writer.emit(InputEvent::RawScan(0x61)).unwrap();
        writer
            .emit(InputEvent::Key { keycode: 30, down: true })
            .unwrap();

        assert_eq!(recorder.events().len(), 2);
        assert_eq!(recorder.key_events(), vec![(30, true)]);
        assert_eq!(recorder.take().len(), 2);
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_rel_axis_codes() {
        assert_eq!(RelAxis::X.to_linux_code(), 0);
        assert_eq!(RelAxis::Y.to_linux_code(), 1);
    }
}
