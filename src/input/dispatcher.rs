//! Key Event Dispatcher
//!
//! Per-entry state machine turning decoded FIFO entries into input events.
//!
//! # Pipeline
//!
//! ```text
//! RawFifoEntry
//!       ↓
//! transition filter ── Idle / LongHeld ──> dropped
//!       ↓
//! mode toggle key ──────────────────────> flips mouse mode, swallowed
//!       ↓
//! mouse mode on? ── arrows ─────────────> direction bits
//!       │         └ brackets ───────────> pointer buttons
//!       ↓
//! raw scan ─> scancode table ─> Ignored / Unknown / Key
//!                                                 ↓
//!                                   stamp last keypress, emit unless Held
//! ```

use std::sync::Arc;

use tracing::{debug, warn};

use crate::device::clock::{MonotonicClock, SharedTimestamp};
use crate::input::error::KbdError;
use crate::input::fifo::{KeyTransition, RawFifoEntry};
use crate::input::mapper::{KeyMapping, ScancodeTable};
use crate::input::mouse::{Direction, MouseBindings, MouseButton, MouseOverlayState};
use crate::input::sink::{emit_or_log, InputEvent, InputSink};

/// What the dispatcher did with one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Transition not acted upon (Idle, LongHeld)
    Skipped,
    /// Mouse mode toggled to the contained state
    MouseModeToggled(bool),
    /// Consumed by mouse handling without effect
    Swallowed,
    /// Direction key went down in mouse mode
    DirectionPressed(Direction),
    /// Direction key went up in mouse mode
    DirectionReleased(Direction),
    /// Pointer button event emitted
    Button(MouseButton, bool),
    /// Scancode maps to the ignored sentinel
    Ignored,
    /// Scancode has no mapping
    Unmapped(u8),
    /// Mapped key held; activity recorded, nothing emitted
    Held(u16),
    /// Key event emitted
    Key(u16, bool),
}

/// Key event state machine
#[derive(Debug, Clone)]
pub struct KeyEventDispatcher {
    table: Arc<ScancodeTable>,
    bindings: MouseBindings,
}

impl KeyEventDispatcher {
    /// Create a dispatcher over `table` with the default mouse bindings
    pub fn new(table: Arc<ScancodeTable>) -> Self {
        Self {
            table,
            bindings: MouseBindings::default(),
        }
    }

    /// Replace the mouse bindings
    pub fn with_bindings(mut self, bindings: MouseBindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// Scancode table in use
    pub fn table(&self) -> &ScancodeTable {
        &self.table
    }

    /// Mouse bindings in use
    pub fn bindings(&self) -> &MouseBindings {
        &self.bindings
    }

    /// Process one entry
    pub fn dispatch(
        &self,
        entry: RawFifoEntry,
        mouse: &mut MouseOverlayState,
        last_keypress: &SharedTimestamp,
        clock: &dyn MonotonicClock,
        sink: &mut dyn InputSink,
    ) -> DispatchOutcome {
        if !entry.transition.is_actionable() {
            return DispatchOutcome::Skipped;
        }

        if entry.scancode == self.bindings.toggle {
            if entry.transition == KeyTransition::Pressed {
                return DispatchOutcome::MouseModeToggled(mouse.toggle());
            }
            return DispatchOutcome::Swallowed;
        }

        if mouse.is_enabled() {
            if let Some(outcome) = self.intercept_mouse(entry, mouse, clock, sink) {
                return outcome;
            }
        }

        self.dispatch_key(entry, last_keypress, clock, sink)
    }

    fn intercept_mouse(
        &self,
        entry: RawFifoEntry,
        mouse: &mut MouseOverlayState,
        clock: &dyn MonotonicClock,
        sink: &mut dyn InputSink,
    ) -> Option<DispatchOutcome> {
        if let Some(direction) = self.bindings.direction(entry.scancode) {
            let outcome = match entry.transition {
                KeyTransition::Pressed => {
                    mouse.press(direction, clock.now_ns());
                    DispatchOutcome::DirectionPressed(direction)
                }
                KeyTransition::Released => {
                    mouse.release(direction, clock.now_ns());
                    DispatchOutcome::DirectionReleased(direction)
                }
                _ => DispatchOutcome::Swallowed,
            };
            return Some(outcome);
        }

        if let Some(button) = self.bindings.button(entry.scancode) {
            let down = entry.transition == KeyTransition::Pressed;
            emit_or_log(sink, InputEvent::Button { button, down });
            return Some(DispatchOutcome::Button(button, down));
        }

        None
    }

    fn dispatch_key(
        &self,
        entry: RawFifoEntry,
        last_keypress: &SharedTimestamp,
        clock: &dyn MonotonicClock,
        sink: &mut dyn InputSink,
    ) -> DispatchOutcome {
        emit_or_log(sink, InputEvent::RawScan(entry.scancode));

        let keycode = match self.table.lookup(entry.scancode) {
            KeyMapping::Ignored => return DispatchOutcome::Ignored,
            KeyMapping::Unknown => {
                warn!("{}", KbdError::UnmappedScancode(entry.scancode));
                return DispatchOutcome::Unmapped(entry.scancode);
            }
            KeyMapping::Key(keycode) => keycode,
        };

        debug!(
            "{:?}, scancode 0x{:02X} mapped to keycode {}",
            entry.transition, entry.scancode, keycode
        );

        last_keypress.store(clock.now_ns());

        if entry.transition == KeyTransition::Held {
            return DispatchOutcome::Held(keycode);
        }

        let down = entry.transition == KeyTransition::Pressed;
        emit_or_log(sink, InputEvent::Key { keycode, down });
        DispatchOutcome::Key(keycode, down)
    }
}

impl Default for KeyEventDispatcher {
    fn default() -> Self {
        Self::new(Arc::new(ScancodeTable::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::clock::ManualClock;
    use crate::input::mapper::keycodes::{KEY_A, KEY_ENTER};
    use crate::input::mapper::scancodes::*;
    use crate::input::sink::RecordingSink;

    struct Harness {
        dispatcher: KeyEventDispatcher,
        mouse: MouseOverlayState,
        last_keypress: SharedTimestamp,
        clock: ManualClock,
        sink: RecordingSink,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                dispatcher: KeyEventDispatcher::default(),
                mouse: MouseOverlayState::new(),
                last_keypress: SharedTimestamp::new(0),
                clock: ManualClock::new(1_000),
                sink: RecordingSink::new(),
            }
        }

        fn feed(&mut self, transition: KeyTransition, scancode: u8) -> DispatchOutcome {
            self.dispatcher.dispatch(
                RawFifoEntry::new(transition, scancode),
                &mut self.mouse,
                &self.last_keypress,
                &self.clock,
                &mut self.sink,
            )
        }
    }

    #[test]
    fn test_press_and_release_emit_key_events() {
        let mut h = Harness::new();

        assert_eq!(
            h.feed(KeyTransition::Pressed, b'a'),
            DispatchOutcome::Key(KEY_A, true)
        );
        assert_eq!(
            h.feed(KeyTransition::Released, b'a'),
            DispatchOutcome::Key(KEY_A, false)
        );

        assert_eq!(
            h.sink.events(),
            vec![
                InputEvent::RawScan(b'a'),
                InputEvent::Key { keycode: KEY_A, down: true },
                InputEvent::RawScan(b'a'),
                InputEvent::Key { keycode: KEY_A, down: false },
            ]
        );
        assert_eq!(h.last_keypress.load(), 1_000);
    }

    #[test]
    fn test_idle_and_long_held_are_skipped() {
        let mut h = Harness::new();
        assert_eq!(h.feed(KeyTransition::Idle, b'a'), DispatchOutcome::Skipped);
        assert_eq!(h.feed(KeyTransition::LongHeld, b'a'), DispatchOutcome::Skipped);
        assert!(h.sink.events().is_empty());
        assert_eq!(h.last_keypress.load(), 0);
    }

    #[test]
    fn test_held_updates_activity_without_key_event() {
        let mut h = Harness::new();
        h.clock.set(42_000);

        assert_eq!(
            h.feed(KeyTransition::Held, SC_ENTER),
            DispatchOutcome::Held(KEY_ENTER)
        );
        assert_eq!(h.last_keypress.load(), 42_000);
        assert_eq!(h.sink.events(), vec![InputEvent::RawScan(SC_ENTER)]);
    }

    #[test]
    fn test_toggle_key_flips_mode_and_is_swallowed() {
        let mut h = Harness::new();

        assert_eq!(
            h.feed(KeyTransition::Pressed, SC_RIGHTSHIFT),
            DispatchOutcome::MouseModeToggled(true)
        );
        assert_eq!(
            h.feed(KeyTransition::Held, SC_RIGHTSHIFT),
            DispatchOutcome::Swallowed
        );
        assert_eq!(
            h.feed(KeyTransition::Released, SC_RIGHTSHIFT),
            DispatchOutcome::Swallowed
        );
        assert!(h.mouse.is_enabled());
        assert!(h.sink.events().is_empty());

        h.feed(KeyTransition::Pressed, SC_RIGHTSHIFT);
        assert!(!h.mouse.is_enabled());
        assert!(h.sink.events().is_empty());
    }

    #[test]
    fn test_arrows_are_keys_outside_mouse_mode() {
        let mut h = Harness::new();
        assert!(matches!(
            h.feed(KeyTransition::Pressed, SC_RIGHT),
            DispatchOutcome::Key(_, true)
        ));
        assert!(h.mouse.directions().is_empty());
    }

    #[test]
    fn test_directions_in_mouse_mode() {
        let mut h = Harness::new();
        h.mouse.set_enabled(true);
        h.clock.set(5_000);

        assert_eq!(
            h.feed(KeyTransition::Pressed, SC_UP),
            DispatchOutcome::DirectionPressed(Direction::Up)
        );
        assert_eq!(h.mouse.last_direction_change_ns(), 5_000);
        assert_eq!(h.feed(KeyTransition::Held, SC_UP), DispatchOutcome::Swallowed);
        assert_eq!(
            h.feed(KeyTransition::Released, SC_UP),
            DispatchOutcome::DirectionReleased(Direction::Up)
        );

        assert!(h.mouse.directions().is_empty());
        assert!(h.sink.events().is_empty());
        assert_eq!(h.last_keypress.load(), 0);
    }

    #[test]
    fn test_mode_off_forgets_held_directions() {
        let mut h = Harness::new();

        h.feed(KeyTransition::Pressed, SC_RIGHTSHIFT);
        h.feed(KeyTransition::Pressed, SC_RIGHT);
        assert!(h.mouse.directions().contains(Direction::Right));

        assert_eq!(
            h.feed(KeyTransition::Pressed, SC_RIGHTSHIFT),
            DispatchOutcome::MouseModeToggled(false)
        );
        assert!(h.mouse.directions().is_empty());

        // the release now takes the key path
        assert!(matches!(
            h.feed(KeyTransition::Released, SC_RIGHT),
            DispatchOutcome::Key(_, false)
        ));

        h.feed(KeyTransition::Pressed, SC_RIGHTSHIFT);
        h.sink.take();
        let moved = h.mouse.tick(
            &crate::input::mouse::Acceleration::default(),
            h.clock.now_ns(),
            &mut h.sink,
        );
        assert_eq!(moved, 0);
        assert!(h.sink.events().is_empty());
    }

    #[test]
    fn test_left_release_restamps_other_releases_do_not() {
        let mut h = Harness::new();
        h.mouse.set_enabled(true);

        h.clock.set(10);
        h.feed(KeyTransition::Pressed, SC_DOWN);
        h.clock.set(20);
        h.feed(KeyTransition::Released, SC_DOWN);
        assert_eq!(h.mouse.last_direction_change_ns(), 10);

        h.clock.set(30);
        h.feed(KeyTransition::Pressed, SC_LEFT);
        h.clock.set(40);
        h.feed(KeyTransition::Released, SC_LEFT);
        assert_eq!(h.mouse.last_direction_change_ns(), 40);
    }

    #[test]
    fn test_brackets_become_buttons_on_every_transition() {
        let mut h = Harness::new();
        h.mouse.set_enabled(true);

        h.feed(KeyTransition::Pressed, SC_RIGHTBRACE);
        h.feed(KeyTransition::Held, SC_RIGHTBRACE);
        h.feed(KeyTransition::Released, SC_RIGHTBRACE);
        h.feed(KeyTransition::Pressed, SC_LEFTBRACE);

        assert_eq!(
            h.sink.events(),
            vec![
                InputEvent::Button { button: MouseButton::Left, down: true },
                InputEvent::Button { button: MouseButton::Left, down: false },
                InputEvent::Button { button: MouseButton::Left, down: false },
                InputEvent::Button { button: MouseButton::Right, down: true },
            ]
        );
    }

    #[test]
    fn test_other_keys_fall_through_in_mouse_mode() {
        let mut h = Harness::new();
        h.mouse.set_enabled(true);
        assert_eq!(
            h.feed(KeyTransition::Pressed, b'a'),
            DispatchOutcome::Key(KEY_A, true)
        );
    }

    #[test]
    fn test_ignored_and_unmapped() {
        let mut h = Harness::new();

        assert_eq!(h.feed(KeyTransition::Pressed, SC_SYM), DispatchOutcome::Ignored);
        assert_eq!(
            h.feed(KeyTransition::Pressed, 0xEE),
            DispatchOutcome::Unmapped(0xEE)
        );

        // raw scans still go out for diagnostics
        assert_eq!(
            h.sink.events(),
            vec![InputEvent::RawScan(SC_SYM), InputEvent::RawScan(0xEE)]
        );
        assert_eq!(h.last_keypress.load(), 0);
    }
}
