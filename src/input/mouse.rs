//! Mouse Emulation Overlay
//!
//! While mouse mode is on, the arrow keys drive relative pointer motion and
//! the bracket keys act as pointer buttons. Motion speed ramps up with how
//! long the current direction has been held.

use std::time::Duration;

use tracing::debug;

use crate::input::mapper::keycodes::{BTN_LEFT, BTN_RIGHT};
use crate::input::mapper::scancodes::{
    SC_DOWN, SC_LEFT, SC_LEFTBRACE, SC_RIGHT, SC_RIGHTBRACE, SC_RIGHTSHIFT, SC_UP,
};
use crate::input::sink::{emit_or_log, InputEvent, InputSink, RelAxis};

/// Default hold time before the pointer speeds up
pub const DEFAULT_FAST_MOVE_THRESHOLD: Duration = Duration::from_millis(150);

/// Pointer button identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left mouse button
    Left,
    /// Right mouse button
    Right,
}

impl MouseButton {
    /// Convert to Linux button code
    pub fn to_linux_button(&self) -> u16 {
        match self {
            MouseButton::Left => BTN_LEFT,
            MouseButton::Right => BTN_RIGHT,
        }
    }
}

/// Pointer movement direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Negative X
    Left,
    /// Positive X
    Right,
    /// Negative Y
    Up,
    /// Positive Y
    Down,
}

impl Direction {
    /// Emission order for a cycle
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Down,
        Direction::Up,
    ];

    fn bit(self) -> u8 {
        match self {
            Direction::Left => 1 << 1,
            Direction::Right => 1 << 2,
            Direction::Up => 1 << 3,
            Direction::Down => 1 << 4,
        }
    }

    /// Axis and sign of motion for this direction
    pub fn axis(self) -> (RelAxis, i32) {
        match self {
            Direction::Left => (RelAxis::X, -1),
            Direction::Right => (RelAxis::X, 1),
            Direction::Up => (RelAxis::Y, -1),
            Direction::Down => (RelAxis::Y, 1),
        }
    }
}

/// Set of currently held directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirectionSet(u8);

impl DirectionSet {
    /// Empty set
    pub fn empty() -> Self {
        Self(0)
    }

    /// Whether `direction` is held
    pub fn contains(self, direction: Direction) -> bool {
        self.0 & direction.bit() != 0
    }

    /// Mark `direction` held; returns true if it was not held before
    pub fn insert(&mut self, direction: Direction) -> bool {
        let was_clear = !self.contains(direction);
        self.0 |= direction.bit();
        was_clear
    }

    /// Mark `direction` released
    pub fn remove(&mut self, direction: Direction) {
        self.0 &= !direction.bit();
    }

    /// Whether no direction is held
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Held directions in emission order
    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::ALL
            .into_iter()
            .filter(move |direction| self.contains(*direction))
    }
}

/// Reserved scancodes that mouse mode intercepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseBindings {
    /// Toggles mouse mode; always swallowed
    pub toggle: u8,
    /// Moves the pointer left
    pub left: u8,
    /// Moves the pointer right
    pub right: u8,
    /// Moves the pointer up
    pub up: u8,
    /// Moves the pointer down
    pub down: u8,
    /// Key acting as the left pointer button
    pub left_button: u8,
    /// Key acting as the right pointer button
    pub right_button: u8,
}

impl MouseBindings {
    /// Direction bound to `scancode`, if any
    pub fn direction(&self, scancode: u8) -> Option<Direction> {
        match scancode {
            s if s == self.left => Some(Direction::Left),
            s if s == self.right => Some(Direction::Right),
            s if s == self.up => Some(Direction::Up),
            s if s == self.down => Some(Direction::Down),
            _ => None,
        }
    }

    /// Pointer button bound to `scancode`, if any
    pub fn button(&self, scancode: u8) -> Option<MouseButton> {
        match scancode {
            s if s == self.left_button => Some(MouseButton::Left),
            s if s == self.right_button => Some(MouseButton::Right),
            _ => None,
        }
    }
}

impl Default for MouseBindings {
    fn default() -> Self {
        Self {
            toggle: SC_RIGHTSHIFT,
            left: SC_LEFT,
            right: SC_RIGHT,
            up: SC_UP,
            down: SC_DOWN,
            left_button: SC_RIGHTBRACE,
            right_button: SC_LEFTBRACE,
        }
    }
}

/// Hold-duration based pointer acceleration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acceleration {
    threshold_ns: u64,
}

impl Acceleration {
    /// Create with the given fast-move threshold
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold_ns: threshold.as_nanos().min(u64::MAX as u128) as u64,
        }
    }

    /// Fast-move threshold in nanoseconds
    pub fn threshold_ns(&self) -> u64 {
        self.threshold_ns
    }

    /// Step size for a direction held for `elapsed_ns`
    pub fn step(&self, elapsed_ns: u64) -> i32 {
        if elapsed_ns <= self.threshold_ns {
            1
        } else if elapsed_ns <= self.threshold_ns.saturating_mul(3) {
            2
        } else {
            4
        }
    }
}

impl Default for Acceleration {
    fn default() -> Self {
        Self::new(DEFAULT_FAST_MOVE_THRESHOLD)
    }
}

/// Mouse mode state, mutated only by the dispatch cycle
#[derive(Debug, Clone, Default)]
pub struct MouseOverlayState {
    enabled: bool,
    directions: DirectionSet,
    last_direction_change_ns: u64,
}

impl MouseOverlayState {
    /// Create with mouse mode off
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether mouse mode is on
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Force mouse mode on or off
    ///
    /// Turning it off forgets held directions: their releases will arrive
    /// as ordinary keys, so the set could never be cleared otherwise.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.directions = DirectionSet::empty();
        }
    }

    /// Flip mouse mode, returning the new state
    pub fn toggle(&mut self) -> bool {
        self.set_enabled(!self.enabled);
        debug!("Mouse mode {}", if self.enabled { "on" } else { "off" });
        self.enabled
    }

    /// Currently held directions
    pub fn directions(&self) -> DirectionSet {
        self.directions
    }

    /// Timestamp driving acceleration
    pub fn last_direction_change_ns(&self) -> u64 {
        self.last_direction_change_ns
    }

    /// Record a direction key going down
    pub fn press(&mut self, direction: Direction, now_ns: u64) {
        if self.directions.insert(direction) {
            self.last_direction_change_ns = now_ns;
        }
    }

    /// Record a direction key going up
    ///
    /// Releasing Left also re-stamps the acceleration timestamp; the other
    /// directions leave it alone.
    pub fn release(&mut self, direction: Direction, now_ns: u64) {
        if direction == Direction::Left {
            self.last_direction_change_ns = now_ns;
        }
        self.directions.remove(direction);
    }

    /// Emit this cycle's pointer motion
    ///
    /// One step size applies to every held direction; opposing directions
    /// each emit their own delta. Returns the number of deltas emitted.
    pub fn tick(&self, acceleration: &Acceleration, now_ns: u64, sink: &mut dyn InputSink) -> usize {
        if !self.enabled || self.directions.is_empty() {
            return 0;
        }

        let elapsed = now_ns.saturating_sub(self.last_direction_change_ns);
        let step = acceleration.step(elapsed);

        let mut emitted = 0;
        for direction in self.directions.iter() {
            let (axis, sign) = direction.axis();
            emit_or_log(
                sink,
                InputEvent::Relative {
                    axis,
                    delta: sign * step,
                },
            );
            emitted += 1;
        }
        emitted
    }
}
