//! Keyboard Input Pipeline
//!
//! Decoding and dispatch of the PicoCalc keyboard controller's key FIFO.
//!
//! # Features
//!
//! - **FIFO decoding**
//!   - Two-byte entries, transition in the low byte, scancode in the high byte
//!   - Zero transition terminates the batch
//!   - At most 31 entries per drain
//!
//! - **Key state machine**
//!   - Pressed / Held / Released acted upon, Idle and LongHeld dropped
//!   - Held keys count as activity but emit nothing
//!   - Raw scancodes forwarded for diagnostics
//!
//! - **Mouse emulation**
//!   - Right shift toggles the overlay
//!   - Arrow keys move the pointer, speeding up the longer they are held
//!   - `]` and `[` act as left and right buttons
//!
//! # Architecture
//!
//! ```text
//! Controller FIFO (register 0x09)
//!       ↓
//! ┌─────────────────────────┐
//! │  drain_fifo             │ ← bounded EventQueue
//! └─────────────────────────┘
//!       ↓
//! ┌─────────────────────────┐
//! │  KeyEventDispatcher     │ ← per-entry state machine
//! └─────────────────────────┘
//!       ↓            ↓
//! ┌──────────┐ ┌─────────────────┐
//! │ Scancode │ │ MouseOverlay    │
//! │  Table   │ │ + Acceleration  │
//! └──────────┘ └─────────────────┘
//!       ↓            ↓
//!     InputSink (uinput, log, recorder)
//! ```
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use picocalc_kbd::device::ManualClock;
//! use picocalc_kbd::device::SharedTimestamp;
//! use picocalc_kbd::input::{
//!     KeyEventDispatcher, KeyTransition, MouseOverlayState, RawFifoEntry, RecordingSink,
//! };
//!
//! let dispatcher = KeyEventDispatcher::default();
//! let mut mouse = MouseOverlayState::new();
//! let last_keypress = SharedTimestamp::new(0);
//! let clock = ManualClock::new(1_000);
//! let mut sink = RecordingSink::new();
//!
//! let entry = RawFifoEntry::new(KeyTransition::Pressed, b'a');
//! dispatcher.dispatch(entry, &mut mouse, &last_keypress, &clock, &mut sink);
//!
//! assert_eq!(sink.key_events(), vec![(30, true)]);
//! ```

pub mod dispatcher;
pub mod error;
pub mod fifo;
pub mod mapper;
pub mod mouse;
pub mod sink;

pub use dispatcher::{DispatchOutcome, KeyEventDispatcher};
pub use error::{classify_error, recovery_action, ErrorType, KbdError, RecoveryAction, Result};
pub use fifo::{drain_fifo, EventQueue, KeyTransition, RawFifoEntry, FIFO_CAPACITY};
pub use mapper::{KeyMapping, ScancodeTable, PICOCALC_TABLE};
pub use mouse::{
    Acceleration, Direction, DirectionSet, MouseBindings, MouseButton, MouseOverlayState,
    DEFAULT_FAST_MOVE_THRESHOLD,
};
pub use sink::{emit_or_log, InputEvent, InputSink, RecordingSink, RelAxis, TracingSink};
