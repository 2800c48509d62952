//! # picocalc-kbd
//!
//! User-space driver for the PicoCalc keyboard controller.
//!
//! The controller sits on an I²C bus and queues key transitions in a small
//! FIFO. This crate polls that FIFO, runs each entry through a key state
//! machine with a mouse-emulation overlay, and re-emits the result as a
//! standard Linux input device.
//!
//! # Architecture
//!
//! ```text
//! picocalc-kbd
//!   ├─> Poll Scheduler (1/128 s tick, coalescing)
//!   ├─> Keyboard Device (drain + dispatch cycle)
//!   │     ├─> Register Bus (/dev/i2c-N, SMBus)
//!   │     ├─> Key Event Dispatcher (scancode table, mouse overlay)
//!   │     └─> Input Sink (/dev/uinput)
//!   └─> Control Server (battery, idle time, backlights over a Unix socket)
//! ```
//!
//! # Data Flow
//!
//! **Input Path:** Controller FIFO → Decoder → Dispatcher → uinput → Host
//!
//! **Attribute Path:** Control client → Control Server → Register Bus

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Daemon configuration
pub mod config;

/// Device binding, bus access, scheduling and attributes
pub mod device;

/// FIFO decoding, scancode translation and mouse emulation
pub mod input;

/// Daemon orchestration and control socket
pub mod server;

/// Utility functions
pub mod utils;

pub use device::{AttachedDevice, DeviceAttributes, KeyboardDevice};
pub use input::{KbdError, Result};
