//! Utility Functions and Diagnostics
//!
//! System diagnostics and user-friendly error formatting.
//!
//! ## Diagnostics
//!
//! The [`diagnostics`] module logs the runtime environment at startup: OS,
//! kernel, available I²C buses and whether uinput is reachable.
//!
//! ## Error Formatting
//!
//! The [`errors`] module turns startup failures into messages with
//! troubleshooting hints:
//!
//! ```rust,no_run
//! use picocalc_kbd::utils::format_user_error;
//!
//! let error = anyhow::anyhow!("uinput error: UI_DEV_CREATE failed");
//! eprintln!("{}", format_user_error(&error));
//! ```

pub mod diagnostics;
pub mod errors;

pub use diagnostics::{detect_i2c_buses, log_startup_diagnostics, SystemInfo};
pub use errors::format_user_error;
