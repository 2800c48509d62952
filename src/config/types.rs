//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Register bus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// I²C character device (e.g., "/dev/i2c-1")
    pub device: PathBuf,

    /// Controller slave address
    pub address: u16,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/i2c-1"),
            address: 0x1F,
        }
    }
}

/// Poll scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Poll period in nanoseconds (default 1/128 s)
    pub period_ns: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            period_ns: 7_812_500,
        }
    }
}

/// Mouse emulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MouseConfig {
    /// Hold time in milliseconds before the pointer speeds up
    pub fast_move_threshold_ms: u64,

    /// Start with mouse mode on
    pub start_enabled: bool,
}

impl Default for MouseConfig {
    fn default() -> Self {
        Self {
            fast_move_threshold_ms: 150,
            start_enabled: false,
        }
    }
}

/// Output input-device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Device name reported to the host
    pub name: String,

    /// Vendor id
    pub vendor: u16,

    /// Product id
    pub product: u16,

    /// Version
    pub version: u16,

    /// Log events instead of creating a uinput device
    pub dry_run: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            name: "picocalc_kbd".to_string(),
            vendor: 0x0001,
            product: 0x0001,
            version: 0x0001,
            dry_run: false,
        }
    }
}

/// Control socket configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Serve the control socket
    pub enabled: bool,

    /// Socket path
    pub socket_path: PathBuf,

    /// Group owning the socket (0 leaves it as created)
    pub gid: u32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            socket_path: PathBuf::from("/run/picocalc-kbd.sock"),
            gid: 0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level ("trace", "debug", "info", "warn", "error")
    pub level: String,

    /// Directory for log files (None = stdout only)
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
        }
    }
}
