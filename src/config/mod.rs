//! Configuration management
//!
//! Handles loading, validation, and merging of configuration from:
//! - TOML files
//! - Environment variables (through the CLI)
//! - CLI arguments

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod types;

pub use types::{BusConfig, ControlConfig, InputConfig, LoggingConfig, MouseConfig, PollConfig};

use crate::device::uinput::{DeviceIdentity, BUS_I2C};
use crate::input::mouse::Acceleration;

/// Lowest and highest non-reserved 7-bit I²C addresses
const I2C_ADDRESS_RANGE: std::ops::RangeInclusive<u16> = 0x03..=0x77;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Register bus configuration
    #[serde(default)]
    pub bus: BusConfig,
    /// Poll scheduler configuration
    #[serde(default)]
    pub poll: PollConfig,
    /// Mouse emulation configuration
    #[serde(default)]
    pub mouse: MouseConfig,
    /// Output device configuration
    #[serde(default)]
    pub input: InputConfig,
    /// Control socket configuration
    #[serde(default)]
    pub control: ControlConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.poll.period_ns == 0 {
            anyhow::bail!("Poll period must be greater than zero");
        }

        if !I2C_ADDRESS_RANGE.contains(&self.bus.address) {
            anyhow::bail!(
                "Invalid I2C address 0x{:02X} (expected 0x03-0x77)",
                self.bus.address
            );
        }

        if self.mouse.fast_move_threshold_ms == 0 {
            anyhow::bail!("Mouse fast-move threshold must be greater than zero");
        }

        if self.input.name.is_empty() {
            anyhow::bail!("Input device name must not be empty");
        }

        if self.control.enabled && self.control.socket_path.as_os_str().is_empty() {
            anyhow::bail!("Control socket path must not be empty");
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Invalid log level: {}", self.logging.level),
        }

        Ok(())
    }

    /// Override config with CLI arguments
    pub fn with_overrides(
        mut self,
        device: Option<PathBuf>,
        address: Option<u16>,
        socket: Option<PathBuf>,
    ) -> Self {
        if let Some(device) = device {
            self.bus.device = device;
        }
        if let Some(address) = address {
            self.bus.address = address;
        }
        if let Some(socket) = socket {
            self.control.socket_path = socket;
        }
        self
    }

    /// Poll period
    pub fn poll_period(&self) -> Duration {
        Duration::from_nanos(self.poll.period_ns)
    }

    /// Pointer acceleration curve
    pub fn acceleration(&self) -> Acceleration {
        Acceleration::new(Duration::from_millis(self.mouse.fast_move_threshold_ms))
    }

    /// Identity for the uinput device
    pub fn device_identity(&self) -> DeviceIdentity {
        DeviceIdentity {
            name: self.input.name.clone(),
            bustype: BUS_I2C,
            vendor: self.input.vendor,
            product: self.input.product,
            version: self.input.version,
        }
    }
}
