//! Device Attributes
//!
//! Small read/write surface over an attached keyboard: battery level, idle
//! time and the two backlight levels. Handles are cheap to clone and safe to
//! use from any task while the poll cycle runs.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::device::bus::{SharedBus, REG_BATTERY, REG_KEYBOARD_BACKLIGHT, REG_SCREEN_BACKLIGHT};
use crate::device::clock::{MonotonicClock, SharedTimestamp};
use crate::device::stats::{DeviceStats, StatsSnapshot};
use crate::input::error::{KbdError, Result};

/// Named attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Battery charge, 0-255
    BatteryPercent,
    /// Milliseconds since the last mapped keypress
    LastKeypress,
    /// Keyboard backlight level
    KeyboardBacklight,
    /// Screen backlight level
    ScreenBacklight,
}

impl Attribute {
    /// Every attribute, in listing order
    pub const ALL: [Attribute; 4] = [
        Attribute::BatteryPercent,
        Attribute::ScreenBacklight,
        Attribute::LastKeypress,
        Attribute::KeyboardBacklight,
    ];

    /// Attribute name
    pub fn name(self) -> &'static str {
        match self {
            Attribute::BatteryPercent => "battery_percent",
            Attribute::LastKeypress => "last_keypress",
            Attribute::KeyboardBacklight => "keyboard_backlight",
            Attribute::ScreenBacklight => "screen_backlight",
        }
    }

    /// Permission bits
    pub fn mode(self) -> u32 {
        match self {
            Attribute::BatteryPercent | Attribute::LastKeypress => 0o444,
            Attribute::KeyboardBacklight | Attribute::ScreenBacklight => 0o220,
        }
    }

    /// Whether the attribute can be read
    pub fn is_readable(self) -> bool {
        self.mode() & 0o444 != 0
    }

    /// Whether the attribute can be written
    pub fn is_writable(self) -> bool {
        self.mode() & 0o222 != 0
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = KbdError;

    fn from_str(s: &str) -> Result<Self> {
        Attribute::ALL
            .into_iter()
            .find(|attr| attr.name() == s)
            .ok_or_else(|| KbdError::UnknownAttribute(s.to_string()))
    }
}

/// Parse a decimal level in 0..=255
///
/// A single trailing newline is accepted; anything else that is not a plain
/// decimal integer is rejected.
pub fn parse_u8(input: &str) -> Result<u8> {
    let text = input.strip_suffix('\n').unwrap_or(input);
    text.parse::<i32>()
        .ok()
        .and_then(|value| u8::try_from(value).ok())
        .ok_or_else(|| KbdError::InvalidParameter(format!("expected 0-255, got {:?}", input)))
}

/// Cloneable attribute handle for one device
#[derive(Clone)]
pub struct DeviceAttributes {
    bus: SharedBus,
    last_keypress: SharedTimestamp,
    clock: Arc<dyn MonotonicClock>,
    attached: Arc<AtomicBool>,
    stats: Arc<DeviceStats>,
}

impl fmt::Debug for DeviceAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceAttributes")
            .field("attached", &self.is_attached())
            .field("last_keypress", &self.last_keypress.load())
            .finish_non_exhaustive()
    }
}

impl DeviceAttributes {
    pub(crate) fn new(
        bus: SharedBus,
        last_keypress: SharedTimestamp,
        clock: Arc<dyn MonotonicClock>,
        attached: Arc<AtomicBool>,
        stats: Arc<DeviceStats>,
    ) -> Self {
        Self {
            bus,
            last_keypress,
            clock,
            attached,
            stats,
        }
    }

    /// Whether the device is still attached
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    pub(crate) fn mark_detached(&self) {
        self.attached.store(false, Ordering::Release);
    }

    fn ensure_attached(&self) -> Result<()> {
        if self.is_attached() {
            Ok(())
        } else {
            Err(KbdError::NotAttached)
        }
    }

    /// Battery charge as reported by the controller
    pub fn battery_percent(&self) -> Result<u8> {
        self.ensure_attached()?;
        let [_, percent] = self.bus.lock().read_u16(REG_BATTERY)?;
        debug!("Battery at {}%", percent);
        Ok(percent)
    }

    /// Milliseconds since the last mapped keypress
    ///
    /// `-1` when detached or when the stored timestamp is not in the past.
    pub fn last_keypress_ms(&self) -> i64 {
        if !self.is_attached() {
            return -1;
        }
        self.last_keypress
            .elapsed_ms(self.clock.now_ns())
            .and_then(|ms| i64::try_from(ms).ok())
            .unwrap_or(-1)
    }

    /// Parse and write the keyboard backlight level
    pub fn set_keyboard_backlight(&self, input: &str) -> Result<u8> {
        self.write_level(REG_KEYBOARD_BACKLIGHT, Attribute::KeyboardBacklight, input)
    }

    /// Parse and write the screen backlight level
    pub fn set_screen_backlight(&self, input: &str) -> Result<u8> {
        self.write_level(REG_SCREEN_BACKLIGHT, Attribute::ScreenBacklight, input)
    }

    fn write_level(&self, reg: u8, attr: Attribute, input: &str) -> Result<u8> {
        let level = parse_u8(input)?;
        self.ensure_attached()?;
        self.bus.lock().write_u8(reg, level)?;
        info!("Set {} to {}", attr, level);
        Ok(level)
    }

    /// Read an attribute as text
    pub fn read(&self, attr: Attribute) -> Result<String> {
        match attr {
            Attribute::BatteryPercent => self.battery_percent().map(|p| p.to_string()),
            Attribute::LastKeypress => Ok(self.last_keypress_ms().to_string()),
            Attribute::KeyboardBacklight | Attribute::ScreenBacklight => Err(KbdError::AccessDenied {
                name: attr.name().to_string(),
                access: "readable",
            }),
        }
    }

    /// Write an attribute from text
    pub fn write(&self, attr: Attribute, input: &str) -> Result<()> {
        match attr {
            Attribute::KeyboardBacklight => self.set_keyboard_backlight(input).map(|_| ()),
            Attribute::ScreenBacklight => self.set_screen_backlight(input).map(|_| ()),
            Attribute::BatteryPercent | Attribute::LastKeypress => Err(KbdError::AccessDenied {
                name: attr.name().to_string(),
                access: "writable",
            }),
        }
    }

    /// Counter snapshot
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}
