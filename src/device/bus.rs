//! Bus Register Accessor
//!
//! The keyboard controller exposes a small register file behind a fixed
//! slave address. Everything the driver needs goes through three primitives:
//! byte read, word read and byte write.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::input::error::Result;

/// Key FIFO; one word read returns one entry
pub const REG_FIFO: u8 = 0x09;

/// Battery state; high byte of the word is the charge percentage
pub const REG_BATTERY: u8 = 0x0B;

/// Screen backlight level
pub const REG_SCREEN_BACKLIGHT: u8 = 0x05;

/// Keyboard backlight level
pub const REG_KEYBOARD_BACKLIGHT: u8 = 0x0A;

/// Set on the register address for write transactions
pub const WRITE_MASK: u8 = 1 << 7;

/// Default controller slave address
pub const DEFAULT_ADDRESS: u16 = 0x1F;

/// Register-level access to the keyboard controller
///
/// Implementations apply [`WRITE_MASK`] themselves; callers always pass the
/// plain register number.
#[cfg_attr(test, mockall::automock)]
pub trait RegisterBus: Send {
    /// Read one byte from `reg`
    fn read_u8(&mut self, reg: u8) -> Result<u8>;

    /// Read one word from `reg`, returned as `[low, high]`
    fn read_u16(&mut self, reg: u8) -> Result<[u8; 2]>;

    /// Write one byte to `reg`
    fn write_u8(&mut self, reg: u8, value: u8) -> Result<()>;
}

impl<B: RegisterBus + ?Sized> RegisterBus for Box<B> {
    fn read_u8(&mut self, reg: u8) -> Result<u8> {
        (**self).read_u8(reg)
    }

    fn read_u16(&mut self, reg: u8) -> Result<[u8; 2]> {
        (**self).read_u16(reg)
    }

    fn write_u8(&mut self, reg: u8, value: u8) -> Result<()> {
        (**self).write_u8(reg, value)
    }
}

/// Bus shared between the poll cycle and attribute accessors
///
/// The mutex keeps register transactions from interleaving.
pub type SharedBus = Arc<Mutex<dyn RegisterBus>>;

/// Wrap a bus for sharing
pub fn shared<B: RegisterBus + 'static>(bus: B) -> SharedBus {
    Arc::new(Mutex::new(bus))
}

/// In-memory controller model for dry runs and tests
///
/// FIFO reads pop scripted words and return the end-of-batch marker once
/// the script runs out. Writes land in the register file.
#[derive(Debug, Clone)]
pub struct SimulatedBus {
    registers: [u8; 256],
    fifo: VecDeque<[u8; 2]>,
    writes: Vec<(u8, u8)>,
}

impl SimulatedBus {
    /// Create with all registers zero and an empty FIFO
    pub fn new() -> Self {
        Self {
            registers: [0; 256],
            fifo: VecDeque::new(),
            writes: Vec::new(),
        }
    }

    /// Queue FIFO words, `[transition, scancode]` each
    pub fn push_fifo(&mut self, words: impl IntoIterator<Item = [u8; 2]>) {
        self.fifo.extend(words);
    }

    /// Set a register value
    pub fn set_register(&mut self, reg: u8, value: u8) {
        self.registers[reg as usize] = value;
    }

    /// Current register value
    pub fn register(&self, reg: u8) -> u8 {
        self.registers[reg as usize]
    }

    /// Raw `(address, value)` pairs written so far, mask included
    pub fn writes(&self) -> &[(u8, u8)] {
        &self.writes
    }
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBus for SimulatedBus {
    fn read_u8(&mut self, reg: u8) -> Result<u8> {
        Ok(self.registers[reg as usize])
    }

    fn read_u16(&mut self, reg: u8) -> Result<[u8; 2]> {
        if reg == REG_FIFO {
            return Ok(self.fifo.pop_front().unwrap_or([0, 0]));
        }
        Ok([0, self.registers[reg as usize]])
    }

    fn write_u8(&mut self, reg: u8, value: u8) -> Result<()> {
        self.writes.push((reg | WRITE_MASK, value));
        self.registers[reg as usize] = value;
        Ok(())
    }
}
