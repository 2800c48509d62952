//! Key FIFO Decoding
//!
//! The keyboard controller queues key transitions in a FIFO that is drained
//! one two-byte entry per word read of [`REG_FIFO`]. The low byte carries the
//! transition, the high byte the scancode. A zero transition byte marks the
//! end of the batch.

use std::fmt;
use std::ops::Index;

use tracing::{debug, error};

use crate::device::bus::{RegisterBus, REG_FIFO};
use crate::input::error::{KbdError, Result};

/// Maximum number of entries a single drain can report
pub const FIFO_CAPACITY: usize = 31;

/// Key lifecycle phase as reported by the controller firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyTransition {
    /// No activity
    #[default]
    Idle,
    /// Key went down
    Pressed,
    /// Key is still down
    Held,
    /// Key went up
    Released,
    /// Key has been down for a long time
    LongHeld,
}

impl KeyTransition {
    /// Decode the wire value; anything outside the firmware range is `Idle`
    pub fn from_wire(value: u8) -> Self {
        match value {
            1 => KeyTransition::Pressed,
            2 => KeyTransition::Held,
            3 => KeyTransition::Released,
            4 => KeyTransition::LongHeld,
            _ => KeyTransition::Idle,
        }
    }

    /// Wire value for this transition
    pub fn to_wire(self) -> u8 {
        match self {
            KeyTransition::Idle => 0,
            KeyTransition::Pressed => 1,
            KeyTransition::Held => 2,
            KeyTransition::Released => 3,
            KeyTransition::LongHeld => 4,
        }
    }

    /// Whether the dispatcher acts on this transition
    pub fn is_actionable(self) -> bool {
        matches!(
            self,
            KeyTransition::Pressed | KeyTransition::Held | KeyTransition::Released
        )
    }
}

/// One decoded FIFO slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RawFifoEntry {
    /// Key transition
    pub transition: KeyTransition,
    /// Controller scancode
    pub scancode: u8,
}

impl RawFifoEntry {
    /// Create an entry
    pub fn new(transition: KeyTransition, scancode: u8) -> Self {
        Self {
            transition,
            scancode,
        }
    }

    /// Decode the two bytes of a FIFO word read
    ///
    /// Returns `None` for the end-of-batch marker.
    pub fn from_bytes(bytes: [u8; 2]) -> Option<Self> {
        let [transition, scancode] = bytes;
        if transition == 0 {
            return None;
        }
        Some(Self::new(KeyTransition::from_wire(transition), scancode))
    }
}

impl fmt::Display for RawFifoEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} 0x{:02X}", self.transition, self.scancode)
    }
}

/// Bounded queue holding one drained FIFO batch
#[derive(Debug, Clone)]
pub struct EventQueue {
    entries: [RawFifoEntry; FIFO_CAPACITY],
    len: usize,
}

impl EventQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            entries: [RawFifoEntry::default(); FIFO_CAPACITY],
            len: 0,
        }
    }

    /// Append an entry, refusing to grow beyond [`FIFO_CAPACITY`]
    pub fn push(&mut self, entry: RawFifoEntry) -> Result<()> {
        if self.len == FIFO_CAPACITY {
            return Err(KbdError::EventQueueFull(FIFO_CAPACITY));
        }
        self.entries[self.len] = entry;
        self.len += 1;
        Ok(())
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Number of queued entries
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the queue holds no entries
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Queued entries in FIFO order
    pub fn as_slice(&self) -> &[RawFifoEntry] {
        &self.entries[..self.len]
    }

    /// Iterate queued entries in FIFO order
    pub fn iter(&self) -> std::slice::Iter<'_, RawFifoEntry> {
        self.as_slice().iter()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<usize> for EventQueue {
    type Output = RawFifoEntry;

    fn index(&self, index: usize) -> &Self::Output {
        &self.as_slice()[index]
    }
}

impl<'a> IntoIterator for &'a EventQueue {
    type Item = &'a RawFifoEntry;
    type IntoIter = std::slice::Iter<'a, RawFifoEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Drain the controller FIFO into `queue`
///
/// Reads up to [`FIFO_CAPACITY`] entries and stops at the first end-of-batch
/// marker. On a bus failure the queue is left empty and the error returned;
/// entries already read in this drain are discarded.
pub fn drain_fifo<B>(bus: &mut B, queue: &mut EventQueue) -> Result<usize>
where
    B: RegisterBus + ?Sized,
{
    queue.clear();

    for slot in 0..FIFO_CAPACITY {
        let bytes = match bus.read_u16(REG_FIFO) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Could not read FIFO slot {}: {}", slot, e);
                queue.clear();
                return Err(e);
            }
        };

        let Some(entry) = RawFifoEntry::from_bytes(bytes) else {
            break;
        };

        debug!(
            "FIFO {:02}: 0x{:02X}{:02X} {}",
            slot, bytes[0], bytes[1], entry
        );
        queue.push(entry)?;
    }

    Ok(queue.len())
}
