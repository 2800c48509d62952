//! uinput Output Device
//!
//! Registers a virtual input device with the kernel and writes dispatched
//! events to it. The device advertises every keycode of the scancode table
//! plus the two pointer buttons, relative X/Y motion, raw scancodes and
//! host-side auto-repeat.
//!
//! Events are buffered per frame and handed to the kernel in one write when
//! the dispatcher closes the frame with a sync.

use std::fmt;

use evdevil::event::{EventType, InputEvent as EvdevEvent, Key, Misc, Rel};
use evdevil::uinput::UinputDevice;
use evdevil::{Bus, InputId};
use tracing::{debug, info};

use crate::input::error::{KbdError, Result};
use crate::input::mapper::keycodes::{BTN_LEFT, BTN_RIGHT};
use crate::input::mapper::ScancodeTable;
use crate::input::sink::{InputEvent, InputSink, RelAxis};

/// uinput control node
pub const UINPUT_PATH: &str = "/dev/uinput";

/// Longest name the kernel keeps, without the terminator
const MAX_NAME_LEN: usize = 79;

const EV_SYN: u16 = 0x00;
const EV_KEY: u16 = 0x01;
const EV_REL: u16 = 0x02;
const EV_MSC: u16 = 0x04;

const SYN_REPORT: u16 = 0;
const MSC_SCAN: u16 = 0x04;

/// `BUS_I2C` from `linux/input.h`
pub const BUS_I2C: u16 = 0x18;

/// Identity the virtual device reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Device name, truncated to 79 bytes
    pub name: String,
    /// Bus type
    pub bustype: u16,
    /// Vendor id
    pub vendor: u16,
    /// Product id
    pub product: u16,
    /// Version
    pub version: u16,
}

impl DeviceIdentity {
    /// Name as registered, cut on a char boundary
    pub fn registered_name(&self) -> &str {
        let mut end = self.name.len().min(MAX_NAME_LEN);
        while !self.name.is_char_boundary(end) {
            end -= 1;
        }
        &self.name[..end]
    }
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            name: "picocalc_kbd".to_string(),
            bustype: BUS_I2C,
            vendor: 0x0001,
            product: 0x0001,
            version: 0x0001,
        }
    }
}

fn uinput_err(op: &str, e: std::io::Error) -> KbdError {
    KbdError::Uinput(format!("{} failed: {}", op, e))
}

/// Keycodes the device must advertise for `table`
pub fn advertised_keycodes(table: &ScancodeTable) -> Vec<u16> {
    let mut keys = table.keycodes();
    for button in [BTN_LEFT, BTN_RIGHT] {
        if !keys.contains(&button) {
            keys.push(button);
        }
    }
    keys.sort_unstable();
    keys
}

/// `(type, code, value)` triple for a dispatched event
pub fn event_triple(event: InputEvent) -> (u16, u16, i32) {
    match event {
        InputEvent::Key { keycode, down } => (EV_KEY, keycode, down as i32),
        InputEvent::Relative { axis, delta } => (EV_REL, axis.to_linux_code(), delta),
        InputEvent::Button { button, down } => (EV_KEY, button.to_linux_button(), down as i32),
        InputEvent::RawScan(scancode) => (EV_MSC, MSC_SCAN, scancode as i32),
        InputEvent::Sync => (EV_SYN, SYN_REPORT, 0),
    }
}

/// evdev event for a dispatched event
pub fn to_evdev_event(event: InputEvent) -> EvdevEvent {
    let (kind, code, value) = event_triple(event);
    EvdevEvent::new(EventType::from_raw(kind), code, value)
}

/// Events of the frame being assembled
#[derive(Debug, Default)]
struct PendingFrame {
    events: Vec<EvdevEvent>,
}

impl PendingFrame {
    /// Queue `event`; true once a sync closes the frame
    fn push(&mut self, event: InputEvent) -> bool {
        self.events.push(to_evdev_event(event));
        event == InputEvent::Sync
    }

    fn events(&self) -> &[EvdevEvent] {
        &self.events
    }

    fn clear(&mut self) {
        self.events.clear();
    }
}

/// Virtual input device backed by `/dev/uinput`
pub struct UinputSink {
    device: UinputDevice,
    frame: PendingFrame,
    name: String,
}

impl fmt::Debug for UinputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UinputSink")
            .field("name", &self.name)
            .field("pending", &self.frame.events.len())
            .finish_non_exhaustive()
    }
}

impl UinputSink {
    /// Create and register the device
    pub fn create(identity: &DeviceIdentity, table: &ScancodeTable) -> Result<Self> {
        let keys = advertised_keycodes(table);
        let name = identity.registered_name();

        let device = UinputDevice::builder()
            .map_err(|e| uinput_err(&format!("opening {}", UINPUT_PATH), e))?
            .with_input_id(InputId::new(
                Bus::from_raw(identity.bustype),
                identity.vendor,
                identity.product,
                identity.version,
            ))
            .map_err(|e| uinput_err("setting device id", e))?
            .with_keys(keys.iter().copied().map(Key::from_raw))
            .map_err(|e| uinput_err("enabling keys", e))?
            .with_rel_axes([RelAxis::X, RelAxis::Y].map(|axis| Rel::from_raw(axis.to_linux_code())))
            .map_err(|e| uinput_err("enabling relative axes", e))?
            .with_misc([Misc::from_raw(MSC_SCAN)])
            .map_err(|e| uinput_err("enabling MSC_SCAN", e))?
            .with_key_repeat()
            .map_err(|e| uinput_err("enabling auto-repeat", e))?
            .build(name)
            .map_err(|e| uinput_err("creating device", e))?;

        info!(
            "Registered input device '{}' ({} keycodes, bus 0x{:02X} {:04X}:{:04X})",
            name,
            keys.len(),
            identity.bustype,
            identity.vendor,
            identity.product
        );

        Ok(Self {
            device,
            frame: PendingFrame::default(),
            name: name.to_string(),
        })
    }

    /// Registered device name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl InputSink for UinputSink {
    fn emit(&mut self, event: InputEvent) -> Result<()> {
        if !matches!(event, InputEvent::Sync | InputEvent::RawScan(_)) {
            let (kind, code, value) = event_triple(event);
            debug!("uinput type={} code={} value={}", kind, code, value);
        }
        if !self.frame.push(event) {
            return Ok(());
        }

        let written = self.device.write(self.frame.events());
        self.frame.clear();
        written.map_err(KbdError::Io)
    }
}

impl Drop for UinputSink {
    fn drop(&mut self) {
        info!("Unregistered input device '{}'", self.name);
    }
}
