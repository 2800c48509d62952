//! Attach, poll and detach a keyboard under paused tokio time.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use picocalc_kbd::device::bus::{
    shared, RegisterBus, SimulatedBus, REG_BATTERY, REG_KEYBOARD_BACKLIGHT, REG_SCREEN_BACKLIGHT, WRITE_MASK,
};
use picocalc_kbd::device::{
    Attribute, DeviceContext, KeyboardDevice, ManualClock, SharedBus, DEFAULT_POLL_PERIOD,
};
use picocalc_kbd::input::sink::{InputEvent, RecordingSink};
use picocalc_kbd::KbdError;

/// Controller that answers every FIFO read after a long bus stall
struct StallingBus {
    stall: Duration,
}

impl RegisterBus for StallingBus {
    fn read_u8(&mut self, _reg: u8) -> picocalc_kbd::Result<u8> {
        Ok(0)
    }

    fn read_u16(&mut self, _reg: u8) -> picocalc_kbd::Result<[u8; 2]> {
        std::thread::sleep(self.stall);
        Ok([0, 0])
    }

    fn write_u8(&mut self, _reg: u8, _value: u8) -> picocalc_kbd::Result<()> {
        Ok(())
    }
}

fn keyboard(bus: SimulatedBus) -> (KeyboardDevice, RecordingSink, ManualClock) {
    let sink = RecordingSink::new();
    let clock = ManualClock::new(1_000_000_000);
    let device = KeyboardDevice::new(
        shared(bus),
        Box::new(sink.clone()),
        Arc::new(clock.clone()),
        DeviceContext::default(),
    );
    (device, sink, clock)
}

#[tokio::test(start_paused = true)]
async fn test_polls_at_configured_rate() {
    let (device, sink, _) = keyboard(SimulatedBus::new());

    let attached = device.attach(Duration::from_millis(10)).unwrap();
    tokio::time::sleep(Duration::from_millis(95)).await;
    let device = attached.detach().await.unwrap();

    // First tick fires immediately, then one per period
    let cycles = device.stats().snapshot().cycles;
    assert!((9..=11).contains(&cycles), "ran {} cycles", cycles);
    let syncs = sink.events().iter().filter(|e| **e == InputEvent::Sync).count();
    assert_eq!(syncs as u64, cycles);
}

#[tokio::test(start_paused = true)]
async fn test_trigger_runs_extra_cycle() {
    let (device, _, _) = keyboard(SimulatedBus::new());

    let attached = device.attach(Duration::from_secs(60)).unwrap();
    tokio::task::yield_now().await;
    attached.trigger().fire();
    tokio::time::sleep(Duration::from_millis(1)).await;

    let device = attached.detach().await.unwrap();
    assert_eq!(device.stats().snapshot().cycles, 2);
}

#[tokio::test(start_paused = true)]
async fn test_attributes_follow_lifecycle() {
    let mut bus = SimulatedBus::new();
    bus.set_register(REG_BATTERY, 73);
    let (device, _, clock) = keyboard(bus);
    let detached_attrs = device.attributes();

    assert_eq!(detached_attrs.last_keypress_ms(), -1);
    assert!(matches!(detached_attrs.battery_percent(), Err(KbdError::NotAttached)));

    let attached = device.attach(DEFAULT_POLL_PERIOD).unwrap();
    let attrs = attached.attributes().clone();

    assert_eq!(attrs.read(Attribute::BatteryPercent).unwrap(), "73");
    clock.advance(Duration::from_millis(250));
    assert_eq!(attrs.read(Attribute::LastKeypress).unwrap(), "250");

    attrs.write(Attribute::KeyboardBacklight, "200\n").unwrap();
    assert!(matches!(
        attrs.write(Attribute::KeyboardBacklight, "256"),
        Err(KbdError::InvalidParameter(_))
    ));

    let device = attached.detach().await.unwrap();
    assert_eq!(attrs.last_keypress_ms(), -1);
    assert!(matches!(attrs.set_screen_backlight("10"), Err(KbdError::NotAttached)));
    assert!(!device.is_attached());
}

#[tokio::test(start_paused = true)]
async fn test_backlight_write_uses_write_flag() {
    let sim = Arc::new(Mutex::new(SimulatedBus::new()));
    let bus: SharedBus = sim.clone();
    let device = KeyboardDevice::new(
        bus,
        Box::new(RecordingSink::new()),
        Arc::new(ManualClock::new(0)),
        DeviceContext::default(),
    );

    let attached = device.attach(DEFAULT_POLL_PERIOD).unwrap();
    attached.attributes().set_keyboard_backlight("9").unwrap();
    attached.attributes().set_screen_backlight("0").unwrap();
    attached.detach().await;

    let sim = sim.lock();
    assert_eq!(
        sim.writes(),
        &[(REG_KEYBOARD_BACKLIGHT | WRITE_MASK, 9), (REG_SCREEN_BACKLIGHT | WRITE_MASK, 0)]
    );
    assert_eq!(sim.register(REG_KEYBOARD_BACKLIGHT), 9);
}

#[tokio::test]
async fn test_slow_bus_does_not_stall_runtime() {
    let device = KeyboardDevice::new(
        shared(StallingBus {
            stall: Duration::from_millis(200),
        }),
        Box::new(RecordingSink::new()),
        Arc::new(ManualClock::new(0)),
        DeviceContext::default(),
    );

    let attached = device.attach(Duration::from_secs(60)).unwrap();
    tokio::task::yield_now().await;

    let started = std::time::Instant::now();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let elapsed = started.elapsed();
    assert!(elapsed < Duration::from_millis(150), "5ms sleep took {:?}", elapsed);

    let device = attached.detach().await.unwrap();
    assert_eq!(device.stats().snapshot().cycles, 1);
}
