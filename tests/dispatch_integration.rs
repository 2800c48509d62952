//! End-to-end poll cycles over a simulated keyboard controller.

use std::sync::Arc;
use std::time::Duration;

use mockall::mock;
use picocalc_kbd::device::bus::{shared, RegisterBus, SimulatedBus, REG_FIFO};
use picocalc_kbd::device::{DeviceContext, KeyboardDevice, ManualClock, MonotonicClock};
use picocalc_kbd::input::mapper::keycodes::KEY_A;
use picocalc_kbd::input::mapper::scancodes::{SC_DOWN, SC_LEFTBRACE, SC_RIGHT, SC_RIGHTBRACE, SC_RIGHTSHIFT};
use picocalc_kbd::input::sink::{InputEvent, RecordingSink, RelAxis};
use picocalc_kbd::input::{KbdError, MouseButton, Result};

const PRESSED: u8 = 1;
const HELD: u8 = 2;
const RELEASED: u8 = 3;

mock! {
    pub Controller {}

    impl RegisterBus for Controller {
        fn read_u8(&mut self, reg: u8) -> Result<u8>;
        fn read_u16(&mut self, reg: u8) -> Result<[u8; 2]>;
        fn write_u8(&mut self, reg: u8, value: u8) -> Result<()>;
    }
}

struct Rig {
    device: KeyboardDevice,
    sink: RecordingSink,
    clock: ManualClock,
}

impl Rig {
    fn new(bus: impl RegisterBus + 'static, mouse_enabled: bool) -> Self {
        let sink = RecordingSink::new();
        let clock = ManualClock::new(10_000_000);
        let mut context = DeviceContext::default();
        context.mouse_mut().set_enabled(mouse_enabled);

        let device = KeyboardDevice::new(
            shared(bus),
            Box::new(sink.clone()),
            Arc::new(clock.clone()),
            context,
        );
        Self { device, sink, clock }
    }

    fn with_fifo(words: &[[u8; 2]], mouse_enabled: bool) -> Self {
        let mut bus = SimulatedBus::new();
        bus.push_fifo(words.iter().copied());
        Self::new(bus, mouse_enabled)
    }

    fn motion(&self) -> Vec<(RelAxis, i32)> {
        self.sink
            .events()
            .into_iter()
            .filter_map(|event| match event {
                InputEvent::Relative { axis, delta } => Some((axis, delta)),
                _ => None,
            })
            .collect()
    }
}

#[test]
fn test_directional_intercept_emits_no_keys() {
    let mut rig = Rig::with_fifo(&[[PRESSED, SC_RIGHT], [RELEASED, SC_RIGHT]], true);
    let before = rig.device.context().last_keypress().load();

    let summary = rig.device.poll_cycle().unwrap();

    assert_eq!(summary.entries, 2);
    assert_eq!(summary.keys, 0);
    assert_eq!(summary.motion, 0);
    assert!(rig.device.context().mouse().directions().is_empty());
    assert_eq!(rig.sink.events(), vec![InputEvent::Sync]);
    assert_eq!(rig.device.context().last_keypress().load(), before);
}

#[test]
fn test_typing_stamps_activity() {
    let mut rig = Rig::with_fifo(&[[PRESSED, b'a'], [HELD, b'a'], [RELEASED, b'a']], false);
    rig.clock.advance(Duration::from_millis(5));

    let summary = rig.device.poll_cycle().unwrap();

    assert_eq!(summary.entries, 3);
    assert_eq!(rig.sink.key_events(), vec![(KEY_A, true), (KEY_A, false)]);
    assert_eq!(rig.device.context().last_keypress().load(), rig.clock.now_ns());
    assert_eq!(rig.sink.events().last(), Some(&InputEvent::Sync));
}

#[test]
fn test_toggle_then_accelerate_across_cycles() {
    let mut rig = Rig::with_fifo(&[[PRESSED, SC_RIGHTSHIFT], [PRESSED, SC_RIGHT]], false);

    rig.device.poll_cycle().unwrap();
    assert!(rig.device.context().mouse().is_enabled());
    assert!(rig.sink.key_events().is_empty());
    assert_eq!(rig.motion(), vec![(RelAxis::X, 1)]);
    rig.sink.take();

    rig.clock.advance(Duration::from_millis(300));
    rig.device.poll_cycle().unwrap();
    assert_eq!(rig.motion(), vec![(RelAxis::X, 2)]);
    rig.sink.take();

    rig.clock.advance(Duration::from_millis(300));
    rig.device.poll_cycle().unwrap();
    assert_eq!(rig.motion(), vec![(RelAxis::X, 4)]);
}

#[test]
fn test_diagonal_motion_and_buttons() {
    let mut rig = Rig::with_fifo(
        &[
            [PRESSED, SC_RIGHT],
            [PRESSED, SC_DOWN],
            [PRESSED, SC_RIGHTBRACE],
            [RELEASED, SC_RIGHTBRACE],
            [PRESSED, SC_LEFTBRACE],
        ],
        true,
    );

    let summary = rig.device.poll_cycle().unwrap();

    assert_eq!(summary.mouse, 5);
    assert_eq!(rig.motion(), vec![(RelAxis::X, 1), (RelAxis::Y, 1)]);
    let buttons: Vec<_> = rig
        .sink
        .events()
        .into_iter()
        .filter(|event| matches!(event, InputEvent::Button { .. }))
        .collect();
    assert_eq!(
        buttons,
        vec![
            InputEvent::Button { button: MouseButton::Left, down: true },
            InputEvent::Button { button: MouseButton::Left, down: false },
            InputEvent::Button { button: MouseButton::Right, down: true },
        ]
    );
}

#[test]
fn test_bus_error_leaves_state_untouched() {
    let mut bus = MockController::new();
    bus.expect_read_u16()
        .withf(|reg| *reg == REG_FIFO)
        .times(1)
        .returning(|reg| Err(KbdError::bus(reg, "remote I/O error")));

    let mut rig = Rig::new(bus, true);
    let result = rig.device.poll_cycle();

    assert!(matches!(result, Err(KbdError::Bus { .. })));
    assert!(rig.sink.events().is_empty());
    assert_eq!(rig.device.stats().snapshot().bus_errors, 1);
}

#[test]
fn test_full_fifo_batch() {
    let words: Vec<[u8; 2]> = (0..40).map(|i| [PRESSED, b'a' + (i % 26) as u8]).collect();
    let mut rig = Rig::with_fifo(&words, false);

    let summary = rig.device.poll_cycle().unwrap();
    assert_eq!(summary.entries, picocalc_kbd::input::FIFO_CAPACITY);

    rig.sink.take();
    let summary = rig.device.poll_cycle().unwrap();
    assert_eq!(summary.entries, 40 - picocalc_kbd::input::FIFO_CAPACITY);
}
