//! Dispatch Cycle Benchmarks
//!
//! Measures one full poll cycle (drain, dispatch, motion tick, sync) for
//! typing and mouse-mode batches of various sizes.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use parking_lot::Mutex;
use picocalc_kbd::device::bus::SimulatedBus;
use picocalc_kbd::device::{DeviceContext, KeyboardDevice, ManualClock, SharedBus, SharedTimestamp};
use picocalc_kbd::input::mapper::scancodes::{SC_DOWN, SC_RIGHT, SC_RIGHTBRACE};
use picocalc_kbd::input::sink::RecordingSink;
use picocalc_kbd::input::{EventQueue, KeyEventDispatcher, MouseOverlayState, RawFifoEntry, FIFO_CAPACITY};

/// Alternating press/release words over the letter keys
fn typing_batch(len: usize) -> Vec<[u8; 2]> {
    (0..len)
        .map(|i| {
            let transition = if i % 2 == 0 { 1 } else { 3 };
            [transition, b'a' + (i / 2 % 26) as u8]
        })
        .collect()
}

/// Direction and button words, as produced while steering the pointer
fn mouse_batch(len: usize) -> Vec<[u8; 2]> {
    let keys = [SC_RIGHT, SC_DOWN, SC_RIGHTBRACE];
    (0..len)
        .map(|i| {
            let transition = if i % 2 == 0 { 1 } else { 3 };
            [transition, keys[i / 2 % keys.len()]]
        })
        .collect()
}

/// Benchmark a complete poll cycle over the simulated controller
fn bench_poll_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("poll_cycle");

    let batches: [(&str, bool, fn(usize) -> Vec<[u8; 2]>); 2] =
        [("typing", false, typing_batch), ("mouse", true, mouse_batch)];

    for (label, mouse_mode, make) in batches {
        for len in [0, 4, FIFO_CAPACITY] {
            let words = make(len);
            group.throughput(Throughput::Elements(len.max(1) as u64));
            group.bench_with_input(BenchmarkId::new(label, len), &words, |b, words| {
                let sim = Arc::new(Mutex::new(SimulatedBus::new()));
                let bus: SharedBus = sim.clone();
                let mut context = DeviceContext::default();
                context.mouse_mut().set_enabled(mouse_mode);
                let sink = RecordingSink::new();
                let mut device = KeyboardDevice::new(
                    bus,
                    Box::new(sink.clone()),
                    Arc::new(ManualClock::new(0)),
                    context,
                );

                b.iter(|| {
                    sim.lock().push_fifo(words.iter().copied());
                    let summary = device.poll_cycle();
                    sink.take();
                    black_box(summary)
                });
            });
        }
    }

    group.finish();
}

/// Benchmark the dispatcher alone over a full batch
fn bench_dispatch_only(c: &mut Criterion) {
    let dispatcher = KeyEventDispatcher::default();
    let clock = ManualClock::new(0);
    let last_keypress = SharedTimestamp::default();

    let mut queue = EventQueue::new();
    for entry in typing_batch(FIFO_CAPACITY)
        .into_iter()
        .filter_map(RawFifoEntry::from_bytes)
    {
        if queue.push(entry).is_err() {
            break;
        }
    }

    c.bench_function("dispatch_full_batch", |b| {
        let mut sink = RecordingSink::new();
        let mut mouse = MouseOverlayState::new();
        b.iter(|| {
            for entry in &queue {
                black_box(dispatcher.dispatch(*entry, &mut mouse, &last_keypress, &clock, &mut sink));
            }
            sink.take();
        });
    });
}

criterion_group!(benches, bench_poll_cycle, bench_dispatch_only);
criterion_main!(benches);
