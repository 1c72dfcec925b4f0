//! Dispatch and classification benchmarks.
//!
//! Tracks the synchronous hot path: what a surface pays per key event
//! while a guard is attached. Recovery rounds are timer-driven and not
//! benchmarked here.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use refocus::prelude::*;
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

fn bench_classify(c: &mut Criterion) {
    let next = Control::new(Role::Button).label("Next Month (forward)");
    let plain = Control::new(Role::Button).label("Open date picker settings");

    c.bench_function("classify_by_label/match", |b| {
        b.iter(|| classify_by_label(black_box(&next)))
    });
    c.bench_function("classify_by_label/miss", |b| {
        b.iter(|| classify_by_label(black_box(&plain)))
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let bus = Arc::new(EventBus::new());
    let controls = Arc::new(ControlRegistry::new());
    let focus = Arc::new(FocusContext::new());

    // A realistic surface: a few dozen day cells plus the nav buttons
    for day in 1..=31 {
        controls.register(Control::new(Role::Cell).label(format!("day {day}")));
    }
    let guarded = controls.register(Control::new(Role::Button).label("forward"));
    let unguarded = controls.register(Control::new(Role::Cell).label("day grid"));

    let _guard = FocusGuard::builder()
        .events(bus.clone())
        .controls(controls.clone())
        .focus(focus)
        // Keep recovery out of the measurement window
        .initial_delay(Duration::from_secs(60))
        .attach()
        .expect("guard attaches");

    let miss = KeyInput::new(KeyEvent::plain(KeyCode::Char(' ')), Some(unguarded));
    c.bench_function("dispatch_key/unguarded_target", |b| {
        b.iter(|| bus.dispatch_key(black_box(&miss)))
    });

    // Arrow keys are the common case while navigating a calendar; they
    // must get through the guard's listener cheaply
    let arrow = KeyInput::new(KeyEvent::plain(KeyCode::Down), Some(guarded));
    c.bench_function("dispatch_key/non_activation_key", |b| {
        b.iter(|| bus.dispatch_key(black_box(&arrow)))
    });
}

fn bench_registry_scan(c: &mut Criterion) {
    c.bench_function("registry_find/200_controls", |b| {
        b.iter_batched(
            || {
                let registry = ControlRegistry::new();
                for i in 0..199 {
                    registry.register(Control::new(Role::Cell).label(format!("cell {i}")));
                }
                registry.register(Control::new(Role::Button).label("forward"));
                registry
            },
            |registry| {
                black_box(registry.find(|c| classify_by_label(c) == Some(NavDirection::Forward)))
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_classify, bench_dispatch, bench_registry_scan);
criterion_main!(benches);
