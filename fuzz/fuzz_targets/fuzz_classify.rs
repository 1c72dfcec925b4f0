//! Fuzz target for direction classification
//!
//! Tests that arbitrary accessible labels never cause panics or crashes.
//! Run with: cargo +nightly fuzz run fuzz_classify -- -max_total_time=300

#![no_main]

use libfuzzer_sys::fuzz_target;
use refocus::classify::classify_by_label;
use refocus::control::{Control, ControlRegistry, Role};

fuzz_target!(|data: &str| {
    // Limit input size to prevent OOM
    if data.len() > 100_000 {
        return;
    }

    // Classify an arbitrary label - should never panic
    let control = Control::new(Role::Button).label(data).class(data);
    let _ = classify_by_label(&control);
    let _ = control.has_class(data);

    // Registry scans over the same control - should never panic
    let registry = ControlRegistry::new();
    let id = registry.register(control);
    let _ = registry.find(|c| classify_by_label(c).is_some());
    registry.remove(id);
});
