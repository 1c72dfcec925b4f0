//! Property-based tests for refocus.
//!
//! Uses proptest to find edge cases automatically through randomized testing.

use proptest::prelude::*;
use refocus::prelude::*;
use std::sync::Arc;
use std::time::Duration;

/// Key codes a surface plausibly delivers while a calendar has focus.
fn arb_key_code() -> impl Strategy<Value = KeyCode> {
    prop_oneof![
        any::<char>().prop_map(KeyCode::Char),
        Just(KeyCode::Enter),
        Just(KeyCode::Tab),
        Just(KeyCode::BackTab),
        Just(KeyCode::Esc),
        Just(KeyCode::Up),
        Just(KeyCode::Down),
        Just(KeyCode::Left),
        Just(KeyCode::Right),
        Just(KeyCode::PageUp),
        Just(KeyCode::PageDown),
    ]
}

fn arb_modifiers() -> impl Strategy<Value = KeyModifiers> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(ctrl, shift, alt, super_key)| KeyModifiers {
            ctrl,
            shift,
            alt,
            super_key,
        },
    )
}

proptest! {
    /// Classification never panics on arbitrary labels, and assigns a
    /// direction exactly when one keyword appears without the other.
    #[test]
    fn classifier_matches_keyword_presence(label in ".{0,64}") {
        let control = Control::new(Role::Button).label(label.clone());
        let lower = label.to_ascii_lowercase();
        let forward = lower.contains("forward");
        let backward = lower.contains("backward");

        let expected = match (forward, backward) {
            (true, false) => Some(NavDirection::Forward),
            (false, true) => Some(NavDirection::Backward),
            _ => None,
        };
        prop_assert_eq!(classify_by_label(&control), expected);
    }

    /// "backward" contains no "forward" substring trap: a label made only
    /// of the word "backward" repeated never classifies forward.
    #[test]
    fn backward_repetitions_never_classify_forward(n in 1usize..8) {
        let control = Control::new(Role::Button).label("backward".repeat(n));
        prop_assert_eq!(classify_by_label(&control), Some(NavDirection::Backward));
    }

    /// The guard's synchronous face: the default action is prevented for
    /// exactly the activation keys, unmodified, on guarded targets --
    /// never for anything else.
    #[test]
    fn suppression_is_exactly_scoped(
        code in arb_key_code(),
        modifiers in arb_modifiers(),
        on_guarded in any::<bool>(),
    ) {
        let bus = Arc::new(EventBus::new());
        let controls = Arc::new(ControlRegistry::new());
        let focus = Arc::new(FocusContext::new());

        let guarded = controls.register(Control::new(Role::Button).label("go forward"));
        let plain = controls.register(Control::new(Role::Button).label("today"));

        // Wide initial delay: no recovery round runs inside this test case
        let guard = FocusGuard::builder()
            .events(bus.clone())
            .controls(controls.clone())
            .focus(focus.clone())
            .initial_delay(Duration::from_secs(5))
            .attach()
            .expect("guard attaches");

        let target = if on_guarded { guarded } else { plain };
        let outcome = bus.dispatch_key(&KeyInput::new(KeyEvent { code, modifiers }, Some(target)));

        let is_activation = matches!(code, KeyCode::Char(' ') | KeyCode::Enter);
        let chorded = modifiers.ctrl || modifiers.alt || modifiers.super_key;
        let expected = is_activation && !chorded && on_guarded;
        prop_assert_eq!(outcome.default_prevented, expected);
        prop_assert_eq!(outcome.consumed, expected);

        guard.detach();
    }

    /// Registry round-trip: whatever mix of registrations and removals
    /// happens, lookups agree with membership and find() respects
    /// registration order.
    #[test]
    fn registry_membership_is_consistent(keep in proptest::collection::vec(any::<bool>(), 1..20)) {
        let registry = ControlRegistry::new();
        let mut kept = Vec::new();

        for (i, keep_it) in keep.iter().enumerate() {
            let id = registry.register(
                Control::new(Role::Button).label(format!("button {i} forward")),
            );
            if *keep_it {
                kept.push(id);
            } else {
                registry.remove(id);
            }
        }

        prop_assert_eq!(registry.len(), kept.len());
        for id in &kept {
            prop_assert!(registry.contains(*id));
        }
        if let Some(first) = kept.first() {
            let found = registry.find(|c| classify_by_label(c) == Some(NavDirection::Forward));
            prop_assert_eq!(found.expect("a forward control exists").id(), *first);
        }
    }
}
