//! Navigation-control classification.
//!
//! The guard does not care which concrete element it protects; it cares
//! which *direction* an interaction represents, because after a re-render
//! the element backing "next month" is a different control with the same
//! meaning. Classification maps a control to [`NavDirection::Forward`] or
//! [`NavDirection::Backward`]; a replacement locator then finds the
//! current control for that direction when focus needs re-applying.
//!
//! The defaults match the accessible-label convention used by calendar
//! widgets: a label containing "forward" marks the next-period button and
//! "backward" the previous-period button, case-insensitively.

use crate::control::{Control, ControlRegistry};
use std::sync::Arc;

/// Which way a navigation control moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavDirection {
    /// Advances (e.g. next month).
    Forward,
    /// Goes back (e.g. previous month).
    Backward,
}

/// Predicate identifying controls the guard protects.
pub type GuardPredicate = Arc<dyn Fn(&Control) -> bool + Send + Sync>;

/// Maps a control to its navigation direction, if it has one.
pub type DirectionClassifier = Arc<dyn Fn(&Control) -> Option<NavDirection> + Send + Sync>;

/// Finds the control currently representing a direction.
///
/// Re-queried on every recovery round; the registry contents may have
/// been replaced since the last round.
pub type ReplacementLocator =
    Arc<dyn Fn(&ControlRegistry, NavDirection) -> Option<Control> + Send + Sync>;

fn label_contains(control: &Control, needle: &str) -> bool {
    control
        .label_text()
        .map(|label| label.to_ascii_lowercase().contains(needle))
        .unwrap_or(false)
}

/// Classify by accessible-label keywords: "forward" or "backward".
///
/// A label containing both keywords classifies as neither.
pub fn classify_by_label(control: &Control) -> Option<NavDirection> {
    let forward = label_contains(control, "forward");
    let backward = label_contains(control, "backward");
    match (forward, backward) {
        (true, false) => Some(NavDirection::Forward),
        (false, true) => Some(NavDirection::Backward),
        _ => None,
    }
}

/// Default direction classifier ([`classify_by_label`]).
pub fn default_classifier() -> DirectionClassifier {
    Arc::new(classify_by_label)
}

/// Default guarded-control predicate: interactive controls the default
/// classifier can assign a direction to.
pub fn default_predicate() -> GuardPredicate {
    Arc::new(|control| control.role().is_interactive() && classify_by_label(control).is_some())
}

/// Build a locator that scans the registry, in registration order, for the
/// first control the given classifier assigns the wanted direction.
pub fn locate_by_direction(classifier: DirectionClassifier) -> ReplacementLocator {
    Arc::new(move |registry, direction| {
        registry.find(|control| classifier(control) == Some(direction))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::control::Role;

    #[test]
    fn test_classify_forward_backward() {
        let next = Control::new(Role::Button).label("Next Month (forward)");
        let prev = Control::new(Role::Button).label("Previous Month (backward)");

        assert_eq!(classify_by_label(&next), Some(NavDirection::Forward));
        assert_eq!(classify_by_label(&prev), Some(NavDirection::Backward));
    }

    #[test]
    fn test_classify_case_insensitive() {
        let control = Control::new(Role::Button).label("Move FORWARD one month");
        assert_eq!(classify_by_label(&control), Some(NavDirection::Forward));
    }

    #[test]
    fn test_classify_neither() {
        assert_eq!(classify_by_label(&Control::new(Role::Button)), None);
        assert_eq!(
            classify_by_label(&Control::new(Role::Button).label("Close")),
            None
        );
        // Ambiguous labels classify as neither
        assert_eq!(
            classify_by_label(&Control::new(Role::Button).label("forward or backward")),
            None
        );
    }

    #[test]
    fn test_default_predicate_requires_interactive_role() {
        let predicate = default_predicate();

        assert!(predicate(&Control::new(Role::Button).label("go forward")));
        assert!(!predicate(&Control::new(Role::Cell).label("go forward")));
        assert!(!predicate(&Control::new(Role::Button).label("Close")));
    }

    #[test]
    fn test_locator_tracks_replacement() {
        let registry = ControlRegistry::new();
        let locator = locate_by_direction(default_classifier());

        let old = registry.register(Control::new(Role::Button).label("forward"));
        assert_eq!(
            locator(&registry, NavDirection::Forward).unwrap().id(),
            old
        );

        // Re-render: old control unmounted, a fresh one registered
        registry.remove(old);
        let new = registry.register(Control::new(Role::Button).label("forward"));
        assert_eq!(
            locator(&registry, NavDirection::Forward).unwrap().id(),
            new
        );

        assert!(locator(&registry, NavDirection::Backward).is_none());
    }
}
